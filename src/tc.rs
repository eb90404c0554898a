//! The typing collaborator: a type checker for the term language over a local
//! de Bruijn context, with weak-head reduction and conversion.
use crate::env::{Env, RelDecl, TypingFlags};
use crate::expr::IndRef;
use crate::level::Sort;
use crate::util::{ExprPtr, LevelPtr, NamePtr, TcCache, TcCtx};

pub mod eq;
pub mod infer;
pub mod reduce;

pub type TcResult<T> = Result<T, TypeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeError {
    UnboundRel(u32),
    UnboundVar(NamePtr),
    UnknownConstant(NamePtr),
    UnknownInductive(IndRef),
    UnknownConstructor(IndRef, u32),
    NotASort(ExprPtr),
    NotAProduct(ExprPtr),
    NotAnArity(ExprPtr),
    TypeMismatch { expected: ExprPtr, found: ExprPtr },
    CaseOnNonInductive(ExprPtr),
    BadBranchCount { ind: IndRef, expected: usize, found: usize },
    BadElimination { ind: IndRef },
    BadProjection { ind: IndRef, field: u32 },
    /// Wrong number of universe levels, or an instance violating the declared constraints.
    BadInstance(NamePtr),
    UniverseInconsistency,
    UndeclaredUniverse(NamePtr),
    DuplicateUniverse(NamePtr),
    NonAtomicConstraint(LevelPtr),
    AlreadyDeclared(NamePtr),
}

impl std::fmt::Display for TypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use TypeError::*;
        match self {
            UnboundRel(idx) => write!(f, "unbound de Bruijn index {}", idx),
            UnboundVar(n) => write!(f, "unbound section variable {:?}", n),
            UnknownConstant(n) => write!(f, "unknown constant {:?}", n),
            UnknownInductive(ind) => write!(f, "unknown inductive {:?}", ind),
            UnknownConstructor(ind, idx) => write!(f, "inductive {:?} has no constructor {}", ind, idx),
            NotASort(e) => write!(f, "expected a sort, got {:?}", e),
            NotAProduct(e) => write!(f, "expected a product, got {:?}", e),
            NotAnArity(e) => write!(f, "expected an arity, got {:?}", e),
            TypeMismatch { expected, found } => write!(f, "type mismatch: expected {:?}, found {:?}", expected, found),
            CaseOnNonInductive(e) => write!(f, "case analysis on a term of non-inductive type {:?}", e),
            BadBranchCount { ind, expected, found } =>
                write!(f, "case on {:?} expects {} branches, got {}", ind, expected, found),
            BadElimination { ind } => write!(f, "elimination of {:?} into this sort is not allowed", ind),
            BadProjection { ind, field } => write!(f, "bad projection {} of {:?}", field, ind),
            BadInstance(n) => write!(f, "bad universe instance for {:?}", n),
            UniverseInconsistency => write!(f, "universe inconsistency"),
            UndeclaredUniverse(n) => write!(f, "undeclared universe {:?}", n),
            DuplicateUniverse(n) => write!(f, "universe {:?} declared twice", n),
            NonAtomicConstraint(l) => write!(f, "universe constraints relate variables or Set, got {:?}", l),
            AlreadyDeclared(n) => write!(f, "{:?} is already declared", n),
        }
    }
}

impl std::error::Error for TypeError {}

/// A type checker working in a local context `lctx` (outermost declaration first)
/// on top of a fixed global environment.
pub struct TypeChecker<'x> {
    pub(crate) ctx: &'x mut TcCtx,
    pub(crate) env: &'x Env,
    pub(crate) lctx: Vec<RelDecl>,
    pub(crate) tc_cache: TcCache,
}

impl<'x> TypeChecker<'x> {
    pub fn new(ctx: &'x mut TcCtx, env: &'x Env) -> Self {
        Self { ctx, env, lctx: Vec::new(), tc_cache: TcCache::new() }
    }

    pub fn ctx(&mut self) -> &mut TcCtx { &mut *self.ctx }

    pub fn env(&self) -> &'x Env { self.env }

    pub fn flags(&self) -> TypingFlags { self.env.flags }

    pub fn depth(&self) -> u32 { self.lctx.len() as u32 }

    pub fn rel_ctx(&self) -> &[RelDecl] { &self.lctx }

    pub fn push_decl(&mut self, decl: RelDecl) { self.lctx.push(decl) }

    pub fn push_assum(&mut self, name: NamePtr, ty: ExprPtr) { self.lctx.push(RelDecl::LocalAssum { name, ty }) }

    pub fn push_decls(&mut self, decls: &[RelDecl]) { self.lctx.extend_from_slice(decls) }

    pub fn pop_decl(&mut self) -> Option<RelDecl> { self.lctx.pop() }

    pub fn pop_decls(&mut self, n: usize) {
        let keep = self.lctx.len().saturating_sub(n);
        self.lctx.truncate(keep);
    }

    /// The declaration of `Rel(idx)`, lifted to the current depth.
    pub fn lookup_rel(&mut self, idx: u32) -> TcResult<RelDecl> {
        let pos = self.lctx.len().checked_sub(idx as usize + 1).ok_or(TypeError::UnboundRel(idx))?;
        let decl = self.lctx[pos];
        Ok(self.ctx.lift_decl(decl, idx + 1, 0))
    }

    /// Sort comparison through the universe graph; always true when universe
    /// checking is off.
    pub fn sort_leq(&self, s1: Sort, s2: Sort) -> TcResult<bool> {
        if !self.env.flags.check_universes {
            return Ok(true)
        }
        self.env.ugraph.check_sort_leq(&*self.ctx, s1, s2)
    }

    pub fn sort_eq(&self, s1: Sort, s2: Sort) -> TcResult<bool> {
        if !self.env.flags.check_universes {
            return Ok(true)
        }
        self.env.ugraph.check_sort_eq(&*self.ctx, s1, s2)
    }

    pub fn level_eq(&self, l1: LevelPtr, l2: LevelPtr) -> TcResult<bool> {
        if !self.env.flags.check_universes {
            return Ok(true)
        }
        self.env.ugraph.check_eq(&*self.ctx, l1, l2)
    }
}
