//! Certification of mutual inductive declarations.
//!
//! [`check_inductive`] runs a candidate block through the arity checker, the
//! universe assigner, the positivity checker and the packet builder, in that order,
//! and either returns the finished [`MutIndBody`] or the first error found. It never
//! touches the environment it is given; registering the result is left to
//! [`Env::add_inductive`](crate::env::Env::add_inductive).
use crate::env::{Env, RelDecl};
use crate::expr::IndRef;
use crate::level::{Sort, SortFamily};
use crate::tc::{TypeChecker, TypeError};
use crate::univ::UnivConstraint;
use crate::util::{new_fx_hash_set, ExprPtr, LevelPtr, NamePtr, TcCtx};
use tracing::debug;

pub mod arity;
pub mod packet;
pub mod positivity;
pub mod record;
pub mod rtree;
pub mod unit_shape;
pub mod universe;

use rtree::RecTree;

/// How the recursive occurrences of a block are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Finite {
    /// An inductive type.
    Finite,
    /// A coinductive type.
    CoFinite,
    /// A non-recursive type; recursive occurrences are rejected outright.
    BiFinite,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UniverseEntry {
    /// Universes that join the global graph once the block is registered.
    Monomorphic { levels: Vec<NamePtr>, constraints: Vec<UnivConstraint> },
    /// Universe parameters, instantiated at each use of the block.
    Polymorphic { params: Vec<NamePtr>, constraints: Vec<UnivConstraint> },
}

impl Default for UniverseEntry {
    fn default() -> Self { UniverseEntry::Monomorphic { levels: Vec::new(), constraints: Vec::new() } }
}

impl UniverseEntry {
    pub fn levels_and_constraints(&self) -> (&[NamePtr], &[UnivConstraint]) {
        match self {
            UniverseEntry::Monomorphic { levels, constraints } => (levels, constraints),
            UniverseEntry::Polymorphic { params, constraints } => (params, constraints),
        }
    }

    /// The universe parameters; empty for a monomorphic entry.
    pub fn poly_params(&self) -> &[NamePtr] {
        match self {
            UniverseEntry::Monomorphic { .. } => &[],
            UniverseEntry::Polymorphic { params, .. } => params,
        }
    }

    pub fn is_polymorphic(&self) -> bool { matches!(self, UniverseEntry::Polymorphic { .. }) }
}

/// One inductive of a candidate block.
///
/// `params` is this inductive's copy of the shared parameter context. `arity` is the
/// arity without its parameters, typed under `params`. Each constructor type in `lc`
/// is parameter-free as well, typed under the block's arities and then `params`: in an
/// `ntypes` block, inductive `i` seen from `d` binders into a constructor type is
/// `Rel(d + params.len() + ntypes - 1 - i)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneInductiveEntry {
    pub typename: NamePtr,
    pub params: Vec<RelDecl>,
    pub arity: ExprPtr,
    pub consnames: Vec<NamePtr>,
    pub lc: Vec<ExprPtr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutualInductiveEntry {
    pub finite: Finite,
    pub inds: Vec<OneInductiveEntry>,
    pub universes: UniverseEntry,
    /// Request template polymorphism for `Type`-sorted inductives of the block.
    pub template: bool,
    /// Derive primitive projections named `<base>.<field>` when the block qualifies.
    pub record: Option<NamePtr>,
    pub private: Option<bool>,
    /// `false` trusts the declaration: positivity violations are not reported and the
    /// rec-trees are built on a best-effort basis.
    pub check_positivity: bool,
}

/// How far eliminations of a `Prop` or `Set` inductive must be restricted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SquashInfo {
    NoSquash,
    PropSquash,
    SetSquash,
    /// Unrestricted when every listed type lives in `Prop`, squashed to `Prop`
    /// otherwise. The types are closed.
    ConditionalSquash(Vec<ExprPtr>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndArity {
    Regular { squash: SquashInfo, user_arity: ExprPtr, sort: Sort },
    /// `param_levels` has one entry per parameter assumption, outermost first; the
    /// level of a contributing parameter is replaced at each application by the level
    /// of the actual argument.
    Template { param_levels: Vec<Option<LevelPtr>>, sort: Sort },
}

impl IndArity {
    pub fn sort(&self) -> Sort {
        match self {
            IndArity::Regular { sort, .. } | IndArity::Template { sort, .. } => *sort,
        }
    }

    pub fn squash(&self) -> Option<&SquashInfo> {
        match self {
            IndArity::Regular { squash, .. } => Some(squash),
            IndArity::Template { .. } => None,
        }
    }
}

/// Runtime tag of a constructor: constant constructors count from 0, constructors
/// carrying arguments from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstructorTag {
    Constant(u32),
    Block { tag: u32, arity: usize },
}

/// One certified inductive (a packet).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneIndBody {
    pub typename: NamePtr,
    /// Parameters followed by the signature (the indices).
    pub arity_ctx: Vec<RelDecl>,
    pub arity: IndArity,
    pub nrealargs: usize,
    pub nrealdecls: usize,
    /// The largest sort family this inductive may be eliminated into.
    pub kelim: SortFamily,
    pub consnames: Vec<NamePtr>,
    /// Closed constructor types, including the parameters.
    pub user_lc: Vec<ExprPtr>,
    /// `user_lc` with every binder exposed in head normal form.
    pub nf_lc: Vec<ExprPtr>,
    pub consnrealargs: Vec<usize>,
    pub consnrealdecls: Vec<usize>,
    pub recargs: RecTree,
    pub nb_constant: usize,
    pub nb_args: usize,
    pub ctor_tags: Vec<ConstructorTag>,
}

/// A primitive projection, with every term closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionBody {
    pub name: NamePtr,
    /// Position among the constructor's assumptions.
    pub field: u32,
    /// `∀ params (r : I params), field type`
    pub ty: ExprPtr,
    /// `λ params r, r.field`
    pub body: ExprPtr,
    /// The same projection as a `Case` on `r`.
    pub compat: ExprPtr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordInfo {
    pub base: NamePtr,
    pub projections: Vec<ProjectionBody>,
    /// `λ params r, C params r.0 .. r.k`, definitionally equal to `λ params r, r`.
    pub eta_term: ExprPtr,
    /// `∀ params (r : I params), I params`
    pub eta_type: ExprPtr,
}

/// A certified mutual block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutIndBody {
    pub name: NamePtr,
    pub ntypes: usize,
    pub finite: Finite,
    pub params: Vec<RelDecl>,
    /// Number of parameter assumptions.
    pub nparams: usize,
    /// Number of leading parameters passed unchanged to every recursive occurrence.
    pub nparams_rec: usize,
    pub packets: Vec<OneIndBody>,
    /// Section variables the block depends on.
    pub hyps: Vec<NamePtr>,
    pub polymorphic: bool,
    pub universes: UniverseEntry,
    pub private: Option<bool>,
    pub record: Option<RecordInfo>,
}

impl MutIndBody {
    pub fn ind_ref(&self, idx: usize) -> IndRef { IndRef { mind: self.name, idx: idx as u32 } }
}

/// Why a constructor type is ill-formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtorDefect {
    /// The named inductive of the block occurs in a position that is not strictly
    /// positive.
    NonPos(NamePtr),
    /// A recursive occurrence or the conclusion has fewer arguments than parameters.
    NotEnoughArgs,
    /// The conclusion is not the inductive being defined.
    NotConstructor,
    /// The conclusion passes something other than the parameter itself at position
    /// `param`.
    NonPar { param: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anomaly {
    /// Template polymorphism requested on a universe polymorphic block.
    TemplatePolymorphic,
    /// A constructor count that differs from the constructor name count.
    ConstructorCountMismatch(NamePtr),
    /// An inferred level above the declared one under a predicative sort.
    PredicativityViolated(NamePtr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndError {
    EmptyBlock,
    DuplicateTypeName(NamePtr),
    DuplicateConstructorName(NamePtr),
    AlreadyDeclared(NamePtr),
    NonUniformParams { ind: NamePtr },
    NotAnArity { ind: NamePtr, arity: ExprPtr },
    /// A non-recursive block mentions one of its inductives in a constructor argument.
    NonRecursiveOccurrence { ind: NamePtr, cstr: NamePtr },
    /// `arg` counts the constructor's leading products, from 0.
    IllFormedConstructor { ind: NamePtr, cstr: NamePtr, arg: usize, defect: CtorDefect },
    /// The inferred sort of a template inductive exceeds its declared sort.
    IncompatibleSort { ind: NamePtr },
    Type(TypeError),
    Anomaly(Anomaly),
}

impl From<TypeError> for IndError {
    fn from(e: TypeError) -> Self { IndError::Type(e) }
}

impl std::fmt::Display for IndError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use IndError::*;
        match self {
            EmptyBlock => write!(f, "an inductive block must declare at least one type"),
            DuplicateTypeName(n) => write!(f, "type name {:?} is used twice", n),
            DuplicateConstructorName(n) => write!(f, "constructor name {:?} is used twice", n),
            AlreadyDeclared(n) => write!(f, "{:?} is already declared", n),
            NonUniformParams { ind } => write!(f, "the parameters of {:?} differ from those of the block", ind),
            NotAnArity { ind, arity } => write!(f, "the type {:?} of {:?} is not an arity", arity, ind),
            NonRecursiveOccurrence { ind, cstr } =>
                write!(f, "constructor {:?} of the non-recursive type {:?} has a recursive argument", cstr, ind),
            IllFormedConstructor { ind, cstr, arg, defect } => {
                write!(f, "ill-formed constructor {:?} of {:?} at argument {}: ", cstr, ind, arg)?;
                match defect {
                    CtorDefect::NonPos(occ) => write!(f, "non strictly positive occurrence of {:?}", occ),
                    CtorDefect::NotEnoughArgs => write!(f, "not enough arguments"),
                    CtorDefect::NotConstructor => write!(f, "the conclusion is not {:?}", ind),
                    CtorDefect::NonPar { param } => write!(f, "parameter {} is not passed unchanged", param),
                }
            }
            IncompatibleSort { ind } => write!(f, "the inferred sort of {:?} exceeds its declared sort", ind),
            Type(e) => write!(f, "{}", e),
            Anomaly(a) => write!(f, "anomaly: {:?}", a),
        }
    }
}

impl std::error::Error for IndError {}

pub type IndResult<T> = Result<T, IndError>;

/// Names must be fresh, within the block and against `env`.
fn check_names(ctx: &TcCtx, env: &Env, mind: NamePtr, entry: &MutualInductiveEntry) -> IndResult<()> {
    if entry.inds.is_empty() {
        return Err(IndError::EmptyBlock)
    }
    if env.is_declared(mind) {
        return Err(IndError::AlreadyDeclared(mind))
    }
    let mut type_names = new_fx_hash_set();
    let mut cons_names = new_fx_hash_set();
    for ind in entry.inds.iter() {
        if !type_names.insert(ind.typename) {
            return Err(IndError::DuplicateTypeName(ind.typename))
        }
        if ind.consnames.len() != ind.lc.len() {
            return Err(IndError::Anomaly(Anomaly::ConstructorCountMismatch(ind.typename)))
        }
        for c in ind.consnames.iter().copied() {
            if !cons_names.insert(c) {
                return Err(IndError::DuplicateConstructorName(c))
            }
        }
    }
    if let Some(n) = type_names.intersection(&cons_names).next() {
        return Err(IndError::DuplicateConstructorName(*n))
    }
    for n in type_names.iter().chain(cons_names.iter()).copied() {
        if env.is_declared(n) || env.lookup_named(n).is_some() {
            return Err(IndError::AlreadyDeclared(n))
        }
    }
    debug!(block = %ctx.name_to_string(mind), ntypes = entry.inds.len(), "names are fresh");
    Ok(())
}

/// Same kind, type and body; binder names may differ.
fn same_param(a: &RelDecl, b: &RelDecl) -> bool {
    match (a, b) {
        (RelDecl::LocalAssum { ty: t1, .. }, RelDecl::LocalAssum { ty: t2, .. }) => t1 == t2,
        (RelDecl::LocalDef { ty: t1, val: v1, .. }, RelDecl::LocalDef { ty: t2, val: v2, .. }) => t1 == t2 && v1 == v2,
        _ => false,
    }
}

/// Every inductive must carry the same parameter context, declaration by declaration.
/// The first inductive's binder names are the ones kept.
fn check_uniform_params(entry: &MutualInductiveEntry) -> IndResult<&[RelDecl]> {
    let (first, rest) = match entry.inds.split_first() {
        Some(split) => split,
        None => return Err(IndError::EmptyBlock),
    };
    for ind in rest.iter() {
        let uniform = ind.params.len() == first.params.len()
            && ind.params.iter().zip(first.params.iter()).all(|(a, b)| same_param(a, b));
        if !uniform {
            return Err(IndError::NonUniformParams { ind: ind.typename })
        }
    }
    Ok(&first.params)
}

/// Check the candidate block `entry`, to be registered under the name `mind`.
pub fn check_inductive(
    ctx: &mut TcCtx,
    env: &Env,
    mind: NamePtr,
    entry: &MutualInductiveEntry,
) -> IndResult<MutIndBody> {
    check_names(ctx, env, mind, entry)?;
    let params = check_uniform_params(entry)?;
    if entry.template && entry.universes.is_polymorphic() {
        return Err(IndError::Anomaly(Anomaly::TemplatePolymorphic))
    }
    let scoped = env.push_universes(ctx, &entry.universes)?;
    let mut tc = TypeChecker::new(ctx, &scoped);

    let typed = arity::check_arities(&mut tc, entry, params)?;
    let arities = typed
        .iter()
        .map(|t| universe::assign_arity(&mut tc, entry.template, params, t))
        .collect::<IndResult<Vec<IndArity>>>()?;

    let nmr_and_trees = {
        let arities_ctx = arity::arities_ctx(&mut tc, params, &typed);
        let lifted = arity::lift_params(&mut tc, params, entry.inds.len() as u32);
        tc.push_decls(&arities_ctx);
        tc.push_decls(&lifted);
        let out = positivity::check_positivity(&mut tc, mind, entry, params);
        tc.pop_decls(entry.inds.len() + params.len());
        out
    };
    let (nmr, trees) = nmr_and_trees?;
    debug!(block = %tc.ctx.name_to_string(mind), nparams_rec = nmr, "positivity checked");

    packet::build_body(&mut tc, mind, entry, params, &typed, arities, nmr, trees)
}
