use crate::env::{Env, GlobalRef, RelDecl, TypingFlags};
use crate::inductive::{
    check_inductive, Finite, IndResult, MutIndBody, MutualInductiveEntry, OneInductiveEntry, UniverseEntry,
};
use crate::level::Sort;
use crate::tc::TypeChecker;
use crate::univ::{ConstraintKind, UnivConstraint};
use crate::util::{ExprPtr, LevelPtr, NamePtr, TcCtx};
use rand::distributions::Alphanumeric;
use rand::{rngs::ThreadRng, Rng};
use std::error::Error;
use std::sync::Arc;

/// A context and an environment, with shorthands for building terms and blocks.
pub(crate) struct Fixture {
    pub(crate) ctx: TcCtx,
    pub(crate) env: Env,
}

pub(crate) fn test_fixture<A>(f: impl FnOnce(&mut Fixture) -> Result<A, Box<dyn Error>>) -> Result<A, Box<dyn Error>> {
    test_fixture_with(TypingFlags::default(), f)
}

pub(crate) fn test_fixture_with<A>(
    flags: TypingFlags,
    f: impl FnOnce(&mut Fixture) -> Result<A, Box<dyn Error>>,
) -> Result<A, Box<dyn Error>> {
    let mut fx = Fixture { ctx: TcCtx::new(), env: Env::new(flags) };
    f(&mut fx)
}

pub(crate) fn test_ctx<A>(f: impl FnOnce(&mut TcCtx) -> A) -> Result<A, Box<dyn Error>> {
    let mut ctx = TcCtx::new();
    Ok(f(&mut ctx))
}

/// A block of ordinary inductive types with default options.
pub(crate) fn block(inds: Vec<OneInductiveEntry>) -> MutualInductiveEntry {
    MutualInductiveEntry {
        finite: Finite::Finite,
        inds,
        universes: UniverseEntry::default(),
        template: false,
        record: None,
        private: None,
        check_positivity: true,
    }
}

pub(crate) fn random_name(rng: &mut ThreadRng, len: usize) -> String {
    rng.sample_iter(&Alphanumeric).take(len).map(char::from).collect()
}

impl Fixture {
    pub(crate) fn n(&mut self, s: &str) -> NamePtr { self.ctx.name_from_dotted(s) }

    pub(crate) fn rel(&mut self, i: u32) -> ExprPtr { self.ctx.mk_rel(i) }

    pub(crate) fn prop(&mut self) -> ExprPtr { self.ctx.mk_prop() }

    pub(crate) fn set(&mut self) -> ExprPtr { self.ctx.mk_set() }

    pub(crate) fn univ(&mut self, u: &str) -> LevelPtr {
        let n = self.n(u);
        self.ctx.param(n)
    }

    pub(crate) fn type_u(&mut self, u: &str) -> ExprPtr {
        let l = self.univ(u);
        self.ctx.mk_type(l)
    }

    /// `Type(n)` for a natural `n`; `Type(0)` is `Set`.
    pub(crate) fn type_n(&mut self, n: u32) -> ExprPtr {
        let zero = self.ctx.zero();
        let l = self.ctx.level_n(zero, n);
        self.ctx.mk_type(l)
    }

    pub(crate) fn pi(&mut self, name: &str, ty: ExprPtr, body: ExprPtr) -> ExprPtr {
        let n = self.n(name);
        self.ctx.mk_prod(n, ty, body)
    }

    pub(crate) fn lam(&mut self, name: &str, ty: ExprPtr, body: ExprPtr) -> ExprPtr {
        let n = self.n(name);
        self.ctx.mk_lambda(n, ty, body)
    }

    pub(crate) fn app(&mut self, f: ExprPtr, args: &[ExprPtr]) -> ExprPtr { self.ctx.mk_apps(f, args) }

    /// `Rel(i)` applied to `args`.
    pub(crate) fn rel_app(&mut self, i: u32, args: &[ExprPtr]) -> ExprPtr {
        let f = self.rel(i);
        self.app(f, args)
    }

    pub(crate) fn assum(&mut self, name: &str, ty: ExprPtr) -> RelDecl { RelDecl::LocalAssum { name: self.n(name), ty } }

    pub(crate) fn def(&mut self, name: &str, ty: ExprPtr, val: ExprPtr) -> RelDecl {
        RelDecl::LocalDef { name: self.n(name), val, ty }
    }

    /// A declared global, with the empty universe instance.
    pub(crate) fn global(&mut self, s: &str) -> ExprPtr {
        let n = self.n(s);
        let levels = self.ctx.no_levels();
        match self.env.resolve_global(n) {
            Some(GlobalRef::Const(c)) => self.ctx.mk_const(c, levels),
            Some(GlobalRef::Ind(ind)) => self.ctx.mk_ind(ind, levels),
            Some(GlobalRef::Construct(ind, j)) => self.ctx.mk_construct(ind, j, levels),
            None => panic!("{} is not declared", s),
        }
    }

    pub(crate) fn one(
        &mut self,
        typename: &str,
        params: &[RelDecl],
        arity: ExprPtr,
        ctors: Vec<(&str, ExprPtr)>,
    ) -> OneInductiveEntry {
        OneInductiveEntry {
            typename: self.n(typename),
            params: params.to_vec(),
            arity,
            consnames: ctors.iter().map(|(c, _)| self.n(c)).collect(),
            lc: ctors.iter().map(|(_, t)| *t).collect(),
        }
    }

    pub(crate) fn check(&mut self, mind: &str, entry: &MutualInductiveEntry) -> IndResult<MutIndBody> {
        let mind = self.n(mind);
        check_inductive(&mut self.ctx, &self.env, mind, entry)
    }

    pub(crate) fn declare(&mut self, mind: &str, entry: &MutualInductiveEntry) -> Result<Arc<MutIndBody>, Box<dyn Error>> {
        let body = self.check(mind, entry)?;
        Ok(self.env.add_inductive(&mut self.ctx, body)?)
    }

    pub(crate) fn tc(&mut self) -> TypeChecker<'_> { TypeChecker::new(&mut self.ctx, &self.env) }

    pub(crate) fn constraint(&mut self, lhs: &str, kind: ConstraintKind, rhs: &str) -> UnivConstraint {
        UnivConstraint { lhs: self.univ(lhs), kind, rhs: self.univ(rhs) }
    }

    /// The sort `e` lives in, in the empty local context.
    pub(crate) fn sort_of(&mut self, e: ExprPtr) -> Result<Sort, Box<dyn Error>> { Ok(self.tc().infer_sort(e)?) }

    /// `nat := O | S nat`
    pub(crate) fn declare_nat(&mut self) -> Result<Arc<MutIndBody>, Box<dyn Error>> {
        let set = self.set();
        let o = self.rel(0);
        let (r0, r1) = (self.rel(0), self.rel(1));
        let s = self.pi("n", r0, r1);
        let nat = self.one("nat", &[], set, vec![("O", o), ("S", s)]);
        self.declare("nat", &block(vec![nat]))
    }

    /// `False : Prop`, with no constructors.
    pub(crate) fn declare_false(&mut self) -> Result<Arc<MutIndBody>, Box<dyn Error>> {
        let prop = self.prop();
        let f = self.one("False", &[], prop, vec![]);
        self.declare("False", &block(vec![f]))
    }

    /// `list (A : Type(list.u)) : Type(list.u) := nil | cons (x : A) (l : list A)`
    pub(crate) fn declare_list(&mut self) -> Result<Arc<MutIndBody>, Box<dyn Error>> {
        let u = self.n("list.u");
        let ty = self.type_u("list.u");
        let a = self.assum("A", ty);
        let r0 = self.rel(0);
        let nil = self.rel_app(1, &[r0]);
        let r1 = self.rel(1);
        let list_a = self.rel_app(2, &[r1]);
        let r2 = self.rel(2);
        let concl = self.rel_app(3, &[r2]);
        let cons_inner = self.pi("l", list_a, concl);
        let cons = self.pi("x", r0, cons_inner);
        let list = self.one("list", &[a], ty, vec![("nil", nil), ("cons", cons)]);
        let mut entry = block(vec![list]);
        entry.universes = UniverseEntry::Monomorphic { levels: vec![u], constraints: Vec::new() };
        self.declare("list", &entry)
    }

    /// `tree (A : Set) : Set := node (a : A) (f : forest A)` and
    /// `forest (A : Set) : Set := leaf | fcons (t : tree A) (f : forest A)`
    pub(crate) fn tree_forest(&mut self) -> MutualInductiveEntry {
        let set = self.set();
        let a = self.assum("A", set);
        let (r0, r1) = (self.rel(0), self.rel(1));
        let forest_a = self.rel_app(2, &[r1]);
        let r2 = self.rel(2);
        let tree_a = self.rel_app(4, &[r2]);
        let node_inner = self.pi("f", forest_a, tree_a);
        let node = self.pi("a", r0, node_inner);

        let leaf = self.rel_app(1, &[r0]);
        let tree_a0 = self.rel_app(2, &[r0]);
        let forest_a1 = self.rel_app(2, &[r1]);
        let forest_a2 = self.rel_app(3, &[r2]);
        let fcons_inner = self.pi("f", forest_a1, forest_a2);
        let fcons = self.pi("t", tree_a0, fcons_inner);

        let tree = self.one("tree", &[a], set, vec![("node", node)]);
        let forest = self.one("forest", &[a], set, vec![("leaf", leaf), ("fcons", fcons)]);
        block(vec![tree, forest])
    }
}
