use crate::env::RelDecl;
use crate::hash64;
use crate::level::Sort;
use crate::util::{new_fx_hash_map, ExprPtr, ExprsPtr, FxHashMap, LevelPtr, LevelsPtr, NamePtr, TcCtx};
use std::hash::{Hash, Hasher};

use Expr::*;

pub(crate) const REL_HASH: u64 = 281;
pub(crate) const VAR_HASH: u64 = 397;
pub(crate) const SORT_HASH: u64 = 503;
pub(crate) const PROD_HASH: u64 = 641;
pub(crate) const LAMBDA_HASH: u64 = 757;
pub(crate) const LET_HASH: u64 = 863;
pub(crate) const APP_HASH: u64 = 983;
pub(crate) const CONST_HASH: u64 = 1069;
pub(crate) const IND_HASH: u64 = 1187;
pub(crate) const CONSTRUCT_HASH: u64 = 1297;
pub(crate) const CASE_HASH: u64 = 1423;
pub(crate) const PROJ_HASH: u64 = 1549;

/// The `idx`th inductive type of the mutual block `mind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndRef {
    pub mind: NamePtr,
    pub idx: u32,
}

/// Terms, with 0-based de Bruijn indices for bound variables.
///
/// `Case { ret, .. }` carries the return predicate as a function of the inductive's
/// indices and of the matched value; each branch is a function of its constructor's
/// real arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expr {
    Rel {
        idx: u32,
        hash: u64,
    },
    /// A section variable.
    Var {
        name: NamePtr,
        hash: u64,
    },
    Sort {
        sort: Sort,
        hash: u64,
    },
    Prod {
        binder_name: NamePtr,
        binder_type: ExprPtr,
        body: ExprPtr,
        num_loose_bvars: u32,
        hash: u64,
    },
    Lambda {
        binder_name: NamePtr,
        binder_type: ExprPtr,
        body: ExprPtr,
        num_loose_bvars: u32,
        hash: u64,
    },
    Let {
        binder_name: NamePtr,
        binder_type: ExprPtr,
        val: ExprPtr,
        body: ExprPtr,
        num_loose_bvars: u32,
        hash: u64,
    },
    App {
        fun: ExprPtr,
        arg: ExprPtr,
        num_loose_bvars: u32,
        hash: u64,
    },
    Const {
        name: NamePtr,
        levels: LevelsPtr,
        hash: u64,
    },
    Ind {
        ind: IndRef,
        levels: LevelsPtr,
        hash: u64,
    },
    Construct {
        ind: IndRef,
        idx: u32,
        levels: LevelsPtr,
        hash: u64,
    },
    Case {
        ind: IndRef,
        ret: ExprPtr,
        discr: ExprPtr,
        branches: ExprsPtr,
        num_loose_bvars: u32,
        hash: u64,
    },
    Proj {
        ind: IndRef,
        field: u32,
        structure: ExprPtr,
        num_loose_bvars: u32,
        hash: u64,
    },
}

impl Hash for Expr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Rel { hash, .. }
            | Var { hash, .. }
            | Expr::Sort { hash, .. }
            | Prod { hash, .. }
            | Lambda { hash, .. }
            | Let { hash, .. }
            | App { hash, .. }
            | Const { hash, .. }
            | Ind { hash, .. }
            | Construct { hash, .. }
            | Case { hash, .. }
            | Proj { hash, .. } => state.write_u64(*hash),
        }
    }
}

impl TcCtx {
    pub fn num_loose_bvars(&self, e: ExprPtr) -> u32 {
        match self.read_expr(e) {
            Rel { idx, .. } => idx + 1,
            Var { .. } | Expr::Sort { .. } | Const { .. } | Ind { .. } | Construct { .. } => 0,
            Prod { num_loose_bvars, .. }
            | Lambda { num_loose_bvars, .. }
            | Let { num_loose_bvars, .. }
            | App { num_loose_bvars, .. }
            | Case { num_loose_bvars, .. }
            | Proj { num_loose_bvars, .. } => num_loose_bvars,
        }
    }

    pub fn closed(&self, e: ExprPtr) -> bool { self.num_loose_bvars(e) == 0 }

    pub fn mk_rel(&mut self, idx: u32) -> ExprPtr {
        let hash = hash64!(REL_HASH, idx);
        self.alloc_expr(Rel { idx, hash })
    }

    pub fn mk_var(&mut self, name: NamePtr) -> ExprPtr {
        let hash = hash64!(VAR_HASH, name);
        self.alloc_expr(Var { name, hash })
    }

    pub fn mk_sort(&mut self, sort: Sort) -> ExprPtr {
        let hash = hash64!(SORT_HASH, sort);
        self.alloc_expr(Expr::Sort { sort, hash })
    }

    pub fn mk_prop(&mut self) -> ExprPtr { self.mk_sort(Sort::Prop) }

    pub fn mk_set(&mut self) -> ExprPtr {
        let set = self.set_sort();
        self.mk_sort(set)
    }

    pub fn mk_type(&mut self, l: LevelPtr) -> ExprPtr { self.mk_sort(Sort::Type(l)) }

    pub fn mk_prod(&mut self, binder_name: NamePtr, binder_type: ExprPtr, body: ExprPtr) -> ExprPtr {
        let hash = hash64!(PROD_HASH, binder_name, binder_type, body);
        let num_loose_bvars = self.num_loose_bvars(binder_type).max(self.num_loose_bvars(body).saturating_sub(1));
        self.alloc_expr(Prod { binder_name, binder_type, body, num_loose_bvars, hash })
    }

    pub fn mk_lambda(&mut self, binder_name: NamePtr, binder_type: ExprPtr, body: ExprPtr) -> ExprPtr {
        let hash = hash64!(LAMBDA_HASH, binder_name, binder_type, body);
        let num_loose_bvars = self.num_loose_bvars(binder_type).max(self.num_loose_bvars(body).saturating_sub(1));
        self.alloc_expr(Lambda { binder_name, binder_type, body, num_loose_bvars, hash })
    }

    pub fn mk_let(&mut self, binder_name: NamePtr, binder_type: ExprPtr, val: ExprPtr, body: ExprPtr) -> ExprPtr {
        let hash = hash64!(LET_HASH, binder_name, binder_type, val, body);
        let num_loose_bvars = self
            .num_loose_bvars(binder_type)
            .max(self.num_loose_bvars(val))
            .max(self.num_loose_bvars(body).saturating_sub(1));
        self.alloc_expr(Let { binder_name, binder_type, val, body, num_loose_bvars, hash })
    }

    pub fn mk_app(&mut self, fun: ExprPtr, arg: ExprPtr) -> ExprPtr {
        let hash = hash64!(APP_HASH, fun, arg);
        let num_loose_bvars = self.num_loose_bvars(fun).max(self.num_loose_bvars(arg));
        self.alloc_expr(App { fun, arg, num_loose_bvars, hash })
    }

    pub fn mk_apps(&mut self, mut fun: ExprPtr, args: &[ExprPtr]) -> ExprPtr {
        for arg in args.iter().copied() {
            fun = self.mk_app(fun, arg);
        }
        fun
    }

    pub fn mk_const(&mut self, name: NamePtr, levels: LevelsPtr) -> ExprPtr {
        let hash = hash64!(CONST_HASH, name, levels);
        self.alloc_expr(Const { name, levels, hash })
    }

    pub fn mk_ind(&mut self, ind: IndRef, levels: LevelsPtr) -> ExprPtr {
        let hash = hash64!(IND_HASH, ind, levels);
        self.alloc_expr(Ind { ind, levels, hash })
    }

    pub fn mk_construct(&mut self, ind: IndRef, idx: u32, levels: LevelsPtr) -> ExprPtr {
        let hash = hash64!(CONSTRUCT_HASH, ind, idx, levels);
        self.alloc_expr(Construct { ind, idx, levels, hash })
    }

    pub fn mk_case(&mut self, ind: IndRef, ret: ExprPtr, discr: ExprPtr, branches: &[ExprPtr]) -> ExprPtr {
        let num_loose_bvars = branches
            .iter()
            .map(|b| self.num_loose_bvars(*b))
            .fold(self.num_loose_bvars(ret).max(self.num_loose_bvars(discr)), u32::max);
        let branches = self.alloc_exprs_slice(branches);
        let hash = hash64!(CASE_HASH, ind, ret, discr, branches);
        self.alloc_expr(Case { ind, ret, discr, branches, num_loose_bvars, hash })
    }

    pub fn mk_proj(&mut self, ind: IndRef, field: u32, structure: ExprPtr) -> ExprPtr {
        let hash = hash64!(PROJ_HASH, ind, field, structure);
        let num_loose_bvars = self.num_loose_bvars(structure);
        self.alloc_expr(Proj { ind, field, structure, num_loose_bvars, hash })
    }

    /// Split `f a0 .. an` into `f` and `[a0, .., an]`.
    pub fn unfold_apps(&self, mut e: ExprPtr) -> (ExprPtr, Vec<ExprPtr>) {
        let mut args = Vec::new();
        while let App { fun, arg, .. } = self.read_expr(e) {
            args.push(arg);
            e = fun;
        }
        args.reverse();
        (e, args)
    }

    pub fn lift(&mut self, e: ExprPtr, n: u32) -> ExprPtr { self.lift_from(e, n, 0) }

    /// Add `n` to every `Rel` at or above `k`.
    pub fn lift_from(&mut self, e: ExprPtr, n: u32, k: u32) -> ExprPtr {
        if n == 0 {
            return e
        }
        let mut cache = new_fx_hash_map();
        self.lift_core(e, n, k, &mut cache)
    }

    fn lift_core(&mut self, e: ExprPtr, n: u32, k: u32, cache: &mut FxHashMap<(ExprPtr, u32), ExprPtr>) -> ExprPtr {
        if self.num_loose_bvars(e) <= k {
            return e
        }
        if let Some(cached) = cache.get(&(e, k)) {
            return *cached
        }
        let out = match self.read_expr(e) {
            Rel { idx, .. } => self.mk_rel(idx + n),
            Prod { binder_name, binder_type, body, .. } => {
                let t = self.lift_core(binder_type, n, k, cache);
                let b = self.lift_core(body, n, k + 1, cache);
                self.mk_prod(binder_name, t, b)
            }
            Lambda { binder_name, binder_type, body, .. } => {
                let t = self.lift_core(binder_type, n, k, cache);
                let b = self.lift_core(body, n, k + 1, cache);
                self.mk_lambda(binder_name, t, b)
            }
            Let { binder_name, binder_type, val, body, .. } => {
                let t = self.lift_core(binder_type, n, k, cache);
                let v = self.lift_core(val, n, k, cache);
                let b = self.lift_core(body, n, k + 1, cache);
                self.mk_let(binder_name, t, v, b)
            }
            App { fun, arg, .. } => {
                let f = self.lift_core(fun, n, k, cache);
                let a = self.lift_core(arg, n, k, cache);
                self.mk_app(f, a)
            }
            Case { ind, ret, discr, branches, .. } => {
                let r = self.lift_core(ret, n, k, cache);
                let d = self.lift_core(discr, n, k, cache);
                let bs =
                    self.read_exprs(branches).iter().map(|b| self.lift_core(*b, n, k, cache)).collect::<Vec<_>>();
                self.mk_case(ind, r, d, &bs)
            }
            Proj { ind, field, structure, .. } => {
                let s = self.lift_core(structure, n, k, cache);
                self.mk_proj(ind, field, s)
            }
            Var { .. } | Expr::Sort { .. } | Const { .. } | Ind { .. } | Construct { .. } => e,
        };
        cache.insert((e, k), out);
        out
    }

    /// Replace `Rel(i)` by `vals[i]` for `i < vals.len()`, and lower the remaining
    /// free variables by `vals.len()`.
    pub fn subst(&mut self, e: ExprPtr, vals: &[ExprPtr]) -> ExprPtr {
        if vals.is_empty() || self.closed(e) {
            return e
        }
        let mut cache = new_fx_hash_map();
        self.subst_core(e, vals, 0, &mut cache)
    }

    /// `subst` for the free variables of `e` sitting above its first `k` binders.
    pub fn subst_from(&mut self, e: ExprPtr, vals: &[ExprPtr], k: u32) -> ExprPtr {
        if vals.is_empty() || self.num_loose_bvars(e) <= k {
            return e
        }
        let mut cache = new_fx_hash_map();
        self.subst_core(e, vals, k, &mut cache)
    }

    fn subst_core(
        &mut self,
        e: ExprPtr,
        vals: &[ExprPtr],
        depth: u32,
        cache: &mut FxHashMap<(ExprPtr, u32), ExprPtr>,
    ) -> ExprPtr {
        if self.num_loose_bvars(e) <= depth {
            return e
        }
        if let Some(cached) = cache.get(&(e, depth)) {
            return *cached
        }
        let out = match self.read_expr(e) {
            Rel { idx, .. } => {
                let rel = (idx - depth) as usize;
                if rel < vals.len() {
                    self.lift(vals[rel], depth)
                } else {
                    self.mk_rel(idx - vals.len() as u32)
                }
            }
            Prod { binder_name, binder_type, body, .. } => {
                let t = self.subst_core(binder_type, vals, depth, cache);
                let b = self.subst_core(body, vals, depth + 1, cache);
                self.mk_prod(binder_name, t, b)
            }
            Lambda { binder_name, binder_type, body, .. } => {
                let t = self.subst_core(binder_type, vals, depth, cache);
                let b = self.subst_core(body, vals, depth + 1, cache);
                self.mk_lambda(binder_name, t, b)
            }
            Let { binder_name, binder_type, val, body, .. } => {
                let t = self.subst_core(binder_type, vals, depth, cache);
                let v = self.subst_core(val, vals, depth, cache);
                let b = self.subst_core(body, vals, depth + 1, cache);
                self.mk_let(binder_name, t, v, b)
            }
            App { fun, arg, .. } => {
                let f = self.subst_core(fun, vals, depth, cache);
                let a = self.subst_core(arg, vals, depth, cache);
                self.mk_app(f, a)
            }
            Case { ind, ret, discr, branches, .. } => {
                let r = self.subst_core(ret, vals, depth, cache);
                let d = self.subst_core(discr, vals, depth, cache);
                let bs = self
                    .read_exprs(branches)
                    .iter()
                    .map(|b| self.subst_core(*b, vals, depth, cache))
                    .collect::<Vec<_>>();
                self.mk_case(ind, r, d, &bs)
            }
            Proj { ind, field, structure, .. } => {
                let s = self.subst_core(structure, vals, depth, cache);
                self.mk_proj(ind, field, s)
            }
            Var { .. } | Expr::Sort { .. } | Const { .. } | Ind { .. } | Construct { .. } => e,
        };
        cache.insert((e, depth), out);
        out
    }

    pub fn instantiate1(&mut self, body: ExprPtr, val: ExprPtr) -> ExprPtr { self.subst(body, &[val]) }

    /// True when no `Rel(i)` with `n <= i < n + m` occurs free in `e`.
    pub fn noccur_between(&self, e: ExprPtr, n: u32, m: u32) -> bool {
        let mut seen = new_fx_hash_map();
        self.noccur_core(e, n, m, &mut seen)
    }

    fn noccur_core(&self, e: ExprPtr, n: u32, m: u32, seen: &mut FxHashMap<(ExprPtr, u32), bool>) -> bool {
        if self.num_loose_bvars(e) <= n {
            return true
        }
        if let Some(cached) = seen.get(&(e, n)) {
            return *cached
        }
        let out = match self.read_expr(e) {
            Rel { idx, .. } => idx < n || idx >= n + m,
            Prod { binder_type, body, .. } | Lambda { binder_type, body, .. } =>
                self.noccur_core(binder_type, n, m, seen) && self.noccur_core(body, n + 1, m, seen),
            Let { binder_type, val, body, .. } =>
                self.noccur_core(binder_type, n, m, seen)
                    && self.noccur_core(val, n, m, seen)
                    && self.noccur_core(body, n + 1, m, seen),
            App { fun, arg, .. } => self.noccur_core(fun, n, m, seen) && self.noccur_core(arg, n, m, seen),
            Case { ret, discr, branches, .. } =>
                self.noccur_core(ret, n, m, seen)
                    && self.noccur_core(discr, n, m, seen)
                    && self.read_exprs(branches).iter().all(|b| self.noccur_core(*b, n, m, seen)),
            Proj { structure, .. } => self.noccur_core(structure, n, m, seen),
            Var { .. } | Expr::Sort { .. } | Const { .. } | Ind { .. } | Construct { .. } => true,
        };
        seen.insert((e, n), out);
        out
    }

    pub fn subst_levels(&mut self, ls: LevelsPtr, ks: &[NamePtr], vs: &[LevelPtr]) -> LevelsPtr {
        let substed = self.read_levels(ls).iter().map(|l| self.subst_level(*l, ks, vs)).collect::<Vec<_>>();
        self.alloc_levels_slice(&substed)
    }

    /// Substitute universe variables `ks` by `vs` throughout `e`.
    pub fn subst_univs(&mut self, e: ExprPtr, ks: &[NamePtr], vs: &[LevelPtr]) -> ExprPtr {
        if ks.is_empty() {
            return e
        }
        let mut cache = new_fx_hash_map();
        self.subst_univs_core(e, ks, vs, &mut cache)
    }

    fn subst_univs_core(
        &mut self,
        e: ExprPtr,
        ks: &[NamePtr],
        vs: &[LevelPtr],
        cache: &mut FxHashMap<ExprPtr, ExprPtr>,
    ) -> ExprPtr {
        if let Some(cached) = cache.get(&e) {
            return *cached
        }
        let out = match self.read_expr(e) {
            Rel { .. } | Var { .. } => e,
            Expr::Sort { sort, .. } => {
                let sort = self.subst_sort(sort, ks, vs);
                self.mk_sort(sort)
            }
            Const { name, levels, .. } => {
                let levels = self.subst_levels(levels, ks, vs);
                self.mk_const(name, levels)
            }
            Ind { ind, levels, .. } => {
                let levels = self.subst_levels(levels, ks, vs);
                self.mk_ind(ind, levels)
            }
            Construct { ind, idx, levels, .. } => {
                let levels = self.subst_levels(levels, ks, vs);
                self.mk_construct(ind, idx, levels)
            }
            Prod { binder_name, binder_type, body, .. } => {
                let t = self.subst_univs_core(binder_type, ks, vs, cache);
                let b = self.subst_univs_core(body, ks, vs, cache);
                self.mk_prod(binder_name, t, b)
            }
            Lambda { binder_name, binder_type, body, .. } => {
                let t = self.subst_univs_core(binder_type, ks, vs, cache);
                let b = self.subst_univs_core(body, ks, vs, cache);
                self.mk_lambda(binder_name, t, b)
            }
            Let { binder_name, binder_type, val, body, .. } => {
                let t = self.subst_univs_core(binder_type, ks, vs, cache);
                let v = self.subst_univs_core(val, ks, vs, cache);
                let b = self.subst_univs_core(body, ks, vs, cache);
                self.mk_let(binder_name, t, v, b)
            }
            App { fun, arg, .. } => {
                let f = self.subst_univs_core(fun, ks, vs, cache);
                let a = self.subst_univs_core(arg, ks, vs, cache);
                self.mk_app(f, a)
            }
            Case { ind, ret, discr, branches, .. } => {
                let r = self.subst_univs_core(ret, ks, vs, cache);
                let d = self.subst_univs_core(discr, ks, vs, cache);
                let bs = self
                    .read_exprs(branches)
                    .iter()
                    .map(|b| self.subst_univs_core(*b, ks, vs, cache))
                    .collect::<Vec<_>>();
                self.mk_case(ind, r, d, &bs)
            }
            Proj { ind, field, structure, .. } => {
                let s = self.subst_univs_core(structure, ks, vs, cache);
                self.mk_proj(ind, field, s)
            }
        };
        cache.insert(e, out);
        out
    }

    /// Replace `Ind(mind, i)` under `k` binders by `repl[i]` lifted by `k`.
    pub fn replace_ind(&mut self, e: ExprPtr, mind: NamePtr, repl: &[ExprPtr]) -> ExprPtr {
        let mut cache = new_fx_hash_map();
        self.replace_ind_core(e, mind, repl, 0, &mut cache)
    }

    fn replace_ind_core(
        &mut self,
        e: ExprPtr,
        mind: NamePtr,
        repl: &[ExprPtr],
        depth: u32,
        cache: &mut FxHashMap<(ExprPtr, u32), ExprPtr>,
    ) -> ExprPtr {
        if let Some(cached) = cache.get(&(e, depth)) {
            return *cached
        }
        let out = match self.read_expr(e) {
            Ind { ind, .. } if ind.mind == mind && (ind.idx as usize) < repl.len() =>
                self.lift(repl[ind.idx as usize], depth),
            Rel { .. } | Var { .. } | Expr::Sort { .. } | Const { .. } | Ind { .. } | Construct { .. } => e,
            Prod { binder_name, binder_type, body, .. } => {
                let t = self.replace_ind_core(binder_type, mind, repl, depth, cache);
                let b = self.replace_ind_core(body, mind, repl, depth + 1, cache);
                self.mk_prod(binder_name, t, b)
            }
            Lambda { binder_name, binder_type, body, .. } => {
                let t = self.replace_ind_core(binder_type, mind, repl, depth, cache);
                let b = self.replace_ind_core(body, mind, repl, depth + 1, cache);
                self.mk_lambda(binder_name, t, b)
            }
            Let { binder_name, binder_type, val, body, .. } => {
                let t = self.replace_ind_core(binder_type, mind, repl, depth, cache);
                let v = self.replace_ind_core(val, mind, repl, depth, cache);
                let b = self.replace_ind_core(body, mind, repl, depth + 1, cache);
                self.mk_let(binder_name, t, v, b)
            }
            App { fun, arg, .. } => {
                let f = self.replace_ind_core(fun, mind, repl, depth, cache);
                let a = self.replace_ind_core(arg, mind, repl, depth, cache);
                self.mk_app(f, a)
            }
            Case { ind, ret, discr, branches, .. } => {
                let r = self.replace_ind_core(ret, mind, repl, depth, cache);
                let d = self.replace_ind_core(discr, mind, repl, depth, cache);
                let bs = self
                    .read_exprs(branches)
                    .iter()
                    .map(|b| self.replace_ind_core(*b, mind, repl, depth, cache))
                    .collect::<Vec<_>>();
                self.mk_case(ind, r, d, &bs)
            }
            Proj { ind, field, structure, .. } => {
                let s = self.replace_ind_core(structure, mind, repl, depth, cache);
                self.mk_proj(ind, field, s)
            }
        };
        cache.insert((e, depth), out);
        out
    }

    /// The section variables occurring in `e`, in order of first occurrence.
    pub fn collect_vars(&self, e: ExprPtr, sink: &mut Vec<NamePtr>) {
        let mut seen = crate::util::new_fx_hash_set();
        let mut todo = vec![e];
        while let Some(e) = todo.pop() {
            if !seen.insert(e) {
                continue
            }
            match self.read_expr(e) {
                Var { name, .. } =>
                    if !sink.contains(&name) {
                        sink.push(name)
                    },
                Rel { .. } | Expr::Sort { .. } | Const { .. } | Ind { .. } | Construct { .. } => (),
                Prod { binder_type, body, .. } | Lambda { binder_type, body, .. } => {
                    todo.push(body);
                    todo.push(binder_type);
                }
                Let { binder_type, val, body, .. } => {
                    todo.push(body);
                    todo.push(val);
                    todo.push(binder_type);
                }
                App { fun, arg, .. } => {
                    todo.push(arg);
                    todo.push(fun);
                }
                Case { ret, discr, branches, .. } => {
                    todo.extend(self.read_exprs(branches).iter().rev().copied());
                    todo.push(discr);
                    todo.push(ret);
                }
                Proj { structure, .. } => todo.push(structure),
            }
        }
    }

    /// Close `body` under the declarations of `rel_ctx` (outermost first) with products
    /// and lets.
    pub fn it_mk_prod_or_let(&mut self, rel_ctx: &[RelDecl], mut body: ExprPtr) -> ExprPtr {
        for decl in rel_ctx.iter().rev() {
            body = match *decl {
                RelDecl::LocalAssum { name, ty } => self.mk_prod(name, ty, body),
                RelDecl::LocalDef { name, val, ty } => self.mk_let(name, ty, val, body),
            };
        }
        body
    }

    pub fn it_mk_lambda_or_let(&mut self, rel_ctx: &[RelDecl], mut body: ExprPtr) -> ExprPtr {
        for decl in rel_ctx.iter().rev() {
            body = match *decl {
                RelDecl::LocalAssum { name, ty } => self.mk_lambda(name, ty, body),
                RelDecl::LocalDef { name, val, ty } => self.mk_let(name, ty, val, body),
            };
        }
        body
    }

    /// The variables bound by `rel_ctx`, as seen right under it, skipping lets; outermost
    /// first.
    pub fn rel_list(&mut self, rel_ctx: &[RelDecl]) -> Vec<ExprPtr> {
        self.rel_list_lifted(rel_ctx, 0)
    }

    /// `rel_list`, as seen under `n` further binders.
    pub fn rel_list_lifted(&mut self, rel_ctx: &[RelDecl], n: u32) -> Vec<ExprPtr> {
        let len = rel_ctx.len() as u32;
        let mut out = Vec::new();
        for (pos, decl) in rel_ctx.iter().enumerate() {
            if decl.is_assum() {
                out.push(self.mk_rel(n + len - 1 - pos as u32));
            }
        }
        out
    }
}
