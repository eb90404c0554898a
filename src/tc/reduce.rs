use crate::env::{Declar, RelDecl};
use crate::expr::Expr::{self, *};
use crate::level::Sort;
use crate::tc::{TcResult, TypeChecker, TypeError};
use crate::util::ExprPtr;

impl<'x> TypeChecker<'x> {
    /// Weak-head reduction without unfolding definitions: beta, zeta (including
    /// let-bound variables of the local context), iota and projections.
    pub fn whnf_core(&mut self, e: ExprPtr) -> ExprPtr {
        if self.ctx.closed(e) {
            if let Some(cached) = self.tc_cache.whnf_core_cache.get(&e) {
                return *cached
            }
        }
        let out = self.reduce(e, false);
        if self.ctx.closed(e) {
            self.tc_cache.whnf_core_cache.insert(e, out);
        }
        out
    }

    /// `whnf_core` plus delta reduction of definitions.
    pub fn whnf(&mut self, e: ExprPtr) -> ExprPtr {
        if self.ctx.closed(e) {
            if let Some(cached) = self.tc_cache.whnf_cache.get(&e) {
                return *cached
            }
        }
        let out = self.reduce(e, true);
        if self.ctx.closed(e) {
            self.tc_cache.whnf_cache.insert(e, out);
        }
        out
    }

    fn reduce(&mut self, mut e: ExprPtr, delta: bool) -> ExprPtr {
        loop {
            let (head, args) = self.ctx.unfold_apps(e);
            let next = match self.ctx.read_expr(head) {
                Lambda { .. } if !args.is_empty() => {
                    let mut body = head;
                    let mut consumed = 0usize;
                    while let (Lambda { body: inner, .. }, true) = (self.ctx.read_expr(body), consumed < args.len()) {
                        body = inner;
                        consumed += 1;
                    }
                    let vals = args[..consumed].iter().rev().copied().collect::<Vec<_>>();
                    let reduced = self.ctx.subst(body, &vals);
                    self.ctx.mk_apps(reduced, &args[consumed..])
                }
                Let { val, body, .. } => {
                    let reduced = self.ctx.instantiate1(body, val);
                    self.ctx.mk_apps(reduced, &args)
                }
                Rel { idx, .. } => match self.lookup_rel(idx) {
                    Ok(RelDecl::LocalDef { val, .. }) => self.ctx.mk_apps(val, &args),
                    _ => return e,
                },
                Case { ind, discr, branches, .. } => {
                    let discr = if delta { self.whnf(discr) } else { self.whnf_core(discr) };
                    let (c_head, c_args) = self.ctx.unfold_apps(discr);
                    match self.ctx.read_expr(c_head) {
                        Construct { ind: c_ind, idx, .. } if c_ind == ind => {
                            let nparams = match self.env.lookup_ind(ind) {
                                Some((mib, _)) => mib.nparams,
                                None => return e,
                            };
                            let branches = self.ctx.read_exprs(branches);
                            let branch = match branches.get(idx as usize) {
                                Some(b) if c_args.len() >= nparams => *b,
                                _ => return e,
                            };
                            let reduced = self.ctx.mk_apps(branch, &c_args[nparams..]);
                            self.ctx.mk_apps(reduced, &args)
                        }
                        _ => return e,
                    }
                }
                Proj { ind, field, structure, .. } => {
                    let structure = if delta { self.whnf(structure) } else { self.whnf_core(structure) };
                    let (c_head, c_args) = self.ctx.unfold_apps(structure);
                    match self.ctx.read_expr(c_head) {
                        Construct { ind: c_ind, .. } if c_ind == ind => {
                            let nparams = match self.env.lookup_ind(ind) {
                                Some((mib, _)) => mib.nparams,
                                None => return e,
                            };
                            match c_args.get(nparams + field as usize) {
                                Some(arg) => self.ctx.mk_apps(*arg, &args),
                                None => return e,
                            }
                        }
                        _ => return e,
                    }
                }
                Const { name, levels, .. } if delta => match self.env.get_declar(name) {
                    Some(Declar::Definition { uparams, val, .. }) => {
                        let levels = self.ctx.read_levels(levels);
                        let val = self.ctx.subst_univs(*val, uparams, &levels);
                        self.ctx.mk_apps(val, &args)
                    }
                    _ => return e,
                },
                _ => return e,
            };
            e = next;
        }
    }

    /// Strong normalization.
    pub fn nf(&mut self, e: ExprPtr) -> ExprPtr {
        let closed = self.ctx.closed(e);
        if closed {
            if let Some(cached) = self.tc_cache.nf_cache.get(&e) {
                return *cached
            }
        }
        let e_whnf = self.whnf(e);
        let (head, args) = self.ctx.unfold_apps(e_whnf);
        let head = match self.ctx.read_expr(head) {
            Prod { binder_name, binder_type, body, .. } => {
                let t = self.nf(binder_type);
                self.push_assum(binder_name, binder_type);
                let b = self.nf(body);
                self.pop_decl();
                self.ctx.mk_prod(binder_name, t, b)
            }
            Lambda { binder_name, binder_type, body, .. } => {
                let t = self.nf(binder_type);
                self.push_assum(binder_name, binder_type);
                let b = self.nf(body);
                self.pop_decl();
                self.ctx.mk_lambda(binder_name, t, b)
            }
            Case { ind, ret, discr, branches, .. } => {
                let r = self.nf(ret);
                let d = self.nf(discr);
                let bs = self.ctx.read_exprs(branches).iter().map(|b| self.nf(*b)).collect::<Vec<_>>();
                self.ctx.mk_case(ind, r, d, &bs)
            }
            Proj { ind, field, structure, .. } => {
                let s = self.nf(structure);
                self.ctx.mk_proj(ind, field, s)
            }
            _ => head,
        };
        let args = args.into_iter().map(|a| self.nf(a)).collect::<Vec<_>>();
        let out = self.ctx.mk_apps(head, &args);
        if closed {
            self.tc_cache.nf_cache.insert(e, out);
        }
        out
    }

    /// Instantiate the product type `ty` with `args`, reducing to expose each product.
    pub fn hnf_prod_apps(&mut self, mut ty: ExprPtr, args: &[ExprPtr]) -> TcResult<ExprPtr> {
        for arg in args.iter().copied() {
            let ty_whnf = self.whnf(ty);
            match self.ctx.read_expr(ty_whnf) {
                Prod { body, .. } => ty = self.ctx.instantiate1(body, arg),
                _ => return Err(TypeError::NotAProduct(ty_whnf)),
            }
        }
        Ok(ty)
    }

    /// Split `e` into its leading products and lets and what remains, reducing only
    /// when no binder is exposed syntactically.
    pub fn dest_prod_assum(&mut self, e: ExprPtr) -> (Vec<RelDecl>, ExprPtr) {
        let mut decls = Vec::new();
        let mut cursor = e;
        loop {
            match self.ctx.read_expr(cursor) {
                Prod { binder_name, binder_type, body, .. } => {
                    let decl = RelDecl::LocalAssum { name: binder_name, ty: binder_type };
                    self.push_decl(decl);
                    decls.push(decl);
                    cursor = body;
                }
                Let { binder_name, binder_type, val, body, .. } => {
                    let decl = RelDecl::LocalDef { name: binder_name, val, ty: binder_type };
                    self.push_decl(decl);
                    decls.push(decl);
                    cursor = body;
                }
                _ => {
                    let reduced = self.whnf(cursor);
                    if reduced == cursor {
                        break
                    }
                    cursor = reduced;
                }
            }
        }
        self.pop_decls(decls.len());
        (decls, cursor)
    }

    /// Decompose an arity into its signature and concluding sort.
    pub fn dest_arity(&mut self, e: ExprPtr) -> TcResult<(Vec<RelDecl>, Sort)> {
        let (decls, concl) = self.dest_prod_assum(e);
        match self.ctx.read_expr(concl) {
            Expr::Sort { sort, .. } => Ok((decls, sort)),
            _ => Err(TypeError::NotAnArity(e)),
        }
    }

    /// Reduce `e` to a sort.
    pub fn ensure_sort(&mut self, e: ExprPtr) -> TcResult<Sort> {
        let e_whnf = self.whnf(e);
        match self.ctx.read_expr(e_whnf) {
            Expr::Sort { sort, .. } => Ok(sort),
            _ => Err(TypeError::NotASort(e)),
        }
    }
}
