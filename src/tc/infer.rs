use crate::env::{Declar, RelDecl};
use crate::expr::{Expr, Expr::*, IndRef};
use crate::inductive::{IndArity, MutIndBody, UniverseEntry};
use crate::level::{Level, Sort};
use crate::tc::{TcResult, TypeChecker, TypeError};
use crate::univ::ConstraintKind;
use crate::util::{ExprPtr, ExprsPtr, LevelPtr, LevelsPtr, NamePtr};

impl<'x> TypeChecker<'x> {
    pub fn infer(&mut self, e: ExprPtr) -> TcResult<ExprPtr> {
        let closed = self.ctx.closed(e);
        if closed {
            if let Some(cached) = self.tc_cache.infer_cache.get(&e) {
                return Ok(*cached)
            }
        }
        let out = self.infer_core(e)?;
        if closed {
            self.tc_cache.infer_cache.insert(e, out);
        }
        Ok(out)
    }

    fn infer_core(&mut self, e: ExprPtr) -> TcResult<ExprPtr> {
        match self.ctx.read_expr(e) {
            Rel { idx, .. } => Ok(self.lookup_rel(idx)?.ty()),
            Var { name, .. } => self.env.lookup_named(name).ok_or(TypeError::UnboundVar(name)),
            Expr::Sort { sort, .. } => {
                if let Sort::Type(l) = sort {
                    self.check_level_declared(l)?;
                }
                let s = self.ctx.sort_of_sort(sort);
                Ok(self.ctx.mk_sort(s))
            }
            Prod { binder_name, binder_type, body, .. } => {
                let s1 = self.infer_sort(binder_type)?;
                self.push_assum(binder_name, binder_type);
                let s2 = self.infer_sort(body);
                self.pop_decl();
                let impredicative_set = self.env.flags.impredicative_set;
                let s = self.ctx.sort_of_product(s1, s2?, impredicative_set);
                Ok(self.ctx.mk_sort(s))
            }
            Lambda { binder_name, binder_type, body, .. } => {
                self.infer_sort(binder_type)?;
                self.push_assum(binder_name, binder_type);
                let body_ty = self.infer(body);
                self.pop_decl();
                Ok(self.ctx.mk_prod(binder_name, binder_type, body_ty?))
            }
            Let { binder_name, binder_type, val, body, .. } => {
                self.infer_sort(binder_type)?;
                self.check(val, binder_type)?;
                self.push_decl(RelDecl::LocalDef { name: binder_name, val, ty: binder_type });
                let body_ty = self.infer(body);
                self.pop_decl();
                Ok(self.ctx.instantiate1(body_ty?, val))
            }
            App { .. } => self.infer_app(e),
            Const { name, levels, .. } => self.type_of_const(name, levels),
            Ind { ind, levels, .. } => self.type_of_inductive(ind, levels),
            Construct { ind, idx, levels, .. } => self.type_of_constructor(ind, idx, levels),
            Case { ind, ret, discr, branches, .. } => self.infer_case(ind, ret, discr, branches),
            Proj { ind, field, structure, .. } => self.infer_proj(ind, field, structure),
        }
    }

    pub fn infer_sort(&mut self, e: ExprPtr) -> TcResult<Sort> {
        let ty = self.infer(e)?;
        self.ensure_sort(ty)
    }

    /// The term together with the sort of its type; `e` must be a type.
    pub fn infer_type(&mut self, e: ExprPtr) -> TcResult<(ExprPtr, Sort)> { Ok((e, self.infer_sort(e)?)) }

    pub fn check(&mut self, e: ExprPtr, ty: ExprPtr) -> TcResult<()> {
        let inferred = self.infer(e)?;
        if self.is_conv_leq(inferred, ty)? {
            Ok(())
        } else {
            Err(TypeError::TypeMismatch { expected: ty, found: inferred })
        }
    }

    fn check_level_declared(&self, l: LevelPtr) -> TcResult<()> {
        if self.env.flags.check_universes {
            self.env.ugraph.check_declared(&*self.ctx, l)
        } else {
            Ok(())
        }
    }

    fn infer_app(&mut self, e: ExprPtr) -> TcResult<ExprPtr> {
        let (head, args) = self.ctx.unfold_apps(e);
        let mut fun_ty = match self.ctx.read_expr(head) {
            Ind { ind, levels, .. } if self.is_template(ind) => self.type_of_template_app(ind, levels, &args)?,
            _ => self.infer(head)?,
        };
        for arg in args.iter().copied() {
            let fun_ty_whnf = self.whnf(fun_ty);
            match self.ctx.read_expr(fun_ty_whnf) {
                Prod { binder_type, body, .. } => {
                    self.check(arg, binder_type)?;
                    fun_ty = self.ctx.instantiate1(body, arg);
                }
                _ => return Err(TypeError::NotAProduct(fun_ty_whnf)),
            }
        }
        Ok(fun_ty)
    }

    fn is_template(&self, ind: IndRef) -> bool {
        matches!(self.env.lookup_ind(ind), Some((_, packet)) if matches!(packet.arity, IndArity::Template { .. }))
    }

    /// The type of a template inductive applied to `args`: each contributing parameter
    /// level is replaced by the level concluding the type of the matching argument.
    fn type_of_template_app(&mut self, ind: IndRef, levels: LevelsPtr, args: &[ExprPtr]) -> TcResult<ExprPtr> {
        let env = self.env;
        let param_levels = match env.lookup_ind(ind) {
            Some((_, packet)) => match &packet.arity {
                IndArity::Template { param_levels, .. } => param_levels.clone(),
                IndArity::Regular { .. } => Vec::new(),
            },
            None => return Err(TypeError::UnknownInductive(ind)),
        };
        let base = self.type_of_inductive(ind, levels)?;
        let (mut ks, mut vs) = (Vec::new(), Vec::new());
        for (arg, contributing) in args.iter().copied().zip(param_levels) {
            let name = match contributing.map(|l| self.ctx.read_level(l)) {
                Some(Level::Param(name, _)) => name,
                _ => continue,
            };
            let arg_ty = self.infer(arg)?;
            let actual = match self.dest_arity(arg_ty)?.1 {
                Sort::Prop => self.ctx.zero(),
                Sort::Type(l) => l,
            };
            ks.push(name);
            vs.push(actual);
        }
        Ok(self.ctx.subst_univs(base, &ks, &vs))
    }

    fn type_of_const(&mut self, name: NamePtr, levels: LevelsPtr) -> TcResult<ExprPtr> {
        let env = self.env;
        let (uparams, ty) = match env.get_declar(name) {
            Some(Declar::Axiom { uparams, ty, .. }) | Some(Declar::Definition { uparams, ty, .. }) => (uparams, *ty),
            _ => return Err(TypeError::UnknownConstant(name)),
        };
        let ls = self.ctx.read_levels(levels);
        if ls.len() != uparams.len() {
            return Err(TypeError::BadInstance(name))
        }
        for l in ls.iter().copied() {
            self.check_level_declared(l)?;
        }
        Ok(self.ctx.subst_univs(ty, uparams, &ls))
    }

    /// Check a universe instance of `mib`, returning it as a substitution.
    pub(crate) fn check_instance(
        &mut self,
        mib: &MutIndBody,
        levels: LevelsPtr,
    ) -> TcResult<(Vec<NamePtr>, Vec<LevelPtr>)> {
        let ls = self.ctx.read_levels(levels);
        match &mib.universes {
            UniverseEntry::Monomorphic { .. } if ls.is_empty() => Ok((Vec::new(), Vec::new())),
            UniverseEntry::Monomorphic { .. } => Err(TypeError::BadInstance(mib.name)),
            UniverseEntry::Polymorphic { params, constraints } => {
                if ls.len() != params.len() {
                    return Err(TypeError::BadInstance(mib.name))
                }
                for l in ls.iter().copied() {
                    self.check_level_declared(l)?;
                }
                if self.env.flags.check_universes {
                    for c in constraints.iter() {
                        let lhs = self.ctx.subst_level(c.lhs, params, &ls);
                        let rhs = self.ctx.subst_level(c.rhs, params, &ls);
                        let holds = match c.kind {
                            ConstraintKind::Le => self.env.ugraph.check_leq(&*self.ctx, lhs, rhs)?,
                            ConstraintKind::Eq => self.env.ugraph.check_eq(&*self.ctx, lhs, rhs)?,
                            ConstraintKind::Lt => {
                                let lhs = self.ctx.succ(lhs);
                                self.env.ugraph.check_leq(&*self.ctx, lhs, rhs)?
                            }
                        };
                        if !holds {
                            return Err(TypeError::BadInstance(mib.name))
                        }
                    }
                }
                Ok((params.clone(), ls.to_vec()))
            }
        }
    }

    pub fn type_of_inductive(&mut self, ind: IndRef, levels: LevelsPtr) -> TcResult<ExprPtr> {
        let env = self.env;
        let (mib, packet) = env.lookup_ind(ind).ok_or(TypeError::UnknownInductive(ind))?;
        let (ks, vs) = self.check_instance(mib, levels)?;
        let concl = self.ctx.mk_sort(packet.arity.sort());
        let ty = self.ctx.it_mk_prod_or_let(&packet.arity_ctx, concl);
        Ok(self.ctx.subst_univs(ty, &ks, &vs))
    }

    pub fn type_of_constructor(&mut self, ind: IndRef, idx: u32, levels: LevelsPtr) -> TcResult<ExprPtr> {
        let env = self.env;
        let (mib, packet) = env.lookup_ind(ind).ok_or(TypeError::UnknownInductive(ind))?;
        let ty = *packet.user_lc.get(idx as usize).ok_or(TypeError::UnknownConstructor(ind, idx))?;
        let (ks, vs) = self.check_instance(mib, levels)?;
        Ok(self.ctx.subst_univs(ty, &ks, &vs))
    }

    /// Values for every declaration of `params_ctx` given the arguments of its
    /// assumptions, innermost first (ready for `subst`).
    pub(crate) fn param_values(&mut self, params_ctx: &[RelDecl], args: &[ExprPtr]) -> Option<Vec<ExprPtr>> {
        let mut vals: Vec<ExprPtr> = Vec::with_capacity(params_ctx.len());
        let mut args = args.iter().copied();
        for decl in params_ctx.iter() {
            let v = match decl {
                RelDecl::LocalAssum { .. } => args.next()?,
                RelDecl::LocalDef { val, .. } => self.ctx.subst(*val, &vals),
            };
            vals.insert(0, v);
        }
        Some(vals)
    }

    fn infer_case(&mut self, ind: IndRef, ret: ExprPtr, discr: ExprPtr, branches: ExprsPtr) -> TcResult<ExprPtr> {
        let env = self.env;
        let (mib, packet) = env.lookup_ind(ind).ok_or(TypeError::UnknownInductive(ind))?;
        let discr_ty = self.infer(discr)?;
        let discr_ty = self.whnf(discr_ty);
        let (head, args) = self.ctx.unfold_apps(discr_ty);
        let levels = match self.ctx.read_expr(head) {
            Ind { ind: found, levels, .. } if found == ind && args.len() == mib.nparams + packet.nrealargs => levels,
            _ => return Err(TypeError::CaseOnNonInductive(discr_ty)),
        };
        let (ks, vs) = self.check_instance(mib, levels)?;
        let (params, indices) = args.split_at(mib.nparams);
        let param_vals = self.param_values(&mib.params, params).ok_or(TypeError::CaseOnNonInductive(discr_ty))?;

        // The predicate must map the indices and the matched value to a sort.
        let signature = self.ctx.subst_univs_rel_ctx(&packet.arity_ctx[mib.params.len()..], &ks, &vs);
        let real_ctx = self.ctx.subst_rel_ctx(&signature, &param_vals);
        let nreal = real_ctx.len() as u32;
        let ind_term = self.ctx.mk_ind(ind, levels);
        let mut self_args = params.iter().map(|p| self.ctx.lift(*p, nreal)).collect::<Vec<_>>();
        self_args.extend(self.ctx.rel_list(&real_ctx));
        let self_ty = self.ctx.mk_apps(ind_term, &self_args);
        let anon = self.ctx.anonymous();
        self.push_decls(&real_ctx);
        self.push_assum(anon, self_ty);
        let ret_lifted = self.ctx.lift(ret, nreal + 1);
        let mut pred_args = self.ctx.rel_list_lifted(&real_ctx, 1);
        pred_args.push(self.ctx.mk_rel(0));
        let pred_app = self.ctx.mk_apps(ret_lifted, &pred_args);
        let target = self.infer_sort(pred_app);
        self.pop_decls(real_ctx.len() + 1);
        if self.ctx.sort_family(target?) > packet.kelim {
            return Err(TypeError::BadElimination { ind })
        }

        let branches = self.ctx.read_exprs(branches);
        if branches.len() != packet.consnames.len() {
            return Err(TypeError::BadBranchCount { ind, expected: packet.consnames.len(), found: branches.len() })
        }
        for (c, branch) in branches.iter().copied().enumerate() {
            let cty = self.ctx.subst_univs(packet.user_lc[c], &ks, &vs);
            let expected = self.branch_type(ind, c as u32, levels, cty, params, ret)?;
            self.check(branch, expected)?;
        }
        let mut out_args = indices.to_vec();
        out_args.push(discr);
        Ok(self.ctx.mk_apps(ret, &out_args))
    }

    /// `∀ fields, ret indices (C params fields)` for constructor `c` of type `cty`.
    fn branch_type(
        &mut self,
        ind: IndRef,
        c: u32,
        levels: LevelsPtr,
        cty: ExprPtr,
        params: &[ExprPtr],
        ret: ExprPtr,
    ) -> TcResult<ExprPtr> {
        let inst = self.hnf_prod_apps(cty, params)?;
        let (fields, concl) = self.dest_prod_assum(inst);
        let k = fields.len() as u32;
        let (_, concl_args) = self.ctx.unfold_apps(concl);
        let concl_indices = concl_args.get(params.len()..).unwrap_or(&[]).to_vec();
        let ctor = self.ctx.mk_construct(ind, c, levels);
        let mut ctor_args = params.iter().map(|p| self.ctx.lift(*p, k)).collect::<Vec<_>>();
        ctor_args.extend(self.ctx.rel_list(&fields));
        let ctor_app = self.ctx.mk_apps(ctor, &ctor_args);
        let ret_lifted = self.ctx.lift(ret, k);
        let mut ret_args = concl_indices;
        ret_args.push(ctor_app);
        let body = self.ctx.mk_apps(ret_lifted, &ret_args);
        Ok(self.ctx.it_mk_prod_or_let(&fields, body))
    }

    fn infer_proj(&mut self, ind: IndRef, field: u32, structure: ExprPtr) -> TcResult<ExprPtr> {
        let env = self.env;
        let (mib, _) = env.lookup_ind(ind).ok_or(TypeError::UnknownInductive(ind))?;
        let proj = mib
            .record
            .as_ref()
            .and_then(|r| r.projections.get(field as usize))
            .ok_or(TypeError::BadProjection { ind, field })?;
        let s_ty = self.infer(structure)?;
        let s_ty = self.whnf(s_ty);
        let (head, mut args) = self.ctx.unfold_apps(s_ty);
        let levels = match self.ctx.read_expr(head) {
            Ind { ind: found, levels, .. } if found == ind && args.len() == mib.nparams => levels,
            _ => return Err(TypeError::BadProjection { ind, field }),
        };
        let (ks, vs) = self.check_instance(mib, levels)?;
        let ty = self.ctx.subst_univs(proj.ty, &ks, &vs);
        args.push(structure);
        self.hnf_prod_apps(ty, &args)
    }
}
