//! Typing of the parameters, arities and constructor types of a block.
use crate::env::RelDecl;
use crate::expr::Expr::*;
use crate::inductive::unit_shape::{combine_conditions, is_unit, UnitCondition};
use crate::inductive::{IndError, IndResult, MutualInductiveEntry, OneInductiveEntry};
use crate::level::Sort;
use crate::tc::{TypeChecker, TypeError};
use crate::util::{ExprPtr, NamePtr, TcCtx};
use tracing::{debug, trace};

/// What the arity checker learns about one inductive of the block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedInductive {
    pub typename: NamePtr,
    /// The arity's binders, typed under the parameters.
    pub signature: Vec<RelDecl>,
    /// The declared sort.
    pub sort: Sort,
    /// Sup of the sorts of the signature's assumptions.
    pub indices_sort: Sort,
    /// Sup of the sorts of every constructor argument.
    pub ctor_sort: Sort,
    pub unit: UnitCondition,
}

impl TypedInductive {
    /// `∀ params signature, sort`, closed.
    pub fn full_arity(&self, ctx: &mut TcCtx, params: &[RelDecl]) -> ExprPtr {
        let concl = ctx.mk_sort(self.sort);
        let arity = ctx.it_mk_prod_or_let(&self.signature, concl);
        ctx.it_mk_prod_or_let(params, arity)
    }
}

/// Type each declaration of `params`, leaving them pushed on `tc`.
pub(crate) fn push_params(tc: &mut TypeChecker, params: &[RelDecl]) -> IndResult<()> {
    for decl in params.iter().copied() {
        match decl {
            RelDecl::LocalAssum { ty, .. } => {
                tc.infer_sort(ty)?;
            }
            RelDecl::LocalDef { val, ty, .. } => {
                tc.infer_sort(ty)?;
                tc.check(val, ty)?;
            }
        }
        tc.push_decl(decl);
    }
    Ok(())
}

/// The parameters as seen from under `n` more binders placed outside them.
pub(crate) fn lift_params(tc: &mut TypeChecker, params: &[RelDecl], n: u32) -> Vec<RelDecl> {
    params.iter().enumerate().map(|(pos, d)| tc.ctx().lift_decl(*d, n, pos as u32)).collect()
}

/// The context binding the block's inductives by their full arities, first inductive
/// outermost.
pub(crate) fn arities_ctx(tc: &mut TypeChecker, params: &[RelDecl], typed: &[TypedInductive]) -> Vec<RelDecl> {
    typed
        .iter()
        .map(|t| RelDecl::LocalAssum { name: t.typename, ty: t.full_arity(tc.ctx(), params) })
        .collect()
}

/// Type the arity of `ind` under the parameters.
fn type_arity(tc: &mut TypeChecker, ind: &OneInductiveEntry) -> IndResult<(Vec<RelDecl>, Sort, Sort)> {
    let (arity, _) = tc.infer_type(ind.arity)?;
    let (signature, sort) = tc.dest_arity(arity).map_err(|e| match e {
        TypeError::NotAnArity(_) => IndError::NotAnArity { ind: ind.typename, arity: ind.arity },
        e => IndError::Type(e),
    })?;
    let mut indices_sort = Sort::Prop;
    for decl in signature.iter().copied() {
        if let RelDecl::LocalAssum { ty, .. } = decl {
            let (_, s) = tc.infer_type(ty)?;
            indices_sort = tc.ctx().sort_sup(indices_sort, s);
        }
        tc.push_decl(decl);
    }
    tc.pop_decls(signature.len());
    Ok((signature, sort, indices_sort))
}

/// Type one constructor under the arities and the parameters, returning the sup of
/// the sorts of its arguments and its unit condition.
fn type_constructor(tc: &mut TypeChecker, lc: ExprPtr) -> IndResult<(Sort, UnitCondition)> {
    let (mut cursor, _) = tc.infer_type(lc)?;
    let mut level = Sort::Prop;
    let mut pushed = 0usize;
    loop {
        let cursor_whnf = tc.whnf(cursor);
        match tc.ctx().read_expr(cursor_whnf) {
            Prod { binder_name, binder_type, body, .. } => {
                let (_, s) = tc.infer_type(binder_type)?;
                level = tc.ctx().sort_sup(level, s);
                tc.push_assum(binder_name, binder_type);
                pushed += 1;
                cursor = body;
            }
            _ => break,
        }
    }
    tc.pop_decls(pushed);

    let (fields, _) = tc.dest_prod_assum(lc);
    tc.push_decls(&fields);
    let args = tc.ctx().rel_list(&fields);
    let cond = is_unit(tc, &args);
    tc.pop_decls(fields.len());
    Ok((level, cond?))
}

/// Type the parameters, every arity and every constructor of `entry`.
pub fn check_arities(
    tc: &mut TypeChecker,
    entry: &MutualInductiveEntry,
    params: &[RelDecl],
) -> IndResult<Vec<TypedInductive>> {
    push_params(tc, params)?;
    let mut typed = Vec::with_capacity(entry.inds.len());
    for ind in entry.inds.iter() {
        let (signature, sort, indices_sort) = type_arity(tc, ind)?;
        debug!(ind = %tc.ctx().name_to_string(ind.typename), nrealdecls = signature.len(), "typed arity");
        typed.push(TypedInductive {
            typename: ind.typename,
            signature,
            sort,
            indices_sort,
            ctor_sort: Sort::Prop,
            unit: UnitCondition::AlwaysUnit,
        });
    }
    tc.pop_decls(params.len());

    let arities = arities_ctx(tc, params, &typed);
    let lifted = lift_params(tc, params, arities.len() as u32);
    tc.push_decls(&arities);
    tc.push_decls(&lifted);
    for (t, ind) in typed.iter_mut().zip(entry.inds.iter()) {
        let mut conds = Vec::with_capacity(ind.lc.len());
        for (cname, lc) in ind.consnames.iter().zip(ind.lc.iter()) {
            let (s, cond) = type_constructor(tc, *lc)?;
            trace!(cstr = %tc.ctx().name_to_string(*cname), unit = ?cond, "typed constructor");
            t.ctor_sort = tc.ctx().sort_sup(t.ctor_sort, s);
            conds.push(cond);
        }
        t.unit = combine_conditions(conds);
    }
    tc.pop_decls(arities.len() + lifted.len());
    Ok(typed)
}
