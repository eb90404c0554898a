//! Primitive projections for record-like blocks.
use crate::env::RelDecl;
use crate::expr::IndRef;
use crate::inductive::{IndArity, IndError, IndResult, OneIndBody, ProjectionBody, RecordInfo, SquashInfo};
use crate::tc::TypeChecker;
use crate::util::{new_fx_hash_set, ExprPtr, LevelsPtr, NamePtr};
use tracing::debug;

/// A single constructor with at least one argument, no indices, and unrestricted
/// elimination.
fn is_record_shaped(packet: &OneIndBody) -> bool {
    let unrestricted = match &packet.arity {
        IndArity::Template { .. } => true,
        IndArity::Regular { squash, .. } => *squash == SquashInfo::NoSquash,
    };
    packet.consnames.len() == 1 && packet.consnrealargs[0] > 0 && packet.nrealargs == 0 && unrestricted
}

/// Derive the projections of the lone inductive `packet` of block `mind`, named
/// `base.<field>`. `None` when the block does not qualify, a field is anonymous, or
/// two fields share a name. A projection name that is already taken is an error.
pub fn build_record(
    tc: &mut TypeChecker,
    mind: NamePtr,
    base: NamePtr,
    params: &[RelDecl],
    packet: &OneIndBody,
    levels: LevelsPtr,
) -> IndResult<Option<RecordInfo>> {
    if !is_record_shaped(packet) {
        debug!(ind = %tc.ctx().name_to_string(packet.typename), "not a record, no projections");
        return Ok(None)
    }
    let (decls, _) = tc.dest_prod_assum(packet.user_lc[0]);
    let fields = &decls[params.len()..];
    if fields.iter().any(|d| d.is_assum() && tc.ctx().is_anon(d.name())) {
        debug!(ind = %tc.ctx().name_to_string(packet.typename), "anonymous field, no projections");
        return Ok(None)
    }
    let mut seen = new_fx_hash_set();
    if fields.iter().filter(|d| d.is_assum()).any(|d| !seen.insert(d.name())) {
        debug!(ind = %tc.ctx().name_to_string(packet.typename), "repeated field name, no projections");
        return Ok(None)
    }

    let ind = IndRef { mind, idx: 0 };
    let env = tc.env();
    let ctx = tc.ctx();
    let ind_term = ctx.mk_ind(ind, levels);
    let param_rels = ctx.rel_list(params);
    let r_ty = ctx.mk_apps(ind_term, &param_rels);
    let r_name = ctx.str1("r");
    let mut ctx_pr = params.to_vec();
    ctx_pr.push(RelDecl::LocalAssum { name: r_name, ty: r_ty });
    // `x : I params` under `r`, the binder of each compatibility match.
    let x_args = ctx.rel_list_lifted(params, 1);
    let x_ty = ctx.mk_apps(ind_term, &x_args);
    let x_name = ctx.str1("x");
    let branch_ctx = fields
        .iter()
        .enumerate()
        .map(|(k, d)| ctx.lift_decl(*d, 1, k as u32))
        .collect::<Vec<RelDecl>>();

    // Innermost first: what each field seen so far becomes under `params, r`.
    let mut vals: Vec<ExprPtr> = Vec::with_capacity(fields.len());
    let mut projections = Vec::new();
    let mut proj_terms = Vec::new();
    for (k, decl) in fields.iter().enumerate() {
        let k32 = k as u32;
        match *decl {
            RelDecl::LocalAssum { name, ty } => {
                let field = projections.len() as u32;
                let ty = ctx.lift_from(ty, 1, k32);
                let ty = ctx.subst(ty, &vals);
                let r = ctx.mk_rel(0);
                let proj = ctx.mk_proj(ind, field, r);

                let ret_body = ctx.lift_from(ty, 1, 1);
                let ret = ctx.mk_lambda(x_name, x_ty, ret_body);
                let picked = ctx.mk_rel((fields.len() - 1 - k) as u32);
                let branch = ctx.it_mk_lambda_or_let(&branch_ctx, picked);
                let case = ctx.mk_case(ind, ret, r, &[branch]);

                let proj_name = ctx.append_name(base, name);
                if proj_name == packet.typename
                    || packet.consnames.contains(&proj_name)
                    || env.is_declared(proj_name)
                    || env.lookup_named(proj_name).is_some()
                {
                    return Err(IndError::AlreadyDeclared(proj_name))
                }
                projections.push(ProjectionBody {
                    name: proj_name,
                    field,
                    ty: ctx.it_mk_prod_or_let(&ctx_pr, ty),
                    body: ctx.it_mk_lambda_or_let(&ctx_pr, proj),
                    compat: ctx.it_mk_lambda_or_let(&ctx_pr, case),
                });
                proj_terms.push(proj);
                vals.insert(0, proj);
            }
            RelDecl::LocalDef { val, .. } => {
                let val = ctx.lift_from(val, 1, k32);
                let val = ctx.subst(val, &vals);
                vals.insert(0, val);
            }
        }
    }

    let ctor = ctx.mk_construct(ind, 0, levels);
    let mut eta_args = ctx.rel_list_lifted(params, 1);
    eta_args.extend(proj_terms);
    let eta_body = ctx.mk_apps(ctor, &eta_args);
    let eta_term = ctx.it_mk_lambda_or_let(&ctx_pr, eta_body);
    let eta_type = ctx.it_mk_prod_or_let(&ctx_pr, x_ty);
    debug!(ind = %ctx.name_to_string(packet.typename), nprojs = projections.len(), "record projections");
    Ok(Some(RecordInfo { base, projections, eta_term, eta_type }))
}
