//! Assembly of the certified block: one packet per inductive, constructor tags,
//! elimination restrictions and the final universe names.
use crate::env::{nhyps, RelDecl};
use crate::expr::IndRef;
use crate::inductive::arity::{lift_params, TypedInductive};
use crate::inductive::rtree::RecTree;
use crate::inductive::{
    record, ConstructorTag, IndArity, IndResult, MutIndBody, MutualInductiveEntry, OneIndBody, SquashInfo,
    UniverseEntry,
};
use crate::level::SortFamily;
use crate::tc::TypeChecker;
use crate::util::{ExprPtr, LevelPtr, LevelsPtr, NamePtr, TcCtx};
use tracing::debug;

/// The universe instance under which the block refers to itself.
pub(crate) fn self_instance(ctx: &mut TcCtx, universes: &UniverseEntry) -> LevelsPtr {
    let ls = universes.poly_params().iter().map(|u| ctx.param(*u)).collect::<Vec<_>>();
    ctx.alloc_levels_slice(&ls)
}

/// Constant constructors are tagged from 0, the others from 1.
pub fn ctor_tags(consnrealargs: &[usize]) -> (Vec<ConstructorTag>, usize, usize) {
    let (mut nb_constant, mut nb_args) = (0usize, 0usize);
    let tags = consnrealargs
        .iter()
        .map(|n| {
            if *n == 0 {
                nb_constant += 1;
                ConstructorTag::Constant(nb_constant as u32 - 1)
            } else {
                nb_args += 1;
                ConstructorTag::Block { tag: nb_args as u32, arity: *n }
            }
        })
        .collect();
    (tags, nb_constant, nb_args)
}

/// The largest sort family eliminations may target.
fn elim_family(tc: &mut TypeChecker, arity: &IndArity) -> IndResult<SortFamily> {
    let squash = match arity {
        IndArity::Template { .. } => return Ok(SortFamily::InType),
        IndArity::Regular { squash, .. } => squash,
    };
    Ok(match squash {
        SquashInfo::NoSquash => SortFamily::InType,
        SquashInfo::PropSquash => SortFamily::InProp,
        SquashInfo::SetSquash => SortFamily::InSet,
        SquashInfo::ConditionalSquash(tys) => {
            let mut all_prop = true;
            for ty in tys.iter().copied() {
                all_prop &= tc.infer_sort(ty)?.is_prop();
            }
            if all_prop {
                SortFamily::InType
            } else {
                SortFamily::InProp
            }
        }
    })
}

fn subst_decls(ctx: &mut TcCtx, decls: &[RelDecl], ks: &[NamePtr], vs: &[LevelPtr]) -> Vec<RelDecl> {
    ctx.subst_univs_rel_ctx(decls, ks, vs)
}

fn subst_arity(ctx: &mut TcCtx, arity: IndArity, ks: &[NamePtr], vs: &[LevelPtr]) -> IndArity {
    match arity {
        IndArity::Regular { squash, user_arity, sort } => {
            let squash = match squash {
                SquashInfo::ConditionalSquash(tys) =>
                    SquashInfo::ConditionalSquash(tys.into_iter().map(|t| ctx.subst_univs(t, ks, vs)).collect()),
                other => other,
            };
            IndArity::Regular { squash, user_arity: ctx.subst_univs(user_arity, ks, vs), sort: ctx.subst_sort(sort, ks, vs) }
        }
        IndArity::Template { param_levels, sort } => IndArity::Template {
            param_levels: param_levels.into_iter().map(|l| l.map(|l| ctx.subst_level(l, ks, vs))).collect(),
            sort: ctx.subst_sort(sort, ks, vs),
        },
    }
}

/// Rewrite every universe variable of a packet to its canonical representative.
fn subst_packet(ctx: &mut TcCtx, packet: OneIndBody, ks: &[NamePtr], vs: &[LevelPtr]) -> OneIndBody {
    if ks.is_empty() {
        return packet
    }
    OneIndBody {
        arity_ctx: subst_decls(ctx, &packet.arity_ctx, ks, vs),
        arity: subst_arity(ctx, packet.arity, ks, vs),
        user_lc: packet.user_lc.iter().map(|c| ctx.subst_univs(*c, ks, vs)).collect(),
        nf_lc: packet.nf_lc.iter().map(|c| ctx.subst_univs(*c, ks, vs)).collect(),
        ..packet
    }
}

fn collect_hyps(ctx: &TcCtx, params: &[RelDecl], packets: &[OneIndBody]) -> Vec<NamePtr> {
    let mut hyps = Vec::new();
    for decl in params.iter() {
        ctx.collect_vars(decl.ty(), &mut hyps);
        if let Some(val) = decl.val() {
            ctx.collect_vars(val, &mut hyps);
        }
    }
    for packet in packets.iter() {
        for decl in packet.arity_ctx.iter() {
            ctx.collect_vars(decl.ty(), &mut hyps);
        }
        for c in packet.user_lc.iter() {
            ctx.collect_vars(*c, &mut hyps);
        }
    }
    hyps
}

pub fn build_body(
    tc: &mut TypeChecker,
    mind: NamePtr,
    entry: &MutualInductiveEntry,
    params: &[RelDecl],
    typed: &[TypedInductive],
    arities: Vec<IndArity>,
    nmr: usize,
    trees: Vec<RecTree>,
) -> IndResult<MutIndBody> {
    let ntypes = entry.inds.len();
    let nparams = nhyps(params);
    let levels = self_instance(tc.ctx(), &entry.universes);
    // `Rel(0)` under the arities is the last inductive.
    let ind_terms = (0..ntypes)
        .rev()
        .map(|i| tc.ctx().mk_ind(IndRef { mind, idx: i as u32 }, levels))
        .collect::<Vec<ExprPtr>>();
    let lifted = lift_params(tc, params, ntypes as u32);

    let (ks, vs) = match &entry.universes {
        UniverseEntry::Monomorphic { levels, .. } => {
            let env = tc.env();
            env.ugraph().canonical_subst(tc.ctx(), levels)?
        }
        UniverseEntry::Polymorphic { .. } => (Vec::new(), Vec::new()),
    };

    let mut packets = Vec::with_capacity(ntypes);
    let parts = entry.inds.iter().zip(typed.iter()).zip(arities.into_iter().zip(trees.into_iter()));
    for (i, ((ind, t), (arity, recargs))) in parts.enumerate() {
        let mut user_lc = Vec::with_capacity(ind.lc.len());
        let mut nf_lc = Vec::with_capacity(ind.lc.len());
        let mut consnrealargs = Vec::with_capacity(ind.lc.len());
        let mut consnrealdecls = Vec::with_capacity(ind.lc.len());
        for lc in ind.lc.iter().copied() {
            let closed = tc.ctx().it_mk_prod_or_let(&lifted, lc);
            let closed = tc.ctx().subst(closed, &ind_terms);
            let (decls, concl) = tc.dest_prod_assum(closed);
            consnrealdecls.push(decls.len().saturating_sub(params.len()));
            consnrealargs.push(nhyps(&decls).saturating_sub(nparams));
            nf_lc.push(tc.ctx().it_mk_prod_or_let(&decls, concl));
            user_lc.push(closed);
        }
        let kelim = elim_family(tc, &arity)?;
        let (ctor_tags, nb_constant, nb_args) = ctor_tags(&consnrealargs);
        let mut arity_ctx = params.to_vec();
        arity_ctx.extend(t.signature.iter().copied());
        debug!(
            ind = %tc.ctx().name_to_string(ind.typename),
            kelim = ?kelim,
            nb_constant,
            nb_args,
            "built packet {}", i
        );
        let packet = OneIndBody {
            typename: ind.typename,
            arity_ctx,
            arity,
            nrealargs: nhyps(&t.signature),
            nrealdecls: t.signature.len(),
            kelim,
            consnames: ind.consnames.clone(),
            user_lc,
            nf_lc,
            consnrealargs,
            consnrealdecls,
            recargs,
            nb_constant,
            nb_args,
            ctor_tags,
        };
        packets.push(subst_packet(tc.ctx(), packet, &ks, &vs));
    }

    let params = subst_decls(tc.ctx(), params, &ks, &vs);
    let record = match (entry.record, packets.as_slice()) {
        (Some(base), [packet]) => record::build_record(tc, mind, base, &params, packet, levels)?,
        _ => None,
    };
    let hyps = collect_hyps(tc.ctx(), &params, &packets);
    Ok(MutIndBody {
        name: mind,
        ntypes,
        finite: entry.finite,
        params,
        nparams,
        nparams_rec: nmr,
        packets,
        hyps,
        polymorphic: entry.universes.is_polymorphic(),
        universes: entry.universes.clone(),
        private: entry.private,
        record,
    })
}
