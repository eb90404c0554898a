//! Choice between template and regular arities, and the squashing decision.
use crate::env::RelDecl;
use crate::expr::Expr::{self, *};
use crate::inductive::arity::TypedInductive;
use crate::inductive::unit_shape::UnitCondition;
use crate::inductive::{Anomaly, IndArity, IndError, IndResult, SquashInfo};
use crate::level::{Level, Sort};
use crate::tc::TypeChecker;
use crate::univ::is_impredicative;
use crate::util::{LevelPtr, TcCtx};
use tracing::debug;

pub fn squash_from_cond(cond: &UnitCondition) -> SquashInfo {
    match cond {
        UnitCondition::AlwaysUnit => SquashInfo::NoSquash,
        UnitCondition::NeverUnit => SquashInfo::PropSquash,
        UnitCondition::CondUnit(tys) => SquashInfo::ConditionalSquash(tys.clone()),
    }
}

/// Squash to the declared sort: `Prop` to `Prop`, anything else to `Set`.
pub fn squash_from_level(declared: Sort) -> SquashInfo {
    match declared {
        Sort::Prop => SquashInfo::PropSquash,
        Sort::Type(_) => SquashInfo::SetSquash,
    }
}

/// For each parameter assumption, outermost first, the universe variable its type
/// concludes with, if it is `∀ .., Type(u)`.
pub fn param_levels(ctx: &TcCtx, params: &[RelDecl]) -> Vec<Option<LevelPtr>> {
    params
        .iter()
        .filter(|d| d.is_assum())
        .map(|d| {
            let mut ty = d.ty();
            while let Prod { body, .. } = ctx.read_expr(ty) {
                ty = body;
            }
            match ctx.read_expr(ty) {
                Expr::Sort { sort: Sort::Type(l), .. } if matches!(ctx.read_level(l), Level::Param(..)) => Some(l),
                _ => None,
            }
        })
        .collect()
}

/// Decide the arity of one inductive of the block.
pub fn assign_arity(
    tc: &mut TypeChecker,
    template: bool,
    params: &[RelDecl],
    typed: &TypedInductive,
) -> IndResult<IndArity> {
    let flags = tc.flags();
    let declared = typed.sort;
    let mut infu = typed.ctor_sort;
    if flags.indices_matter {
        infu = tc.ctx().sort_sup(infu, typed.indices_sort);
    }

    if template && !tc.ctx().is_small_sort(declared) {
        let infu = if typed.unit != UnitCondition::AlwaysUnit {
            let set = tc.ctx().set_sort();
            tc.ctx().sort_sup(infu, set)
        } else {
            infu
        };
        if !tc.sort_leq(infu, declared)? {
            return Err(IndError::IncompatibleSort { ind: typed.typename })
        }
        let param_levels = param_levels(tc.ctx(), params);
        debug!(
            ind = %tc.ctx().name_to_string(typed.typename),
            contributing = param_levels.iter().filter(|l| l.is_some()).count(),
            "template arity"
        );
        return Ok(IndArity::Template { param_levels, sort: infu })
    }

    let natural = tc.sort_leq(infu, declared)?;
    let squash = match (natural, declared) {
        (true, Sort::Prop) => squash_from_cond(&typed.unit),
        (true, Sort::Type(_)) => SquashInfo::NoSquash,
        (false, _) => squash_from_level(declared),
    };
    if squash != SquashInfo::NoSquash && !is_impredicative(tc.ctx(), declared, &flags) {
        return Err(IndError::Anomaly(Anomaly::PredicativityViolated(typed.typename)))
    }
    debug!(ind = %tc.ctx().name_to_string(typed.typename), natural, squash = ?squash, "regular arity");
    let user_arity = typed.full_arity(tc.ctx(), params);
    Ok(IndArity::Regular { squash, user_arity, sort: declared })
}
