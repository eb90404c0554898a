//! Whether a constructor's arguments have the shape that lets a `Prop` inductive be
//! eliminated into any sort.
//!
//! The accepted shape: every argument is a variable, or a constructor applied to
//! arguments of the same shape. Variables used once contribute their type to the
//! condition; a variable used twice contributes nothing.
use crate::expr::Expr::*;
use crate::tc::{TcResult, TypeChecker, TypeError};
use crate::util::{ExprPtr, NamePtr, TcCtx};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitCondition {
    AlwaysUnit,
    NeverUnit,
    /// Unit-like when each of these (closed) types is a proposition.
    CondUnit(Vec<ExprPtr>),
}

use UnitCondition::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Occurrence {
    Rel(u32),
    Named(NamePtr),
}

fn note(seen: &mut Vec<(Occurrence, bool)>, occ: Occurrence) {
    match seen.iter_mut().find(|(o, _)| *o == occ) {
        Some((_, repeated)) => *repeated = true,
        None => seen.push((occ, false)),
    }
}

fn collect(ctx: &TcCtx, e: ExprPtr, seen: &mut Vec<(Occurrence, bool)>) -> bool {
    match ctx.read_expr(e) {
        Rel { idx, .. } => {
            note(seen, Occurrence::Rel(idx));
            true
        }
        Var { name, .. } => {
            note(seen, Occurrence::Named(name));
            true
        }
        App { .. } | Construct { .. } => {
            let (head, args) = ctx.unfold_apps(e);
            matches!(ctx.read_expr(head), Construct { .. }) && args.iter().all(|a| collect(ctx, *a, seen))
        }
        _ => false,
    }
}

/// Classify `args`, a constructor's arguments in the current local context of `tc`.
/// The types in a `CondUnit` are closed over that context.
pub fn is_unit(tc: &mut TypeChecker, args: &[ExprPtr]) -> TcResult<UnitCondition> {
    let mut seen = Vec::new();
    for arg in args.iter().copied() {
        if !collect(tc.ctx(), arg, &mut seen) {
            return Ok(NeverUnit)
        }
    }
    let lctx = tc.rel_ctx().to_vec();
    let mut tys = Vec::new();
    for (occ, repeated) in seen {
        if repeated {
            continue
        }
        let ty = match occ {
            Occurrence::Rel(idx) => {
                let ty = tc.lookup_rel(idx)?.ty();
                tc.ctx().it_mk_prod_or_let(&lctx, ty)
            }
            Occurrence::Named(n) => tc.env().lookup_named(n).ok_or(TypeError::UnboundVar(n))?,
        };
        tys.push(ty);
    }
    Ok(if tys.is_empty() { AlwaysUnit } else { CondUnit(tys) })
}

/// The condition of an inductive from those of its constructors. Several constructors
/// are never unit-like, whatever their shape.
pub fn combine_conditions(conds: Vec<UnitCondition>) -> UnitCondition {
    let mut conds = conds.into_iter();
    match (conds.next(), conds.next()) {
        (None, _) => AlwaysUnit,
        (Some(cond), None) => cond,
        (Some(_), Some(_)) => NeverUnit,
    }
}
