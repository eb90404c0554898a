use crate::env::RelDecl;
use crate::expr::Expr::{self, *};
use crate::inductive::rtree::{RecArg, RecTree};
use crate::level::{Level, Sort};
use crate::name::Name;
use crate::util::{ExprPtr, LevelPtr, LevelsPtr, NamePtr, TcCtx};
use std::fmt;

/// Pairs an item with the context that owns it, so the item's `Debug` output shows
/// its contents rather than a pointer.
pub struct DebugPrinter<'x, A> {
    pub(crate) ctx: &'x TcCtx,
    pub(crate) elem_to_print: A,
}

impl TcCtx {
    pub fn debug_print<A>(&self, elem_to_print: A) -> DebugPrinter<'_, A> { DebugPrinter { ctx: self, elem_to_print } }
}

impl<'x> fmt::Debug for DebugPrinter<'x, NamePtr> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Name::*;
        match self.ctx.read_name(self.elem_to_print) {
            Anon => write!(f, "_"),
            Str(pfx, sfx, _) => {
                let sfx = self.ctx.read_string(sfx);
                match self.ctx.read_name(pfx) {
                    Anon => write!(f, "{}", sfx),
                    _ => write!(f, "{:?}.{}", self.ctx.debug_print(pfx), sfx),
                }
            }
            Num(pfx, sfx, _) => match self.ctx.read_name(pfx) {
                Anon => write!(f, "{}", sfx),
                _ => write!(f, "{:?}.{}", self.ctx.debug_print(pfx), sfx),
            },
        }
    }
}

impl<'x, A, B> fmt::Debug for DebugPrinter<'x, (A, B)>
where
    A: Copy,
    B: Copy,
    DebugPrinter<'x, A>: fmt::Debug,
    DebugPrinter<'x, B>: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?}, {:?})", self.ctx.debug_print(self.elem_to_print.0), self.ctx.debug_print(self.elem_to_print.1))
    }
}

impl<'x, A> fmt::Debug for DebugPrinter<'x, &[A]>
where
    A: Copy,
    DebugPrinter<'x, A>: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.elem_to_print.iter().copied().map(|x| self.ctx.debug_print(x))).finish()
    }
}

impl<'x, A> fmt::Debug for DebugPrinter<'x, Option<A>>
where
    A: Copy,
    DebugPrinter<'x, A>: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.elem_to_print {
            None => write!(f, "None"),
            Some(x) => write!(f, "Some({:?})", self.ctx.debug_print(x)),
        }
    }
}

impl<'x> fmt::Debug for DebugPrinter<'x, LevelPtr> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Level::*;
        match self.ctx.read_level(self.elem_to_print) {
            Zero => write!(f, "0"),
            Succ(..) => {
                let (mut base, mut n) = (self.elem_to_print, 0u32);
                while let Succ(inner, _) = self.ctx.read_level(base) {
                    base = inner;
                    n += 1;
                }
                if self.ctx.read_level(base) == Zero {
                    write!(f, "{}", n)
                } else {
                    write!(f, "{:?}+{}", self.ctx.debug_print(base), n)
                }
            }
            Max(l, r, _) => write!(f, "max{:?}", self.ctx.debug_print((l, r))),
            Param(name, _) => write!(f, "{:?}", self.ctx.debug_print(name)),
        }
    }
}

impl<'x> fmt::Debug for DebugPrinter<'x, LevelsPtr> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let levels = self.ctx.read_levels(self.elem_to_print);
        write!(f, "{:?}", self.ctx.debug_print(levels.as_ref()))
    }
}

impl<'x> fmt::Debug for DebugPrinter<'x, Sort> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.elem_to_print {
            Sort::Prop => write!(f, "Prop"),
            Sort::Type(l) if self.ctx.is_zero(l) => write!(f, "Set"),
            Sort::Type(l) => write!(f, "Type({:?})", self.ctx.debug_print(l)),
        }
    }
}

impl<'x> fmt::Debug for DebugPrinter<'x, ExprPtr> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ctx = self.ctx;
        match ctx.read_expr(self.elem_to_print) {
            Rel { idx, .. } => write!(f, "#{}", idx),
            Var { name, .. } => write!(f, "{:?}", ctx.debug_print(name)),
            Expr::Sort { sort, .. } => write!(f, "{:?}", ctx.debug_print(sort)),
            Prod { binder_name, binder_type, body, .. } => write!(
                f,
                "forall ({:?} : {:?}), {:?}",
                ctx.debug_print(binder_name),
                ctx.debug_print(binder_type),
                ctx.debug_print(body)
            ),
            Lambda { binder_name, binder_type, body, .. } => write!(
                f,
                "fun ({:?} : {:?}) => {:?}",
                ctx.debug_print(binder_name),
                ctx.debug_print(binder_type),
                ctx.debug_print(body)
            ),
            Let { binder_name, binder_type, val, body, .. } => write!(
                f,
                "let {:?} : {:?} := {:?} in {:?}",
                ctx.debug_print(binder_name),
                ctx.debug_print(binder_type),
                ctx.debug_print(val),
                ctx.debug_print(body)
            ),
            App { fun, arg, .. } => write!(f, "({:?} {:?})", ctx.debug_print(fun), ctx.debug_print(arg)),
            Const { name, levels, .. } => write!(f, "{:?}@{:?}", ctx.debug_print(name), ctx.debug_print(levels)),
            Ind { ind, levels, .. } =>
                write!(f, "{:?}#{}@{:?}", ctx.debug_print(ind.mind), ind.idx, ctx.debug_print(levels)),
            Construct { ind, idx, levels, .. } => write!(
                f,
                "{:?}#{}.{}@{:?}",
                ctx.debug_print(ind.mind),
                ind.idx,
                idx,
                ctx.debug_print(levels)
            ),
            Case { ind, ret, discr, branches, .. } => {
                let branches = ctx.read_exprs(branches);
                write!(
                    f,
                    "match<{:?}#{}> {:?} return {:?} with {:?}",
                    ctx.debug_print(ind.mind),
                    ind.idx,
                    ctx.debug_print(discr),
                    ctx.debug_print(ret),
                    ctx.debug_print(branches.as_ref())
                )
            }
            Proj { field, structure, .. } => write!(f, "{:?}.({})", ctx.debug_print(structure), field),
        }
    }
}

impl<'x> fmt::Debug for DebugPrinter<'x, RelDecl> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.elem_to_print {
            RelDecl::LocalAssum { name, ty } =>
                write!(f, "({:?} : {:?})", self.ctx.debug_print(name), self.ctx.debug_print(ty)),
            RelDecl::LocalDef { name, val, ty } => write!(
                f,
                "({:?} : {:?} := {:?})",
                self.ctx.debug_print(name),
                self.ctx.debug_print(ty),
                self.ctx.debug_print(val)
            ),
        }
    }
}

impl<'x> fmt::Debug for DebugPrinter<'x, &RecTree> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.elem_to_print {
            RecTree::Param(i, j) => write!(f, "Param({}, {})", i, j),
            RecTree::Rec(j, defs) => {
                write!(f, "Rec({}, ", j)?;
                f.debug_list().entries(defs.iter().map(|d| self.ctx.debug_print(d))).finish()?;
                write!(f, ")")
            }
            RecTree::Node(label, children) => {
                match label {
                    RecArg::Norec => write!(f, "Norec")?,
                    RecArg::Mrec(ind) => write!(f, "Mrec({:?}#{})", self.ctx.debug_print(ind.mind), ind.idx)?,
                    RecArg::Nested(ind) => write!(f, "Nested({:?}#{})", self.ctx.debug_print(ind.mind), ind.idx)?,
                }
                if children.is_empty() {
                    Ok(())
                } else {
                    f.debug_list().entries(children.iter().map(|c| self.ctx.debug_print(c))).finish()
                }
            }
        }
    }
}
