use crate::expr::{Expr::*, IndRef};
use crate::tc::{TcResult, TypeChecker};
use crate::util::{ExprPtr, LevelsPtr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConvPb {
    Conv,
    Cumul,
}

use ConvPb::*;

impl<'x> TypeChecker<'x> {
    /// Definitional equality.
    pub fn is_conv(&mut self, a: ExprPtr, b: ExprPtr) -> TcResult<bool> { self.conv(a, b, Conv) }

    /// Definitional equality up to cumulativity of sorts: `a` is a subtype of `b`.
    pub fn is_conv_leq(&mut self, a: ExprPtr, b: ExprPtr) -> TcResult<bool> { self.conv(a, b, Cumul) }

    fn conv(&mut self, a: ExprPtr, b: ExprPtr, pb: ConvPb) -> TcResult<bool> {
        if a == b {
            return Ok(true)
        }
        let cacheable = pb == Conv && self.ctx.closed(a) && self.ctx.closed(b);
        if cacheable {
            if self.tc_cache.eq_cache.same_class(a, b) {
                return Ok(true)
            }
            if self.tc_cache.failure_cache.contains(&(a, b)) {
                return Ok(false)
            }
        }
        let r = self.conv_core(a, b, pb)?;
        if cacheable {
            if r {
                self.tc_cache.eq_cache.union(a, b);
            } else {
                self.tc_cache.failure_cache.insert((a, b));
            }
        }
        Ok(r)
    }

    fn conv_core(&mut self, a: ExprPtr, b: ExprPtr, pb: ConvPb) -> TcResult<bool> {
        let a = self.whnf(a);
        let b = self.whnf(b);
        if a == b {
            return Ok(true)
        }
        match self.ctx.read_expr_pair(a, b) {
            (Sort { sort: s1, .. }, Sort { sort: s2, .. }) => match pb {
                Conv => self.sort_eq(s1, s2),
                Cumul => self.sort_leq(s1, s2),
            },
            (
                Prod { binder_name, binder_type: t1, body: b1, .. },
                Prod { binder_type: t2, body: b2, .. },
            ) => {
                if !self.conv(t1, t2, Conv)? {
                    return Ok(false)
                }
                self.push_assum(binder_name, t1);
                let r = self.conv(b1, b2, pb);
                self.pop_decl();
                r
            }
            (
                Lambda { binder_name, binder_type: t1, body: b1, .. },
                Lambda { binder_type: t2, body: b2, .. },
            ) => {
                if !self.conv(t1, t2, Conv)? {
                    return Ok(false)
                }
                self.push_assum(binder_name, t1);
                let r = self.conv(b1, b2, Conv);
                self.pop_decl();
                r
            }
            (Lambda { binder_name, binder_type, body, .. }, _) => self.conv_eta_lambda(binder_name, binder_type, body, b),
            (_, Lambda { binder_name, binder_type, body, .. }) => self.conv_eta_lambda(binder_name, binder_type, body, a),
            _ => {
                if self.conv_spine(a, b)? {
                    return Ok(true)
                }
                Ok(self.conv_eta_struct(a, b)? || self.conv_eta_struct(b, a)?)
            }
        }
    }

    /// `λx:T. body` against `other`, compared as `body` against `other x`.
    fn conv_eta_lambda(
        &mut self,
        binder_name: crate::util::NamePtr,
        binder_type: ExprPtr,
        body: ExprPtr,
        other: ExprPtr,
    ) -> TcResult<bool> {
        self.push_assum(binder_name, binder_type);
        let lifted = self.ctx.lift(other, 1);
        let x = self.ctx.mk_rel(0);
        let applied = self.ctx.mk_app(lifted, x);
        let r = self.conv(body, applied, Conv);
        self.pop_decl();
        r
    }

    fn conv_spine(&mut self, a: ExprPtr, b: ExprPtr) -> TcResult<bool> {
        let (h1, args1) = self.ctx.unfold_apps(a);
        let (h2, args2) = self.ctx.unfold_apps(b);
        if args1.len() != args2.len() || !self.conv_head(h1, h2)? {
            return Ok(false)
        }
        for (x, y) in args1.into_iter().zip(args2) {
            if !self.conv(x, y, Conv)? {
                return Ok(false)
            }
        }
        Ok(true)
    }

    fn conv_head(&mut self, h1: ExprPtr, h2: ExprPtr) -> TcResult<bool> {
        if h1 == h2 {
            return Ok(true)
        }
        match self.ctx.read_expr_pair(h1, h2) {
            (Const { name: n1, levels: l1, .. }, Const { name: n2, levels: l2, .. }) =>
                Ok(n1 == n2 && self.conv_levels(l1, l2)?),
            (Ind { ind: i1, levels: l1, .. }, Ind { ind: i2, levels: l2, .. }) =>
                Ok(i1 == i2 && self.conv_levels(l1, l2)?),
            (Construct { ind: i1, idx: c1, levels: l1, .. }, Construct { ind: i2, idx: c2, levels: l2, .. }) =>
                Ok(i1 == i2 && c1 == c2 && self.conv_levels(l1, l2)?),
            (
                Case { ind: i1, ret: r1, discr: d1, branches: bs1, .. },
                Case { ind: i2, ret: r2, discr: d2, branches: bs2, .. },
            ) => {
                if i1 != i2 || !self.conv(r1, r2, Conv)? || !self.conv(d1, d2, Conv)? {
                    return Ok(false)
                }
                let (bs1, bs2) = (self.ctx.read_exprs(bs1), self.ctx.read_exprs(bs2));
                if bs1.len() != bs2.len() {
                    return Ok(false)
                }
                for (x, y) in bs1.iter().zip(bs2.iter()) {
                    if !self.conv(*x, *y, Conv)? {
                        return Ok(false)
                    }
                }
                Ok(true)
            }
            (Proj { ind: i1, field: f1, structure: s1, .. }, Proj { ind: i2, field: f2, structure: s2, .. }) =>
                Ok(i1 == i2 && f1 == f2 && self.conv(s1, s2, Conv)?),
            _ => Ok(false),
        }
    }

    fn conv_levels(&mut self, l1: LevelsPtr, l2: LevelsPtr) -> TcResult<bool> {
        if l1 == l2 {
            return Ok(true)
        }
        let (l1, l2) = (self.ctx.read_levels(l1), self.ctx.read_levels(l2));
        if l1.len() != l2.len() {
            return Ok(false)
        }
        for (x, y) in l1.iter().zip(l2.iter()) {
            if !self.level_eq(*x, *y)? {
                return Ok(false)
            }
        }
        Ok(true)
    }

    /// Eta for records: a fully applied constructor `C params fields` is equal to `other`
    /// when each field is equal to the matching projection of `other`.
    fn conv_eta_struct(&mut self, ctor_app: ExprPtr, other: ExprPtr) -> TcResult<bool> {
        let (head, args) = self.ctx.unfold_apps(ctor_app);
        let ind = match self.ctx.read_expr(head) {
            Construct { ind, idx: 0, .. } => ind,
            _ => return Ok(false),
        };
        let (nparams, nfields) = match self.record_shape(ind) {
            Some(shape) => shape,
            None => return Ok(false),
        };
        if args.len() != nparams + nfields {
            return Ok(false)
        }
        for (field, arg) in args[nparams..].iter().copied().enumerate() {
            let proj = self.ctx.mk_proj(ind, field as u32, other);
            if !self.conv(arg, proj, Conv)? {
                return Ok(false)
            }
        }
        Ok(true)
    }

    /// Parameter and field counts of `ind`, when it has primitive projections.
    pub(crate) fn record_shape(&self, ind: IndRef) -> Option<(usize, usize)> {
        let (mib, _) = self.env.lookup_ind(ind)?;
        let record = mib.record.as_ref()?;
        Some((mib.nparams, record.projections.len()))
    }
}
