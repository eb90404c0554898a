//! Strict positivity of a block's constructors.
//!
//! The checker walks each constructor type under the block's arities and parameters,
//! keeping for every bound variable in scope whether it stands for an inductive of the
//! block (or for an inductive the block is nested in) together with its rec-tree. It
//! returns the number of uniformly passed recursive parameters and one rec-tree per
//! inductive.
use crate::env::{nhyps, RelDecl};
use crate::expr::{Expr::*, IndRef};
use crate::inductive::rtree::{RecArg, RecTree};
use crate::inductive::{CtorDefect, Finite, IndError, IndResult, MutualInductiveEntry, OneInductiveEntry};
use crate::tc::{TypeChecker, TypeError};
use crate::util::{ExprPtr, LevelsPtr, NamePtr};
use tracing::trace;

/// A failure deep in the walk; the constructor it belongs to is attached at the
/// constructor boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LocalErr {
    /// An occurrence of the block's `i`th inductive.
    NonPos(usize),
    NotEnoughArgs,
    NotConstructor,
    NonPar(usize),
    /// A recursive argument in a non-recursive block.
    BadEntry,
    Type(TypeError),
}

impl From<TypeError> for LocalErr {
    fn from(e: TypeError) -> Self { LocalErr::Type(e) }
}

type LocalResult<T> = Result<T, LocalErr>;

/// The recursion information of the variables in scope. `Rel(n)` through
/// `Rel(n + ntypes - 1)` are the block's inductives, last one first.
#[derive(Debug, Clone)]
struct RaEnv {
    n: u32,
    /// Innermost variable last.
    entries: Vec<(RecArg, RecTree)>,
}

impl RaEnv {
    fn lookup(&self, idx: u32) -> Option<&(RecArg, RecTree)> {
        let pos = self.entries.len().checked_sub(idx as usize + 1)?;
        self.entries.get(pos)
    }

    fn with_var(&self) -> RaEnv {
        let mut entries = self.entries.clone();
        entries.push((RecArg::Norec, RecTree::mk_norec()));
        RaEnv { n: self.n + 1, entries }
    }

    /// Bind a variable standing for the nested inductive `ind`, one `Rec` deeper.
    fn with_nested(&self, ind: IndRef) -> RaEnv {
        let mut entries = self.entries.iter().map(|(ra, t)| (*ra, t.lift(1))).collect::<Vec<_>>();
        entries.push((RecArg::Nested(ind), RecTree::Param(0, 0)));
        RaEnv { n: self.n + 1, entries }
    }
}

struct Positivity<'t, 'x> {
    tc: &'t mut TypeChecker<'x>,
    entry: &'t MutualInductiveEntry,
    params: &'t [RelDecl],
    ntypes: u32,
    /// The inductive whose constructors are being checked.
    current: u32,
    chkpos: bool,
    recursive: bool,
}

impl<'t, 'x> Positivity<'t, 'x> {
    fn occurs(&self, ienv: &RaEnv, e: ExprPtr) -> bool { !self.tc.ctx.noccur_between(e, ienv.n, self.ntypes) }

    fn non_pos(&self, ienv: &RaEnv, es: &[ExprPtr]) -> LocalErr {
        for k in 0..self.ntypes {
            if es.iter().any(|e| !self.tc.ctx.noccur_between(*e, ienv.n + k, 1)) {
                return LocalErr::NonPos((self.ntypes - 1 - k) as usize)
            }
        }
        LocalErr::NonPos(self.current as usize)
    }

    /// `Some` of `e`, or of its normal form, when the block does not occur in it.
    fn weaker_noccur(&mut self, ienv: &RaEnv, e: ExprPtr) -> Option<ExprPtr> {
        if !self.occurs(ienv, e) {
            return Some(e)
        }
        let e_nf = self.tc.nf(e);
        if self.occurs(ienv, e_nf) {
            None
        } else {
            Some(e_nf)
        }
    }

    fn push_var(&mut self, ienv: &RaEnv, name: NamePtr, ty: ExprPtr) -> RaEnv {
        self.tc.push_assum(name, ty);
        ienv.with_var()
    }

    /// Positivity of the constructor argument type `c`.
    fn check_pos(&mut self, ienv: &RaEnv, nmr: usize, c: ExprPtr) -> LocalResult<(usize, RecTree)> {
        let c = self.tc.whnf(c);
        let (head, largs) = self.tc.ctx.unfold_apps(c);
        match self.tc.ctx.read_expr(head) {
            Prod { binder_name, binder_type, body, .. } => {
                let dom = match self.weaker_noccur(ienv, binder_type) {
                    Some(dom) => dom,
                    None if self.chkpos => return Err(self.non_pos(ienv, &[binder_type])),
                    None => binder_type,
                };
                let inner = self.push_var(ienv, binder_name, dom);
                let out = self.check_pos(&inner, nmr, body);
                self.tc.pop_decl();
                out
            }
            Rel { idx, .. } => {
                let (ra, rarg) = match ienv.lookup(idx) {
                    Some(found) => found.clone(),
                    None => return Ok((nmr, RecTree::mk_norec())),
                };
                let largs = largs.iter().map(|a| self.tc.whnf(*a)).collect::<Vec<_>>();
                let nmr = match ra {
                    RecArg::Mrec(_) => match self.compute_rec_par(ienv, nmr, &largs) {
                        Ok(narrowed) => narrowed,
                        Err(_) if !self.chkpos => return Ok((nmr, RecTree::mk_norec())),
                        Err(e) => return Err(e),
                    },
                    RecArg::Norec | RecArg::Nested(_) => nmr,
                };
                if self.chkpos && largs.iter().any(|a| self.occurs(ienv, *a)) {
                    return Err(self.non_pos(ienv, &largs))
                }
                Ok((nmr, rarg))
            }
            Ind { ind, levels, .. } =>
                if largs.iter().all(|a| !self.occurs(ienv, *a)) {
                    Ok((nmr, RecTree::mk_norec()))
                } else {
                    self.check_positive_nested(ienv, nmr, ind, levels, &largs)
                },
            _ =>
                if !self.chkpos || (!self.occurs(ienv, head) && largs.iter().all(|a| !self.occurs(ienv, *a))) {
                    Ok((nmr, RecTree::mk_norec()))
                } else {
                    let mut all = vec![head];
                    all.extend(largs);
                    Err(self.non_pos(ienv, &all))
                },
        }
    }

    /// Narrow `nmr` to the number of leading arguments of a recursive occurrence that
    /// are exactly the block's parameters, in order.
    fn compute_rec_par(&self, ienv: &RaEnv, nmr: usize, largs: &[ExprPtr]) -> LocalResult<usize> {
        if nmr == 0 {
            return Ok(0)
        }
        let lpar = largs.get(..nmr).ok_or(LocalErr::NotEnoughArgs)?;
        let mut lpar = lpar.iter().copied();
        let mut k = 0usize;
        for (pos, decl) in self.params.iter().enumerate() {
            if !decl.is_assum() {
                continue
            }
            let p = match lpar.next() {
                Some(p) => p,
                None => return Ok(nmr),
            };
            let expected = ienv.n - 1 - pos as u32;
            match self.tc.ctx.read_expr(p) {
                Rel { idx, .. } if idx == expected => k += 1,
                _ => {
                    trace!(nmr = k, "recursive parameters narrowed");
                    return Ok(k)
                }
            }
        }
        Ok(nmr)
    }

    /// The conclusion of a constructor must be the current inductive applied to the
    /// parameters, then to indices free of the block.
    fn check_correct_par(&mut self, ienv: &RaEnv, largs: &[ExprPtr]) -> LocalResult<()> {
        let nparams = nhyps(self.params);
        if largs.len() < nparams {
            return Err(LocalErr::NotEnoughArgs)
        }
        let (params, realargs) = largs.split_at(nparams);
        let mut param_index = 0usize;
        for (pos, decl) in self.params.iter().enumerate() {
            if !decl.is_assum() {
                continue
            }
            let expected = ienv.n - 1 - pos as u32;
            let p = self.tc.whnf(params[param_index]);
            match self.tc.ctx.read_expr(p) {
                Rel { idx, .. } if idx == expected => param_index += 1,
                _ => return Err(LocalErr::NonPar(param_index)),
            }
        }
        if realargs.iter().any(|a| self.occurs(ienv, *a)) {
            return Err(self.non_pos(ienv, realargs))
        }
        Ok(())
    }

    /// Replace the nested inductive in one of its (closed) constructor types by the
    /// variable `Rel(0)`, dropping its first `npars` arguments.
    fn abstract_nested(&mut self, c: ExprPtr, ind: IndRef, npars: usize) -> ExprPtr {
        let ctx = &mut *self.tc.ctx;
        let anon = ctx.anonymous();
        let dummy = ctx.mk_prop();
        let mut repl = ctx.mk_rel(npars as u32);
        for _ in 0..npars {
            repl = ctx.mk_lambda(anon, dummy, repl);
        }
        let mut repls = vec![dummy; ind.idx as usize];
        repls.push(repl);
        ctx.replace_ind(c, ind.mind, &repls)
    }

    /// An occurrence of the block in the arguments of the existing inductive `ind`.
    /// Only its recursive parameters may mention the block, and its constructors must
    /// use them positively once instantiated.
    fn check_positive_nested(
        &mut self,
        ienv: &RaEnv,
        nmr: usize,
        ind: IndRef,
        levels: LevelsPtr,
        largs: &[ExprPtr],
    ) -> LocalResult<(usize, RecTree)> {
        let env = self.tc.env();
        let (mib, packet) = env.lookup_ind(ind).ok_or(TypeError::UnknownInductive(ind))?;
        let auxnrecpar = mib.nparams_rec;
        let auxnnonrecpar = mib.nparams - auxnrecpar;
        if largs.len() < auxnrecpar || mib.ntypes != 1 {
            return if self.chkpos { Err(self.non_pos(ienv, largs)) } else { Ok((nmr, RecTree::mk_norec())) }
        }
        let (recparams, nonrecargs) = largs.split_at(auxnrecpar);
        if self.chkpos && nonrecargs.iter().any(|a| self.occurs(ienv, *a)) {
            return Err(self.non_pos(ienv, nonrecargs))
        }
        trace!(nested = %self.tc.ctx.name_to_string(ind.mind), nrecparams = auxnrecpar, "nested occurrence");

        let ind_ty = self.tc.type_of_inductive(ind, levels)?;
        let applied_ty = self.tc.hnf_prod_apps(ind_ty, recparams)?;
        let (ks, vs) = self.tc.check_instance(mib, levels)?;
        let anon = self.tc.ctx.anonymous();
        self.tc.push_assum(anon, applied_ty);
        let nested_env = ienv.with_nested(ind);
        let recparams = recparams.iter().map(|p| self.tc.ctx.lift(*p, 1)).collect::<Vec<_>>();

        let mut nmr_out = nmr;
        let mut irecargs = Vec::with_capacity(packet.user_lc.len());
        let mut failure = None;
        for c in packet.user_lc.iter().copied() {
            match self.check_nested_constructor(&nested_env, nmr, c, ind, auxnrecpar, auxnnonrecpar, &recparams, &ks, &vs) {
                Ok((nmr_c, args)) => {
                    nmr_out = nmr_out.min(nmr_c);
                    irecargs.push(args);
                }
                Err(e) => {
                    failure = Some(e);
                    break
                }
            }
        }
        self.tc.pop_decl();
        if let Some(e) = failure {
            return Err(e)
        }
        Ok((nmr_out, RecTree::mk_rec_single(RecTree::mk_paths(RecArg::Nested(ind), irecargs))))
    }

    fn check_nested_constructor(
        &mut self,
        nested_env: &RaEnv,
        nmr: usize,
        c: ExprPtr,
        ind: IndRef,
        auxnrecpar: usize,
        auxnnonrecpar: usize,
        recparams: &[ExprPtr],
        ks: &[NamePtr],
        vs: &[crate::util::LevelPtr],
    ) -> LocalResult<(usize, Vec<RecTree>)> {
        let c = self.tc.ctx.subst_univs(c, ks, vs);
        let c = self.abstract_nested(c, ind, auxnrecpar);
        let c = self.tc.hnf_prod_apps(c, recparams)?;
        // The non-recursive parameters are ordinary variables.
        let mut inner = nested_env.clone();
        let mut cursor = c;
        let mut pushed = 0usize;
        let mut out = None;
        while pushed < auxnnonrecpar {
            let cursor_whnf = self.tc.whnf(cursor);
            match self.tc.ctx.read_expr(cursor_whnf) {
                Prod { binder_name, binder_type, body, .. } => {
                    inner = self.push_var(&inner, binder_name, binder_type);
                    pushed += 1;
                    cursor = body;
                }
                _ => {
                    out = Some(Err(LocalErr::Type(TypeError::NotAProduct(cursor_whnf))));
                    break
                }
            }
        }
        let out = match out {
            Some(err) => err,
            None => self.check_constructor(&inner, false, nmr, cursor).map_err(|(_, e)| e),
        };
        self.tc.pop_decls(pushed);
        out
    }

    /// Walk the products of a constructor type, checking each argument. With
    /// `check_head`, the conclusion must be the current inductive; otherwise it only
    /// has to be free of the block. Errors carry the position of the argument.
    fn check_constructor(
        &mut self,
        ienv: &RaEnv,
        check_head: bool,
        nmr: usize,
        c: ExprPtr,
    ) -> Result<(usize, Vec<RecTree>), (usize, LocalErr)> {
        let mut env = ienv.clone();
        let mut nmr = nmr;
        let mut lrec = Vec::new();
        let mut cursor = c;
        let mut pushed = 0usize;
        let out = loop {
            let arg = lrec.len();
            let cursor_whnf = self.tc.whnf(cursor);
            let (head, largs) = self.tc.ctx.unfold_apps(cursor_whnf);
            match self.tc.ctx.read_expr(head) {
                Prod { binder_name, binder_type, body, .. } => {
                    if !self.recursive && self.occurs(&env, binder_type) {
                        break Err((arg, LocalErr::BadEntry))
                    }
                    match self.check_pos(&env, nmr, binder_type) {
                        Ok((nmr_arg, recarg)) => {
                            nmr = nmr_arg;
                            lrec.push(recarg);
                        }
                        Err(e) => break Err((arg, e)),
                    }
                    env = self.push_var(&env, binder_name, binder_type);
                    pushed += 1;
                    cursor = body;
                }
                hd => {
                    let checked = if !self.chkpos {
                        Ok(())
                    } else if check_head {
                        let own = env.n + self.ntypes - 1 - self.current;
                        match hd {
                            Rel { idx, .. } if idx == own => self.check_correct_par(&env, &largs),
                            _ => Err(LocalErr::NotConstructor),
                        }
                    } else if largs.iter().any(|a| self.occurs(&env, *a)) {
                        Err(self.non_pos(&env, &largs))
                    } else {
                        Ok(())
                    };
                    break match checked {
                        Ok(()) => Ok((nmr, lrec)),
                        Err(e) => Err((arg, e)),
                    }
                }
            }
        };
        self.tc.pop_decls(pushed);
        out
    }

    fn explain(&self, ind: &OneInductiveEntry, cstr: NamePtr, arg: usize, err: LocalErr) -> IndError {
        let defect = match err {
            LocalErr::NonPos(i) => CtorDefect::NonPos(self.entry.inds.get(i).map_or(ind.typename, |d| d.typename)),
            LocalErr::NotEnoughArgs => CtorDefect::NotEnoughArgs,
            LocalErr::NotConstructor => CtorDefect::NotConstructor,
            LocalErr::NonPar(param) => CtorDefect::NonPar { param },
            LocalErr::BadEntry => return IndError::NonRecursiveOccurrence { ind: ind.typename, cstr },
            LocalErr::Type(e) => return IndError::Type(e),
        };
        IndError::IllFormedConstructor { ind: ind.typename, cstr, arg, defect }
    }

    fn check_one(&mut self, mind: NamePtr, i: usize, ind: &OneInductiveEntry, nmr0: usize) -> IndResult<(usize, RecTree)> {
        self.current = i as u32;
        let mut entries = RecTree::mk_rec_calls(self.ntypes)
            .into_iter()
            .enumerate()
            .map(|(j, t)| (RecArg::Mrec(IndRef { mind, idx: j as u32 }), t))
            .collect::<Vec<_>>();
        entries.extend(self.params.iter().map(|_| (RecArg::Norec, RecTree::mk_norec())));
        let ienv = RaEnv { n: self.params.len() as u32, entries };

        let mut nmr = nmr0;
        let mut ctors = Vec::with_capacity(ind.lc.len());
        for (cstr, lc) in ind.consnames.iter().copied().zip(ind.lc.iter().copied()) {
            match self.check_constructor(&ienv, true, nmr0, lc) {
                Ok((nmr_c, args)) => {
                    nmr = nmr.min(nmr_c);
                    ctors.push(args);
                }
                Err((arg, e)) => return Err(self.explain(ind, cstr, arg, e)),
            }
        }
        Ok((nmr, RecTree::mk_paths(RecArg::Mrec(IndRef { mind, idx: i as u32 }), ctors)))
    }
}

/// Check every constructor of `entry`, whose arities and parameters are the top of the
/// local context of `tc`. Returns the number of recursive parameters and the tied
/// rec-trees of the block.
pub fn check_positivity(
    tc: &mut TypeChecker,
    mind: NamePtr,
    entry: &MutualInductiveEntry,
    params: &[RelDecl],
) -> IndResult<(usize, Vec<RecTree>)> {
    let ntypes = entry.inds.len() as u32;
    let mut checker = Positivity {
        tc,
        entry,
        params,
        ntypes,
        current: 0,
        chkpos: entry.check_positivity,
        recursive: entry.finite != Finite::BiFinite,
    };
    let nmr0 = nhyps(params);
    let mut nmr = nmr0;
    let mut trees = Vec::with_capacity(entry.inds.len());
    for (i, ind) in entry.inds.iter().enumerate() {
        let (nmr_i, tree) = checker.check_one(mind, i, ind, nmr0)?;
        nmr = nmr.min(nmr_i);
        trees.push(tree);
    }
    Ok((nmr, RecTree::mk_rec(trees)))
}
