use crate::expr::IndRef;
use crate::inductive::{IndError, IndResult, MutIndBody, OneIndBody, UniverseEntry};
use crate::tc::{TcResult, TypeChecker, TypeError};
use crate::univ::UGraph;
use crate::util::{new_fx_hash_set, new_fx_index_map, ExprPtr, FxIndexMap, NamePtr, TcCtx};
use std::sync::Arc;
use tracing::debug;

/// A declaration in a local (de Bruijn) context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelDecl {
    LocalAssum { name: NamePtr, ty: ExprPtr },
    LocalDef { name: NamePtr, val: ExprPtr, ty: ExprPtr },
}

impl RelDecl {
    pub fn name(&self) -> NamePtr {
        match self {
            RelDecl::LocalAssum { name, .. } | RelDecl::LocalDef { name, .. } => *name,
        }
    }

    pub fn ty(&self) -> ExprPtr {
        match self {
            RelDecl::LocalAssum { ty, .. } | RelDecl::LocalDef { ty, .. } => *ty,
        }
    }

    pub fn val(&self) -> Option<ExprPtr> {
        match self {
            RelDecl::LocalAssum { .. } => None,
            RelDecl::LocalDef { val, .. } => Some(*val),
        }
    }

    pub fn is_assum(&self) -> bool { matches!(self, RelDecl::LocalAssum { .. }) }
}

/// The number of assumptions (non-let declarations) in a context.
pub fn nhyps(rel_ctx: &[RelDecl]) -> usize { rel_ctx.iter().filter(|d| d.is_assum()).count() }

impl TcCtx {
    pub fn lift_decl(&mut self, decl: RelDecl, n: u32, k: u32) -> RelDecl {
        match decl {
            RelDecl::LocalAssum { name, ty } => RelDecl::LocalAssum { name, ty: self.lift_from(ty, n, k) },
            RelDecl::LocalDef { name, val, ty } =>
                RelDecl::LocalDef { name, val: self.lift_from(val, n, k), ty: self.lift_from(ty, n, k) },
        }
    }

    /// Substitute `vals` for the variables bound outside of `rel_ctx`.
    pub fn subst_rel_ctx(&mut self, rel_ctx: &[RelDecl], vals: &[ExprPtr]) -> Vec<RelDecl> {
        let mut out = Vec::with_capacity(rel_ctx.len());
        for (pos, decl) in rel_ctx.iter().enumerate() {
            let k = pos as u32;
            let decl = match *decl {
                RelDecl::LocalAssum { name, ty } => RelDecl::LocalAssum { name, ty: self.subst_from(ty, vals, k) },
                RelDecl::LocalDef { name, val, ty } =>
                    RelDecl::LocalDef { name, val: self.subst_from(val, vals, k), ty: self.subst_from(ty, vals, k) },
            };
            out.push(decl);
        }
        out
    }

    pub fn subst_univs_rel_ctx(&mut self, rel_ctx: &[RelDecl], ks: &[NamePtr], vs: &[crate::util::LevelPtr]) -> Vec<RelDecl> {
        rel_ctx
            .iter()
            .map(|decl| match *decl {
                RelDecl::LocalAssum { name, ty } => RelDecl::LocalAssum { name, ty: self.subst_univs(ty, ks, vs) },
                RelDecl::LocalDef { name, val, ty } => RelDecl::LocalDef {
                    name,
                    val: self.subst_univs(val, ks, vs),
                    ty: self.subst_univs(ty, ks, vs),
                },
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingFlags {
    /// When `false`, every universe comparison succeeds. Unsound.
    pub check_universes: bool,
    pub indices_matter: bool,
    pub impredicative_set: bool,
}

impl Default for TypingFlags {
    fn default() -> Self { Self { check_universes: true, indices_matter: false, impredicative_set: false } }
}

#[derive(Debug, Clone)]
pub enum Declar {
    Axiom { name: NamePtr, uparams: Arc<[NamePtr]>, ty: ExprPtr },
    Definition { name: NamePtr, uparams: Arc<[NamePtr]>, ty: ExprPtr, val: ExprPtr },
    Inductive(Arc<MutIndBody>),
}

/// What a global name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalRef {
    Const(NamePtr),
    Ind(IndRef),
    Construct(IndRef, u32),
}

/// The global environment: declarations, section variables, the universe graph and the
/// typing flags.
#[derive(Debug, Clone)]
pub struct Env {
    pub(crate) declars: FxIndexMap<NamePtr, Declar>,
    pub(crate) globals: FxIndexMap<NamePtr, GlobalRef>,
    pub(crate) named: FxIndexMap<NamePtr, ExprPtr>,
    pub(crate) ugraph: UGraph,
    pub(crate) flags: TypingFlags,
}

impl Env {
    pub fn new(flags: TypingFlags) -> Self {
        Self {
            declars: new_fx_index_map(),
            globals: new_fx_index_map(),
            named: new_fx_index_map(),
            ugraph: UGraph::new(),
            flags,
        }
    }

    pub fn flags(&self) -> &TypingFlags { &self.flags }

    pub fn ugraph(&self) -> &UGraph { &self.ugraph }

    pub fn is_declared(&self, name: NamePtr) -> bool { self.globals.contains_key(&name) }

    pub fn get_declar(&self, name: NamePtr) -> Option<&Declar> { self.declars.get(&name) }

    pub fn resolve_global(&self, name: NamePtr) -> Option<GlobalRef> { self.globals.get(&name).copied() }

    pub fn lookup_named(&self, name: NamePtr) -> Option<ExprPtr> { self.named.get(&name).copied() }

    pub fn lookup_mind(&self, mind: NamePtr) -> Option<&Arc<MutIndBody>> {
        match self.declars.get(&mind) {
            Some(Declar::Inductive(body)) => Some(body),
            _ => None,
        }
    }

    pub fn lookup_ind(&self, ind: IndRef) -> Option<(&MutIndBody, &OneIndBody)> {
        let mib = self.lookup_mind(ind.mind)?;
        let packet = mib.packets.get(ind.idx as usize)?;
        Some((mib.as_ref(), packet))
    }

    /// A copy of this environment with the universes and constraints of `univs` in scope.
    pub fn push_universes(&self, ctx: &TcCtx, univs: &UniverseEntry) -> TcResult<Env> {
        let mut out = self.clone();
        let (levels, constraints) = univs.levels_and_constraints();
        for l in levels.iter().copied() {
            out.ugraph.add_universe(l)?;
        }
        for c in constraints.iter().copied() {
            out.ugraph.add_constraint(ctx, c)?;
        }
        Ok(out)
    }

    /// Declare a global universe variable.
    pub fn add_universe(&mut self, name: NamePtr) -> TcResult<()> { self.ugraph.add_universe(name) }

    pub fn add_constraint(&mut self, ctx: &TcCtx, c: crate::univ::UnivConstraint) -> TcResult<()> {
        self.ugraph.add_constraint(ctx, c)
    }

    fn check_fresh(&self, name: NamePtr) -> TcResult<()> {
        if self.is_declared(name) || self.named.contains_key(&name) {
            Err(TypeError::AlreadyDeclared(name))
        } else {
            Ok(())
        }
    }

    fn with_uparams(&self, ctx: &TcCtx, uparams: &[NamePtr]) -> TcResult<Env> {
        self.push_universes(ctx, &UniverseEntry::Polymorphic { params: uparams.to_vec(), constraints: Vec::new() })
    }

    pub fn add_section_var(&mut self, ctx: &mut TcCtx, name: NamePtr, ty: ExprPtr) -> TcResult<()> {
        self.check_fresh(name)?;
        TypeChecker::new(ctx, self).infer_sort(ty)?;
        debug!(name = %ctx.name_to_string(name), "section variable");
        self.named.insert(name, ty);
        Ok(())
    }

    pub fn add_axiom(&mut self, ctx: &mut TcCtx, name: NamePtr, uparams: &[NamePtr], ty: ExprPtr) -> TcResult<()> {
        self.check_fresh(name)?;
        let scoped = self.with_uparams(ctx, uparams)?;
        TypeChecker::new(ctx, &scoped).infer_sort(ty)?;
        debug!(name = %ctx.name_to_string(name), "axiom");
        self.declars.insert(name, Declar::Axiom { name, uparams: Arc::from(uparams), ty });
        self.globals.insert(name, GlobalRef::Const(name));
        Ok(())
    }

    pub fn add_definition(
        &mut self,
        ctx: &mut TcCtx,
        name: NamePtr,
        uparams: &[NamePtr],
        ty: ExprPtr,
        val: ExprPtr,
    ) -> TcResult<()> {
        self.check_fresh(name)?;
        let scoped = self.with_uparams(ctx, uparams)?;
        {
            let mut tc = TypeChecker::new(ctx, &scoped);
            tc.infer_sort(ty)?;
            tc.check(val, ty)?;
        }
        debug!(name = %ctx.name_to_string(name), "definition");
        self.declars.insert(name, Declar::Definition { name, uparams: Arc::from(uparams), ty, val });
        self.globals.insert(name, GlobalRef::Const(name));
        Ok(())
    }

    /// Register a certified mutual block. Its monomorphic universes join the global
    /// graph; record projections become definitions.
    pub fn add_inductive(&mut self, ctx: &mut TcCtx, body: MutIndBody) -> IndResult<Arc<MutIndBody>> {
        if self.is_declared(body.name) {
            return Err(IndError::AlreadyDeclared(body.name))
        }
        let mut names = Vec::new();
        for packet in body.packets.iter() {
            names.push(packet.typename);
            names.extend(packet.consnames.iter().copied());
        }
        if let Some(record) = body.record.as_ref() {
            names.extend(record.projections.iter().map(|p| p.name));
        }
        let mut seen = new_fx_hash_set();
        if let Some(dup) = names.iter().copied().find(|n| !seen.insert(*n) || self.is_declared(*n) || self.named.contains_key(n)) {
            return Err(IndError::AlreadyDeclared(dup))
        }

        let mut extended = self.clone();
        if let UniverseEntry::Monomorphic { .. } = &body.universes {
            extended = extended.push_universes(ctx, &body.universes)?;
        }
        let body = Arc::new(body);
        extended.declars.insert(body.name, Declar::Inductive(body.clone()));
        for (i, packet) in body.packets.iter().enumerate() {
            let ind = IndRef { mind: body.name, idx: i as u32 };
            extended.globals.insert(packet.typename, GlobalRef::Ind(ind));
            for (j, c) in packet.consnames.iter().enumerate() {
                extended.globals.insert(*c, GlobalRef::Construct(ind, j as u32));
            }
        }
        if let Some(record) = body.record.as_ref() {
            let uparams: Arc<[NamePtr]> = Arc::from(body.universes.poly_params());
            for p in record.projections.iter() {
                extended.declars.insert(p.name, Declar::Definition {
                    name: p.name,
                    uparams: uparams.clone(),
                    ty: p.ty,
                    val: p.body,
                });
                extended.globals.insert(p.name, GlobalRef::Const(p.name));
            }
        }
        debug!(name = %ctx.name_to_string(body.name), ntypes = body.ntypes, "registered inductive block");
        *self = extended;
        Ok(body)
    }
}
