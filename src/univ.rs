//! The universe constraint graph. Nodes are `Set` and the declared universe
//! variables; an edge `u -(w)-> v` records `u + w <= v`. The graph never holds a
//! cycle of positive weight, so longest paths are well defined.
use crate::env::TypingFlags;
use crate::level::{Level, Sort};
use crate::tc::{TcResult, TypeError};
use crate::union_find::UnionFind;
use crate::util::{new_fx_index_set, FxIndexSet, LevelPtr, NamePtr, TcCtx};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    Lt,
    Le,
    Eq,
}

/// A constraint between two atomic levels (`Zero` or a universe variable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnivConstraint {
    pub lhs: LevelPtr,
    pub kind: ConstraintKind,
    pub rhs: LevelPtr,
}

#[derive(Debug, Clone)]
pub struct UGraph {
    /// `None` is `Set`, always at position 0.
    nodes: FxIndexSet<Option<NamePtr>>,
    edges: Vec<Vec<(usize, u32)>>,
}

impl Default for UGraph {
    fn default() -> Self { Self::new() }
}

impl UGraph {
    pub fn new() -> Self {
        let mut nodes = new_fx_index_set();
        nodes.insert(None);
        Self { nodes, edges: vec![Vec::new()] }
    }

    pub fn contains(&self, n: NamePtr) -> bool { self.nodes.contains(&Some(n)) }

    pub fn num_universes(&self) -> usize { self.nodes.len() - 1 }

    /// Declare a fresh universe variable `n`, with the implicit constraint `Set <= n`.
    pub fn add_universe(&mut self, n: NamePtr) -> TcResult<()> {
        let (idx, is_new) = self.nodes.insert_full(Some(n));
        if !is_new {
            return Err(TypeError::DuplicateUniverse(n))
        }
        self.edges.push(Vec::new());
        self.edges[0].push((idx, 0));
        Ok(())
    }

    fn node_of(&self, ctx: &TcCtx, l: LevelPtr) -> TcResult<usize> {
        match ctx.read_level(l) {
            Level::Zero => Ok(0),
            Level::Param(n, _) => self.node_of_name(Some(n)),
            _ => Err(TypeError::NonAtomicConstraint(l)),
        }
    }

    fn node_of_name(&self, n: Option<NamePtr>) -> TcResult<usize> {
        match n {
            None => Ok(0),
            Some(n) => self.nodes.get_index_of(&Some(n)).ok_or(TypeError::UndeclaredUniverse(n)),
        }
    }

    /// Longest path weights from `from` to every node, or `None` where no path exists.
    fn longest_paths(&self, from: usize) -> Vec<Option<i64>> {
        let n = self.nodes.len();
        let mut dist = vec![None; n];
        dist[from] = Some(0i64);
        for _ in 0..n {
            let mut changed = false;
            for u in 0..n {
                if let Some(du) = dist[u] {
                    for &(v, w) in self.edges[u].iter() {
                        let cand = du + i64::from(w);
                        if dist[v].map_or(true, |dv| cand > dv) {
                            dist[v] = Some(cand);
                            changed = true;
                        }
                    }
                }
            }
            if !changed {
                break
            }
        }
        dist
    }

    fn dist(&self, from: usize, to: usize) -> Option<i64> { self.longest_paths(from)[to] }

    fn add_edge(&mut self, from: usize, to: usize, w: u32) -> TcResult<()> {
        if let Some(back) = self.dist(to, from) {
            if back + i64::from(w) > 0 {
                return Err(TypeError::UniverseInconsistency)
            }
        }
        self.edges[from].push((to, w));
        Ok(())
    }

    pub fn add_constraint(&mut self, ctx: &TcCtx, c: UnivConstraint) -> TcResult<()> {
        let (l, r) = (self.node_of(ctx, c.lhs)?, self.node_of(ctx, c.rhs)?);
        trace!(lhs = l, rhs = r, kind = ?c.kind, "add universe constraint");
        match c.kind {
            ConstraintKind::Lt => self.add_edge(l, r, 1),
            ConstraintKind::Le => self.add_edge(l, r, 0),
            ConstraintKind::Eq => {
                self.add_edge(l, r, 0)?;
                self.add_edge(r, l, 0)
            }
        }
    }

    /// Check `l1 <= l2` in every model of the graph. Each component `b1 + k1` of `l1`
    /// must sit below some component `b2 + k2` of `l2`.
    pub fn check_leq(&self, ctx: &TcCtx, l1: LevelPtr, l2: LevelPtr) -> TcResult<bool> {
        if l1 == l2 || ctx.leq(l1, l2) {
            return Ok(true)
        }
        let mut rhs = Vec::new();
        for (b, k) in ctx.max_list(l2) {
            rhs.push((self.node_of_name(b)?, i64::from(k)));
        }
        for (b1, k1) in ctx.max_list(l1) {
            let from = self.node_of_name(b1)?;
            let dists = self.longest_paths(from);
            let k1 = i64::from(k1);
            let below_some = rhs.iter().any(|(to, k2)| dists[*to].map_or(false, |d| d >= k1 - k2));
            if !below_some {
                return Ok(false)
            }
        }
        Ok(true)
    }

    pub fn check_eq(&self, ctx: &TcCtx, l1: LevelPtr, l2: LevelPtr) -> TcResult<bool> {
        Ok(self.check_leq(ctx, l1, l2)? && self.check_leq(ctx, l2, l1)?)
    }

    pub fn check_sort_leq(&self, ctx: &TcCtx, s1: Sort, s2: Sort) -> TcResult<bool> {
        match (s1, s2) {
            (Sort::Prop, _) => Ok(true),
            (Sort::Type(_), Sort::Prop) => Ok(false),
            (Sort::Type(l1), Sort::Type(l2)) => self.check_leq(ctx, l1, l2),
        }
    }

    pub fn check_sort_eq(&self, ctx: &TcCtx, s1: Sort, s2: Sort) -> TcResult<bool> {
        match (s1, s2) {
            (Sort::Prop, Sort::Prop) => Ok(true),
            (Sort::Type(l1), Sort::Type(l2)) => self.check_eq(ctx, l1, l2),
            _ => Ok(false),
        }
    }

    /// Every universe variable mentioned by `l` must be declared.
    pub fn check_declared(&self, ctx: &TcCtx, l: LevelPtr) -> TcResult<()> {
        for (b, _) in ctx.max_list(l) {
            self.node_of_name(b)?;
        }
        Ok(())
    }

    /// The substitution sending each of `names` to the representative of the class of
    /// variables the graph forces equal to it. `Set` represents its own class; otherwise
    /// the earliest declared variable does.
    pub fn canonical_subst(&self, ctx: &mut TcCtx, names: &[NamePtr]) -> TcResult<(Vec<NamePtr>, Vec<LevelPtr>)> {
        let n = self.nodes.len();
        let rows: Vec<Vec<Option<i64>>> = (0..n).map(|i| self.longest_paths(i)).collect();
        let mut classes = UnionFind::new();
        for i in 0..n {
            for j in 0..i {
                if rows[i][j] == Some(0) && rows[j][i] == Some(0) {
                    classes.union(i, j);
                }
            }
        }
        let (mut ks, mut vs) = (Vec::new(), Vec::new());
        for name in names.iter().copied() {
            let i = self.node_of_name(Some(name))?;
            let class = classes.class_of(i);
            let rep = (0..=i).find(|j| classes.class_of(*j) == class).unwrap_or(i);
            if rep != i {
                let rep_level = match self.nodes.get_index(rep).copied().flatten() {
                    None => ctx.zero(),
                    Some(rep_name) => ctx.param(rep_name),
                };
                ks.push(name);
                vs.push(rep_level);
            }
        }
        Ok((ks, vs))
    }
}

/// `Prop` always; `Set` when the impredicative-set flag is on.
pub fn is_impredicative(ctx: &TcCtx, s: Sort, flags: &TypingFlags) -> bool {
    match s {
        Sort::Prop => true,
        Sort::Type(l) => flags.impredicative_set && ctx.is_zero(l),
    }
}
