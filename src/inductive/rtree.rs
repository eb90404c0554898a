//! Regular trees recording the recursive structure of inductive types.
//!
//! A tree for an inductive has one son per constructor, and each constructor node one
//! son per argument. `Rec(j, defs)` ties the knot: it stands for `defs[j]` where every
//! `Param(0, k)` inside `defs` refers back to `Rec(k, defs)`. `Param(i, k)` with
//! `i > 0` refers to the `i`th enclosing `Rec`.
use crate::expr::IndRef;
use std::sync::Arc;

/// What an argument position (or an inductive) is, recursively speaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecArg {
    Norec,
    /// A member of the block being defined.
    Mrec(IndRef),
    /// An existing inductive the block is nested in.
    Nested(IndRef),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecTree {
    Param(u32, u32),
    Node(RecArg, Arc<[RecTree]>),
    Rec(u32, Arc<[RecTree]>),
}

use RecTree::*;

impl RecTree {
    pub fn mk_node(label: RecArg, sons: Vec<RecTree>) -> Self { Node(label, Arc::from(sons)) }

    pub fn mk_norec() -> Self { Node(RecArg::Norec, Arc::from(Vec::new())) }

    /// Placeholders for the `n` members of a block about to be tied with `mk_rec`.
    pub fn mk_rec_calls(n: u32) -> Vec<RecTree> { (0..n).map(|j| Param(0, j)).collect() }

    pub fn mk_rec(defs: Vec<RecTree>) -> Vec<RecTree> {
        let defs: Arc<[RecTree]> = Arc::from(defs);
        (0..defs.len() as u32).map(|j| Rec(j, defs.clone())).collect()
    }

    pub(crate) fn mk_rec_single(def: RecTree) -> Self { Rec(0, Arc::from(vec![def])) }

    /// The tree of an inductive labelled `label`, given the argument trees of each of
    /// its constructors.
    pub fn mk_paths(label: RecArg, ctors: Vec<Vec<RecTree>>) -> Self {
        Self::mk_node(label, ctors.into_iter().map(|args| Self::mk_node(RecArg::Norec, args)).collect())
    }

    pub fn lift(&self, n: u32) -> Self { if n == 0 { self.clone() } else { self.lift_rec(0, n) } }

    fn lift_rec(&self, depth: u32, n: u32) -> Self {
        match self {
            Param(i, j) if *i >= depth => Param(i + n, *j),
            Param(..) => self.clone(),
            Node(label, sons) => Node(*label, sons.iter().map(|t| t.lift_rec(depth, n)).collect()),
            Rec(j, defs) => Rec(*j, defs.iter().map(|t| t.lift_rec(depth + 1, n)).collect()),
        }
    }

    fn subst_rec(&self, depth: u32, sub: &Arc<[RecTree]>) -> Self {
        match self {
            Param(i, _) if *i < depth => self.clone(),
            Param(i, j) if *i == depth => Rec(*j, sub.clone()).lift(depth),
            Param(i, j) => Param(i - 1, *j),
            Node(label, sons) => Node(*label, sons.iter().map(|t| t.subst_rec(depth, sub)).collect()),
            Rec(j, defs) => Rec(*j, defs.iter().map(|t| t.subst_rec(depth + 1, sub)).collect()),
        }
    }

    /// Unfold leading `Rec`s once, so the result is a `Node` or a `Param`.
    pub fn expand(&self) -> Self {
        let mut t = self.clone();
        while let Rec(j, defs) = &t {
            let next = match defs.get(*j as usize) {
                Some(def) => def.subst_rec(0, defs),
                None => return t,
            };
            t = next;
        }
        t
    }

    pub fn dest_node(&self) -> Option<(RecArg, Arc<[RecTree]>)> {
        match self.expand() {
            Node(label, sons) => Some((label, sons)),
            _ => None,
        }
    }

    pub fn dest_recarg(&self) -> Option<RecArg> { self.dest_node().map(|(label, _)| label) }

    /// The argument trees of each constructor of an inductive's tree.
    pub fn dest_subterms(&self) -> Option<Vec<Vec<RecTree>>> {
        let (_, ctors) = self.dest_node()?;
        ctors.iter().map(|c| c.dest_node().map(|(_, args)| args.to_vec())).collect()
    }

    /// True when this argument tree is a recursive or nested call.
    pub fn is_recursive(&self) -> bool {
        !matches!(self.dest_recarg(), Some(RecArg::Norec) | None)
    }
}
