//! Disjoint sets over hashable keys. The type checker records terms already found
//! convertible here, and the universe graph groups variables forced equal.
use crate::util::{new_fx_index_map, FxIndexMap};
use std::hash::Hash;

/// Each key gets a slot the first time it is seen; `parent[i] == i` marks a root.
#[derive(Debug)]
pub(crate) struct UnionFind<A: Eq + Hash> {
    slots: FxIndexMap<A, ()>,
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl<A: Eq + Hash> UnionFind<A> {
    pub(crate) fn new() -> Self { UnionFind { slots: new_fx_index_map(), parent: Vec::new(), size: Vec::new() } }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.parent.clear();
        self.size.clear();
    }

    fn slot(&mut self, a: A) -> usize {
        let (idx, old) = self.slots.insert_full(a, ());
        if old.is_none() {
            self.parent.push(idx);
            self.size.push(1);
        }
        idx
    }

    /// Path halving: every other node on the way up is pointed at its grandparent.
    fn root(&mut self, mut idx: usize) -> usize {
        while self.parent[idx] != idx {
            let grandparent = self.parent[self.parent[idx]];
            self.parent[idx] = grandparent;
            idx = grandparent;
        }
        idx
    }

    /// The smaller class is hung below the larger one.
    pub(crate) fn union(&mut self, a: A, b: A) {
        let (a, b) = (self.slot(a), self.slot(b));
        let (mut ra, mut rb) = (self.root(a), self.root(b));
        if ra == rb {
            return
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
    }

    pub(crate) fn same_class(&mut self, a: A, b: A) -> bool {
        let (a, b) = (self.slot(a), self.slot(b));
        self.root(a) == self.root(b)
    }

    /// An identifier for the class of `a`, stable until the next `union`.
    pub(crate) fn class_of(&mut self, a: A) -> usize {
        let idx = self.slot(a);
        self.root(idx)
    }
}
