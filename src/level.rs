use crate::hash64;
use crate::util::{LevelPtr, NamePtr, Ptr, TcCtx};
use std::hash::{Hash, Hasher};

use Level::*;

pub(crate) const ZERO_HASH: u64 = 2221;
pub(crate) const SUCC_HASH: u64 = 2341;
pub(crate) const MAX_HASH: u64 = 2459;
pub(crate) const PARAM_HASH: u64 = 2593;

/// Algebraic universe levels. `Zero` is the level of `Set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Zero,
    Succ(LevelPtr, u64),
    Max(LevelPtr, LevelPtr, u64),
    Param(NamePtr, u64),
}

impl Hash for Level {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Zero => state.write_u64(ZERO_HASH),
            Succ(.., hash) | Max(.., hash) | Param(.., hash) => state.write_u64(*hash),
        }
    }
}

/// Sorts. `Prop` sits below every level; `Set` is `Type(Zero)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sort {
    Prop,
    Type(LevelPtr),
}

impl Sort {
    pub fn is_prop(self) -> bool { matches!(self, Sort::Prop) }
}

/// The sort families an inductive type may be eliminated into, ordered by inclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SortFamily {
    InProp,
    InSet,
    InType,
}

/// A level flattened into `max (base_0 + k_0) ... (base_n + k_n)`; a `None` base is `Zero`.
pub type MaxList = Vec<(Option<NamePtr>, u32)>;

impl TcCtx {
    pub fn zero(&self) -> LevelPtr { Ptr::from(0) }

    pub fn succ(&mut self, l: LevelPtr) -> LevelPtr {
        let hash = hash64!(SUCC_HASH, l);
        self.alloc_level(Succ(l, hash))
    }

    pub fn max(&mut self, l: LevelPtr, r: LevelPtr) -> LevelPtr {
        let hash = hash64!(MAX_HASH, l, r);
        self.alloc_level(Max(l, r, hash))
    }

    pub fn param(&mut self, n: NamePtr) -> LevelPtr {
        let hash = hash64!(PARAM_HASH, n);
        self.alloc_level(Param(n, hash))
    }

    pub fn param_str(&mut self, s: &str) -> LevelPtr {
        let n = self.str1(s);
        self.param(n)
    }

    pub fn level_n(&mut self, mut l: LevelPtr, n: u32) -> LevelPtr {
        for _ in 0..n {
            l = self.succ(l);
        }
        l
    }

    pub fn set_sort(&self) -> Sort { Sort::Type(self.zero()) }

    pub fn max_list(&self, l: LevelPtr) -> MaxList {
        let mut raw = Vec::new();
        self.max_list_core(l, 0, &mut raw);
        let mut out: MaxList = Vec::new();
        for (base, k) in raw {
            match out.iter_mut().find(|(b, _)| *b == base) {
                Some((_, k_old)) => *k_old = (*k_old).max(k),
                None => out.push((base, k)),
            }
        }
        // `Set + k` is below `u + k` for every variable `u`.
        let dominated = |(b, k): &(Option<NamePtr>, u32), all: &MaxList| {
            b.is_none() && all.iter().any(|(b2, k2)| b2.is_some() && k2 >= k)
        };
        let snapshot = out.clone();
        out.retain(|item| !dominated(item, &snapshot));
        out
    }

    fn max_list_core(&self, l: LevelPtr, k: u32, out: &mut MaxList) {
        match self.read_level(l) {
            Zero => out.push((None, k)),
            Succ(x, _) => self.max_list_core(x, k + 1, out),
            Max(a, b, _) => {
                self.max_list_core(a, k, out);
                self.max_list_core(b, k, out);
            }
            Param(n, _) => out.push((Some(n), k)),
        }
    }

    pub(crate) fn of_max_list(&mut self, items: &[(Option<NamePtr>, u32)]) -> LevelPtr {
        let mut acc: Option<LevelPtr> = None;
        for (base, k) in items.iter().copied() {
            let base = match base {
                None => self.zero(),
                Some(n) => self.param(n),
            };
            let item = self.level_n(base, k);
            acc = Some(match acc {
                None => item,
                Some(prev) => self.max(prev, item),
            });
        }
        acc.unwrap_or_else(|| self.zero())
    }

    pub fn simplify(&mut self, l: LevelPtr) -> LevelPtr {
        let items = self.max_list(l);
        self.of_max_list(&items)
    }

    /// Graph-free comparison; sound in every universe graph.
    pub fn leq(&self, l1: LevelPtr, l2: LevelPtr) -> bool {
        let rhs = self.max_list(l2);
        self.max_list(l1).into_iter().all(|(b1, k1)| {
            rhs.iter().any(|(b2, k2)| (b1 == *b2 || b1.is_none()) && k1 <= *k2)
        })
    }

    pub fn eq_antisymm(&self, l1: LevelPtr, l2: LevelPtr) -> bool { self.leq(l1, l2) && self.leq(l2, l1) }

    pub fn is_zero(&self, l: LevelPtr) -> bool { self.max_list(l) == vec![(None, 0)] }

    pub fn subst_level(&mut self, l: LevelPtr, ks: &[NamePtr], vs: &[LevelPtr]) -> LevelPtr {
        match self.read_level(l) {
            Zero => l,
            Succ(x, _) => {
                let x = self.subst_level(x, ks, vs);
                self.succ(x)
            }
            Max(a, b, _) => {
                let a = self.subst_level(a, ks, vs);
                let b = self.subst_level(b, ks, vs);
                self.max(a, b)
            }
            Param(n, _) => match ks.iter().position(|k| *k == n) {
                Some(pos) if pos < vs.len() => vs[pos],
                _ => l,
            },
        }
    }

    pub fn subst_sort(&mut self, s: Sort, ks: &[NamePtr], vs: &[LevelPtr]) -> Sort {
        match s {
            Sort::Prop => s,
            Sort::Type(l) => Sort::Type(self.subst_level(l, ks, vs)),
        }
    }

    /// Least upper bound of two sorts.
    pub fn sort_sup(&mut self, a: Sort, b: Sort) -> Sort {
        match (a, b) {
            (Sort::Prop, x) | (x, Sort::Prop) => x,
            (Sort::Type(l1), Sort::Type(l2)) => {
                let m = self.max(l1, l2);
                Sort::Type(self.simplify(m))
            }
        }
    }

    /// The sort of the sort `s` itself.
    pub fn sort_of_sort(&mut self, s: Sort) -> Sort {
        match s {
            Sort::Prop => {
                let z = self.zero();
                Sort::Type(self.succ(z))
            }
            Sort::Type(l) => Sort::Type(self.succ(l)),
        }
    }

    pub fn sort_of_product(&mut self, dom: Sort, codom: Sort, impredicative_set: bool) -> Sort {
        match (dom, codom) {
            (_, Sort::Prop) => Sort::Prop,
            (Sort::Prop, codom) => codom,
            (Sort::Type(l1), Sort::Type(l2)) if self.is_zero(l2) && (impredicative_set || self.is_zero(l1)) => codom,
            (Sort::Type(l1), Sort::Type(l2)) => {
                let m = self.max(l1, l2);
                Sort::Type(self.simplify(m))
            }
        }
    }

    pub fn sort_family(&self, s: Sort) -> SortFamily {
        match s {
            Sort::Prop => SortFamily::InProp,
            Sort::Type(l) if self.is_zero(l) => SortFamily::InSet,
            Sort::Type(_) => SortFamily::InType,
        }
    }

    /// `Prop` or `Set`.
    pub fn is_small_sort(&self, s: Sort) -> bool { self.sort_family(s) != SortFamily::InType }
}
