use crate::hash64;
use crate::util::{NamePtr, StringPtr, TcCtx};
use std::hash::{Hash, Hasher};

use Name::*;

pub(crate) const ANON_HASH: u64 = 907;
pub(crate) const STR_HASH: u64 = 1129;
pub(crate) const NUM_HASH: u64 = 1237;

/// Hierarchical names, e.g. `Acc.Acc_intro`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Name {
    Anon,
    Str(NamePtr, StringPtr, u64),
    Num(NamePtr, u64, u64),
}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Anon => state.write_u64(ANON_HASH),
            Str(.., hash) | Num(.., hash) => state.write_u64(*hash),
        }
    }
}

impl TcCtx {
    /// A constructor for the anonymous name.
    pub fn anonymous(&self) -> NamePtr { crate::util::Ptr::from(0) }

    pub fn str(&mut self, pfx: NamePtr, sfx: StringPtr) -> NamePtr {
        let hash = hash64!(STR_HASH, pfx, sfx);
        self.alloc_name(Str(pfx, sfx, hash))
    }

    pub fn num(&mut self, pfx: NamePtr, sfx: u64) -> NamePtr {
        let hash = hash64!(NUM_HASH, pfx, sfx);
        self.alloc_name(Num(pfx, sfx, hash))
    }

    /// Extend `pfx` with one string component.
    pub fn name_str(&mut self, pfx: NamePtr, s: &str) -> NamePtr {
        let s = self.alloc_string(s);
        self.str(pfx, s)
    }

    pub fn str1(&mut self, s: &str) -> NamePtr {
        let anon = self.anonymous();
        self.name_str(anon, s)
    }

    /// Build a name from a dot-separated string; numeric components become `Num`.
    pub fn name_from_dotted(&mut self, dotted: &str) -> NamePtr {
        let mut out = self.anonymous();
        for component in dotted.split('.').filter(|s| !s.is_empty()) {
            out = match component.parse::<u64>() {
                Ok(n) => self.num(out, n),
                Err(_) => self.name_str(out, component),
            };
        }
        out
    }

    pub fn is_anon(&self, n: NamePtr) -> bool { matches!(self.read_name(n), Anon) }

    /// Append every component of `sfx` to `pfx`.
    pub fn append_name(&mut self, pfx: NamePtr, sfx: NamePtr) -> NamePtr {
        match self.read_name(sfx) {
            Anon => pfx,
            Str(p, s, _) => {
                let p = self.append_name(pfx, p);
                self.str(p, s)
            }
            Num(p, n, _) => {
                let p = self.append_name(pfx, p);
                self.num(p, n)
            }
        }
    }

    pub fn name_to_string(&self, n: NamePtr) -> String {
        match self.read_name(n) {
            Anon => String::new(),
            Str(pfx, sfx, _) if self.is_anon(pfx) => self.read_string(sfx).to_owned(),
            Str(pfx, sfx, _) => format!("{}.{}", self.name_to_string(pfx), self.read_string(sfx)),
            Num(pfx, sfx, _) if self.is_anon(pfx) => sfx.to_string(),
            Num(pfx, sfx, _) => format!("{}.{}", self.name_to_string(pfx), sfx),
        }
    }
}
