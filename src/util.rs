use crate::env::TypingFlags;
use crate::expr::Expr;
use crate::level::Level;
use crate::name::Name;
use crate::union_find::UnionFind;
use crate::unique_hasher::UniqueHasher;
use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHasher;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fs::OpenOptions;
use std::borrow::Borrow;
use std::hash::{BuildHasherDefault, Hash};
use std::io::BufReader;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub(crate) const fn default_true() -> bool { true }

fn default_log_level() -> String { String::from("warn") }

pub(crate) type UniqueIndexSet<A> = IndexSet<A, BuildHasherDefault<UniqueHasher>>;
pub(crate) type FxIndexSet<A> = IndexSet<A, BuildHasherDefault<FxHasher>>;
pub(crate) type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;
pub(crate) type FxHashMap<K, V> = HashMap<K, V, BuildHasherDefault<FxHasher>>;
pub(crate) type FxHashSet<K> = HashSet<K, BuildHasherDefault<FxHasher>>;
pub(crate) type UniqueHashMap<K, V> = HashMap<K, V, BuildHasherDefault<UniqueHasher>>;

/// An integer pointer to an item stored in a `TcCtx`. Items are hash-consed, so two
/// pointers of the same type are equal exactly when the items they point to are
/// structurally equal.
pub struct Ptr<A> {
    /// The index in the appropriate dag at which this element sits.
    pub(crate) idx: u32,
    pub(crate) ph: PhantomData<fn() -> A>,
}

impl<A> Ptr<A> {
    pub(crate) fn from(idx: usize) -> Self {
        // Dags stay far below `u32::MAX` items.
        Self { idx: idx as u32, ph: PhantomData }
    }

    pub(crate) fn idx(&self) -> usize { self.idx as usize }
}

impl<A> Clone for Ptr<A> {
    fn clone(&self) -> Self { *self }
}

impl<A> Copy for Ptr<A> {}

impl<A> PartialEq for Ptr<A> {
    fn eq(&self, other: &Self) -> bool { self.idx == other.idx }
}

impl<A> Eq for Ptr<A> {}

/// Allocation order.
impl<A> PartialOrd for Ptr<A> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> { Some(self.cmp(other)) }
}

impl<A> Ord for Ptr<A> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering { self.idx.cmp(&other.idx) }
}

impl<A> std::hash::Hash for Ptr<A> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) { state.write_u64(self.idx as u64) }
}

impl<A> std::fmt::Debug for Ptr<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "Ptr({})", self.idx) }
}

pub type StringPtr = Ptr<String>;
pub type NamePtr = Ptr<Name>;
pub type LevelPtr = Ptr<Level>;
pub type LevelsPtr = Ptr<Arc<[LevelPtr]>>;
pub type ExprPtr = Ptr<Expr>;
pub type ExprsPtr = Ptr<Arc<[ExprPtr]>>;

pub(crate) fn new_fx_index_map<K, V>() -> FxIndexMap<K, V> { FxIndexMap::with_hasher(Default::default()) }

pub(crate) fn new_fx_hash_map<K, V>() -> FxHashMap<K, V> { FxHashMap::with_hasher(Default::default()) }

pub(crate) fn new_fx_hash_set<K>() -> FxHashSet<K> { FxHashSet::with_hasher(Default::default()) }

pub(crate) fn new_fx_index_set<K>() -> FxIndexSet<K> { FxIndexSet::with_hasher(Default::default()) }
pub(crate) fn new_unique_index_set<K>() -> UniqueIndexSet<K> { UniqueIndexSet::with_hasher(Default::default()) }

pub(crate) fn new_unique_hash_map<K, V>() -> UniqueHashMap<K, V> { UniqueHashMap::with_hasher(Default::default()) }

/// Convenience macro for creating a 64 bit hash.
#[macro_export]
macro_rules! hash64 {
    ( $( $x:expr ),* ) => {
        {
            use std::hash::{ Hash, Hasher };
            let mut hasher = rustc_hash::FxHasher::default();
            $(
                ($x).hash(&mut hasher);
            )*
            hasher.finish()
        }
    };
}

/// The underlying storage for `Name`, `Level`, and `Expr` items, plus the strings and
/// sequences they refer to.
pub struct Dag {
    pub names: UniqueIndexSet<Name>,
    pub levels: UniqueIndexSet<Level>,
    pub exprs: UniqueIndexSet<Expr>,
    pub strings: FxIndexSet<String>,
    pub level_lists: FxIndexSet<Arc<[LevelPtr]>>,
    pub expr_lists: FxIndexSet<Arc<[ExprPtr]>>,
}

impl Dag {
    /// The anonymous name and level zero always sit in the 0th position of their storage.
    pub fn new() -> Self {
        let mut out = Self {
            names: new_unique_index_set(),
            levels: new_unique_index_set(),
            exprs: new_unique_index_set(),
            strings: new_fx_index_set(),
            level_lists: new_fx_index_set(),
            expr_lists: new_fx_index_set(),
        };
        let _ = out.names.insert(Name::Anon);
        let _ = out.levels.insert(Level::Zero);
        out
    }
}

impl Default for Dag {
    fn default() -> Self { Self::new() }
}

/// The memory context shared by the environment, the type checker and the
/// inductive checker. Everything built during a session lives here.
pub struct TcCtx {
    pub(crate) dag: Dag,
}

impl TcCtx {
    pub fn new() -> Self { Self { dag: Dag::new() } }

    pub fn read_name(&self, p: NamePtr) -> Name { self.dag.names[p.idx()] }

    pub fn read_level(&self, p: LevelPtr) -> Level { self.dag.levels[p.idx()] }

    pub fn read_expr(&self, p: ExprPtr) -> Expr { self.dag.exprs[p.idx()] }

    /// Convenience function for reading two items as a tuple.
    pub fn read_expr_pair(&self, a: ExprPtr, x: ExprPtr) -> (Expr, Expr) { (self.read_expr(a), self.read_expr(x)) }

    pub fn read_string(&self, p: StringPtr) -> &str { self.dag.strings[p.idx()].as_str() }

    pub fn read_levels(&self, p: LevelsPtr) -> Arc<[LevelPtr]> { self.dag.level_lists[p.idx()].clone() }

    pub fn read_exprs(&self, p: ExprsPtr) -> Arc<[ExprPtr]> { self.dag.expr_lists[p.idx()].clone() }

    /// Hash-consing: an item equal to one already stored gets the existing pointer.
    pub fn alloc_name(&mut self, n: Name) -> NamePtr { Ptr::from(self.dag.names.insert_full(n).0) }

    pub fn alloc_level(&mut self, l: Level) -> LevelPtr { Ptr::from(self.dag.levels.insert_full(l).0) }

    pub fn alloc_expr(&mut self, e: Expr) -> ExprPtr { Ptr::from(self.dag.exprs.insert_full(e).0) }

    pub(crate) fn alloc_string(&mut self, s: &str) -> StringPtr { Ptr::from(intern(&mut self.dag.strings, s)) }

    pub fn alloc_levels_slice(&mut self, ls: &[LevelPtr]) -> LevelsPtr { Ptr::from(intern(&mut self.dag.level_lists, ls)) }

    pub fn alloc_exprs_slice(&mut self, es: &[ExprPtr]) -> ExprsPtr { Ptr::from(intern(&mut self.dag.expr_lists, es)) }

    pub fn no_levels(&mut self) -> LevelsPtr { self.alloc_levels_slice(&[]) }
}

/// Look `probe` up by reference, only building an owned copy when it is new.
fn intern<A, Q>(set: &mut FxIndexSet<A>, probe: &Q) -> usize
where
    A: Hash + Eq + Borrow<Q> + for<'a> From<&'a Q>,
    Q: Hash + Eq + ?Sized, {
    match set.get_index_of(probe) {
        Some(idx) => idx,
        None => set.insert_full(A::from(probe)).0,
    }
}

impl Default for TcCtx {
    fn default() -> Self { Self::new() }
}

pub(crate) struct TcCache {
    pub(crate) infer_cache: UniqueHashMap<ExprPtr, ExprPtr>,
    pub(crate) whnf_cache: UniqueHashMap<ExprPtr, ExprPtr>,
    pub(crate) whnf_core_cache: UniqueHashMap<ExprPtr, ExprPtr>,
    pub(crate) eq_cache: UnionFind<ExprPtr>,
    /// Pairs of closed terms already found not to be convertible.
    pub(crate) failure_cache: FxHashSet<(ExprPtr, ExprPtr)>,
    pub(crate) nf_cache: UniqueHashMap<ExprPtr, ExprPtr>,
}

impl TcCache {
    pub(crate) fn new() -> Self {
        Self {
            infer_cache: new_unique_hash_map(),
            whnf_cache: new_unique_hash_map(),
            whnf_core_cache: new_unique_hash_map(),
            eq_cache: UnionFind::new(),
            failure_cache: new_fx_hash_set(),
            nf_cache: new_unique_hash_map(),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.infer_cache.clear();
        self.whnf_cache.clear();
        self.whnf_core_cache.clear();
        self.eq_cache.clear();
        self.failure_cache.clear();
        self.nf_cache.clear();
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// The path to the JSON declaration file to be checked.
    pub decl_file_path: PathBuf,

    /// Setting this to `false` turns every universe comparison into a success. Unsound;
    /// meant for debugging declarations whose universe constraints are not available.
    #[serde(default = "default_true")]
    pub check_universes: bool,

    /// Make the sorts of an inductive family's indices count towards its inferred level.
    #[serde(default)]
    pub indices_matter: bool,

    #[serde(default)]
    pub impredicative_set: bool,

    #[serde(default)]
    pub print_success_message: bool,

    /// Print a one-line summary of every certified inductive block.
    #[serde(default)]
    pub print_packets: bool,

    /// One of `off`, `error`, `warn`, `info`, `debug`, `trace`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl TryFrom<&Path> for Config {
    type Error = Box<dyn Error>;
    fn try_from(p: &Path) -> Result<Config, Self::Error> {
        match OpenOptions::new().read(true).truncate(false).open(p) {
            Err(e) => Err(Box::from(format!("failed to open configuration file: {:?}", e))),
            Ok(config_file) => {
                let config = serde_json::from_reader::<_, Config>(BufReader::new(config_file))
                    .map_err(|e| format!("malformed configuration file: {}", e))?;
                if config.log_level.parse::<tracing_subscriber::filter::LevelFilter>().is_err() {
                    return Err(Box::from(format!("unknown log level in configuration file: {:?}", config.log_level)))
                }
                Ok(config)
            }
        }
    }
}

impl Config {
    pub fn typing_flags(&self) -> TypingFlags {
        TypingFlags {
            check_universes: self.check_universes,
            indices_matter: self.indices_matter,
            impredicative_set: self.impredicative_set,
        }
    }

    pub fn read_decl_file(&self) -> Result<crate::parser::DeclFile, Box<dyn Error>> {
        match OpenOptions::new().read(true).truncate(false).open(&self.decl_file_path) {
            Ok(file) => crate::parser::parse_decl_file(BufReader::new(file)),
            Err(e) => Err(Box::from(format!("Failed to open declaration file: {:?}", e))),
        }
    }
}
