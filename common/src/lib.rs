pub mod config;
pub mod error;
pub mod fs;
pub mod log;
pub mod random;
pub mod time;

use std::hash::BuildHasherDefault;

pub type FxHashSet<K> = hashbrown::HashSet<K, BuildHasherDefault<rustc_hash::FxHasher>>;
