use rand::{rngs::StdRng, SeedableRng};
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

/// Derive a stable sub-seed, e.g. one per (tool, run) of a synthetic campaign.
///
/// `FxHasher` has no per-process random state, so derived seeds are the same
/// across invocations and platforms of equal pointer width.
pub trait DeriveRandomSeed: Hash {
    fn derive<H: Hash>(&self, value: &H) -> u64 {
        let mut hasher = FxHasher::default();
        self.hash(&mut hasher);
        value.hash(&mut hasher);
        hasher.finish()
    }
}

impl DeriveRandomSeed for u64 {}

pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}
