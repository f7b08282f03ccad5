use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};

/// Chooses which counter shard a mint advances.
///
/// Production code draws uniformly at random. Tests pin the choice with
/// [`ShardPicker::fixed`] or make it reproducible with [`ShardPicker::seeded`].
#[derive(Debug)]
pub struct ShardPicker {
    source: Source,
}

#[derive(Debug)]
enum Source {
    Random(Mutex<StdRng>),
    Fixed(usize),
}

impl ShardPicker {
    pub fn from_entropy() -> Self {
        Self {
            source: Source::Random(Mutex::new(StdRng::from_os_rng())),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            source: Source::Random(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    /// Always picks `shard` (modulo the number of shards).
    pub fn fixed(shard: usize) -> Self {
        Self {
            source: Source::Fixed(shard),
        }
    }

    /// Picks a shard in `0..shards`. `shards` must be non-zero.
    pub fn pick(&self, shards: usize) -> usize {
        match &self.source {
            Source::Random(rng) => rng
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .random_range(0..shards),
            Source::Fixed(shard) => shard % shards,
        }
    }
}

impl Default for ShardPicker {
    fn default() -> Self {
        Self::from_entropy()
    }
}
