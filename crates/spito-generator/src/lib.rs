//! ID minting on top of the atomic counters of a [`KvStore`](spito_core::KvStore).

pub mod picker;
pub mod sharded;
pub mod single;

#[cfg(test)]
mod testing;

pub use picker::ShardPicker;
pub use sharded::{ShardedCounterGenerator, ShardedSettings};
pub use single::SingleCounterGenerator;

use async_trait::async_trait;
use spito_core::{MintedId, Result, SpitError, StorageError};

/// Counter key of the single-counter scheme.
pub const SINGLE_COUNTER_KEY: &str = "spit::count";

/// Counter key of shard `index` in the sharded scheme.
pub fn shard_counter_key(index: usize) -> String {
    format!("spit::count::{index}")
}

/// Key holding the persisted alphabet of shard `index`.
pub fn shard_alphabet_key(index: usize) -> String {
    format!("spit::alphabet::{index}")
}

/// Trait for minting spit IDs.
///
/// Implementations get their uniqueness from the store's native atomic
/// increment. A failed mint never yields a partial ID, and is never retried
/// internally.
#[async_trait]
pub trait IdGenerator: Send + Sync + 'static {
    /// Mints a fresh ID.
    async fn mint(&self) -> Result<MintedId>;

    /// Checks that `id` has the shape of an ID this generator could produce.
    ///
    /// No store access, and no guarantee the ID was ever issued.
    fn validate(&self, id: &str) -> bool;
}

pub(crate) fn counter_unavailable(key: &str, message: impl ToString) -> SpitError {
    SpitError::CounterUnavailable {
        key: key.to_string(),
        message: message.to_string(),
    }
}

pub(crate) fn counter_error(key: &str, err: StorageError) -> SpitError {
    tracing::warn!(key = %key, error = %err, "counter increment failed");
    counter_unavailable(key, err)
}
