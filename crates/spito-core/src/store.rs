use crate::error::StorageError;
use async_trait::async_trait;
use std::time::Duration;

/// Result type for backend operations.
pub type StoreResult<T> = std::result::Result<T, StorageError>;

/// The key-value contract a storage backend provides.
///
/// Every method is a potentially slow, fallible network call. Atomicity of
/// [`KvStore::atomic_increment`] and [`KvStore::conditional_put`] must come
/// from the backend itself; callers never emulate them with read-modify-write.
#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    /// Writes `value` at `key`, replacing whatever was there.
    ///
    /// With a `ttl` the backend drops the key on its own once it elapses.
    async fn put(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StoreResult<()>;

    /// Reads the bytes stored at `key`. Returns `Ok(None)` if the key is absent.
    async fn get_raw(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Reads a counter written by [`KvStore::atomic_increment`].
    async fn get_counter(&self, key: &str) -> StoreResult<Option<u64>>;

    /// Removes `key`. Returns `true` if it existed.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Atomically adds `delta` to the counter at `key` and returns the new value.
    ///
    /// A missing counter is created with `initial` (and `ttl`, if any), and
    /// `initial` is returned.
    async fn atomic_increment(
        &self,
        key: &str,
        delta: u64,
        initial: u64,
        ttl: Option<Duration>,
    ) -> StoreResult<u64>;

    /// Sets the counter at `key` to `value` in one write, replacing any previous
    /// counter and its TTL.
    async fn put_counter(&self, key: &str, value: u64, ttl: Option<Duration>) -> StoreResult<()>;

    /// Writes `value` only if `key` does not exist yet. Returns `true` if written.
    async fn conditional_put(&self, key: &str, value: &[u8]) -> StoreResult<bool>;
}
