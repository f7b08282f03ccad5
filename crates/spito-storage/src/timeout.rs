use async_trait::async_trait;
use spito_core::store::StoreResult;
use spito_core::{KvStore, StorageError};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Default bound on a single store call.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(2);

/// Bounds every call of the wrapped store.
///
/// A call that does not finish in time is abandoned and reported as
/// [`StorageError::Timeout`].
#[derive(Debug, Clone)]
pub struct TimeoutKvStore<K> {
    inner: K,
    limit: Duration,
}

impl<K: KvStore> TimeoutKvStore<K> {
    pub fn new(inner: K, limit: Duration) -> Self {
        Self { inner, limit }
    }

    pub fn inner(&self) -> &K {
        &self.inner
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        key: &str,
        call: impl Future<Output = StoreResult<T>> + Send,
    ) -> StoreResult<T> {
        match tokio::time::timeout(self.limit, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, key = %key, limit = ?self.limit, "store call timed out");
                Err(StorageError::Timeout(format!(
                    "{operation} on '{key}' exceeded {:?}",
                    self.limit
                )))
            }
        }
    }
}

#[async_trait]
impl<K: KvStore> KvStore for TimeoutKvStore<K> {
    async fn put(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StoreResult<()> {
        self.bounded("put", key, self.inner.put(key, value, ttl))
            .await
    }

    async fn get_raw(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.bounded("get", key, self.inner.get_raw(key)).await
    }

    async fn get_counter(&self, key: &str) -> StoreResult<Option<u64>> {
        self.bounded("get_counter", key, self.inner.get_counter(key))
            .await
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        self.bounded("delete", key, self.inner.delete(key)).await
    }

    async fn atomic_increment(
        &self,
        key: &str,
        delta: u64,
        initial: u64,
        ttl: Option<Duration>,
    ) -> StoreResult<u64> {
        self.bounded(
            "atomic_increment",
            key,
            self.inner.atomic_increment(key, delta, initial, ttl),
        )
        .await
    }

    async fn put_counter(&self, key: &str, value: u64, ttl: Option<Duration>) -> StoreResult<()> {
        self.bounded("put_counter", key, self.inner.put_counter(key, value, ttl))
            .await
    }

    async fn conditional_put(&self, key: &str, value: &[u8]) -> StoreResult<bool> {
        self.bounded("conditional_put", key, self.inner.conditional_put(key, value))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryKvStore;

    /// Delegates to memory after a fixed delay.
    struct SlowStore {
        delay: Duration,
        inner: InMemoryKvStore,
    }

    #[async_trait]
    impl KvStore for SlowStore {
        async fn put(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StoreResult<()> {
            tokio::time::sleep(self.delay).await;
            self.inner.put(key, value, ttl).await
        }

        async fn get_raw(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
            tokio::time::sleep(self.delay).await;
            self.inner.get_raw(key).await
        }

        async fn get_counter(&self, key: &str) -> StoreResult<Option<u64>> {
            tokio::time::sleep(self.delay).await;
            self.inner.get_counter(key).await
        }

        async fn delete(&self, key: &str) -> StoreResult<bool> {
            tokio::time::sleep(self.delay).await;
            self.inner.delete(key).await
        }

        async fn atomic_increment(
            &self,
            key: &str,
            delta: u64,
            initial: u64,
            ttl: Option<Duration>,
        ) -> StoreResult<u64> {
            tokio::time::sleep(self.delay).await;
            self.inner.atomic_increment(key, delta, initial, ttl).await
        }

        async fn put_counter(
            &self,
            key: &str,
            value: u64,
            ttl: Option<Duration>,
        ) -> StoreResult<()> {
            tokio::time::sleep(self.delay).await;
            self.inner.put_counter(key, value, ttl).await
        }

        async fn conditional_put(&self, key: &str, value: &[u8]) -> StoreResult<bool> {
            tokio::time::sleep(self.delay).await;
            self.inner.conditional_put(key, value).await
        }
    }

    fn slow(delay: Duration, limit: Duration) -> TimeoutKvStore<SlowStore> {
        TimeoutKvStore::new(
            SlowStore {
                delay,
                inner: InMemoryKvStore::new(),
            },
            limit,
        )
    }

    #[tokio::test]
    async fn fast_calls_pass_through() {
        let store = slow(Duration::ZERO, Duration::from_secs(1));

        store.put("k", b"v", None).await.unwrap();
        assert_eq!(store.get_raw("k").await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(store.atomic_increment("n", 1, 1, None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn slow_calls_time_out() {
        let store = slow(Duration::from_millis(500), Duration::from_millis(20));

        let err = store.get_raw("k").await.unwrap_err();
        assert!(matches!(err, StorageError::Timeout(ref m) if m.contains("get")));
        assert!(matches!(
            store.atomic_increment("n", 1, 1, None).await,
            Err(StorageError::Timeout(_))
        ));
    }
}
