use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Script};
use spito_core::store::StoreResult;
use spito_core::{KvStore, StorageError};
use std::time::Duration;
use tracing::{trace, warn};

const DEFAULT_KEY_PREFIX: &str = "spito:";

/// Increment-with-initial: `INCRBY` an existing key, otherwise `SET` it to the
/// initial value with an optional expiry. Runs atomically on the server.
const INCREMENT_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
  return redis.call('INCRBY', KEYS[1], ARGV[1])
end
redis.call('SET', KEYS[1], ARGV[2])
local ttl = tonumber(ARGV[3])
if ttl > 0 then
  redis.call('EXPIRE', KEYS[1], ttl)
end
return tonumber(ARGV[2])
"#;

/// Redis binding of [`KvStore`].
///
/// Documents are stored as plain string values, counters as integer strings
/// driven by `INCRBY`, TTLs as native key expiry. Every key is namespaced with
/// a configurable prefix.
#[derive(Debug, Clone)]
pub struct RedisKvStore {
    conn: MultiplexedConnection,
    key_prefix: String,
    increment: Script,
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> StorageError {
    let message = format!("{operation}: {err}");
    if err.is_timeout() {
        StorageError::Timeout(message)
    } else if err.is_io_error() || err.is_connection_refusal() || err.is_connection_dropped() {
        StorageError::Unavailable(message)
    } else {
        StorageError::Operation(message)
    }
}

/// Redis expiry granularity is one second; round sub-second TTLs up.
fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs.max(1)
    }
}

impl RedisKvStore {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self::with_prefix(conn, DEFAULT_KEY_PREFIX)
    }

    /// Creates a store with a custom key prefix (e.g. `"myapp:spito:"`).
    pub fn with_prefix(conn: MultiplexedConnection, key_prefix: impl Into<String>) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
            increment: Script::new(INCREMENT_SCRIPT),
        }
    }

    /// Opens a multiplexed connection to `url`.
    pub async fn connect(url: &str, key_prefix: impl Into<String>) -> StoreResult<Self> {
        let client = redis::Client::open(url).map_err(|e| map_redis_error("open client", e))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| map_redis_error("connect", e))?;
        Ok(Self::with_prefix(conn, key_prefix))
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn put(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StoreResult<()> {
        let key = self.full_key(key);
        trace!(key = %key, ttl = ?ttl, "SET");

        let mut conn = self.conn.clone();
        let result = match ttl {
            Some(ttl) => conn.set_ex::<_, _, ()>(&key, value, ttl_seconds(ttl)).await,
            None => conn.set::<_, _, ()>(&key, value).await,
        };
        result.map_err(|e| {
            warn!(key = %key, error = %e, "Redis error on set");
            map_redis_error("failed to write value to Redis", e)
        })
    }

    async fn get_raw(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let key = self.full_key(key);
        trace!(key = %key, "GET");

        let mut conn = self.conn.clone();
        conn.get::<_, Option<Vec<u8>>>(&key).await.map_err(|e| {
            warn!(key = %key, error = %e, "Redis error on get");
            map_redis_error("failed to fetch value from Redis", e)
        })
    }

    async fn get_counter(&self, key: &str) -> StoreResult<Option<u64>> {
        let Some(raw) = self.get_raw(key).await? else {
            return Ok(None);
        };

        std::str::from_utf8(&raw)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Some)
            .ok_or_else(|| StorageError::InvalidData(format!("value at '{key}' is not a counter")))
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let key = self.full_key(key);
        trace!(key = %key, "DEL");

        let mut conn = self.conn.clone();
        let removed = conn.del::<_, u64>(&key).await.map_err(|e| {
            warn!(key = %key, error = %e, "Redis error on del");
            map_redis_error("failed to delete value from Redis", e)
        })?;
        Ok(removed > 0)
    }

    async fn atomic_increment(
        &self,
        key: &str,
        delta: u64,
        initial: u64,
        ttl: Option<Duration>,
    ) -> StoreResult<u64> {
        let key = self.full_key(key);
        trace!(key = %key, delta, initial, "INCRBY");

        let mut conn = self.conn.clone();
        self.increment
            .key(&key)
            .arg(delta)
            .arg(initial)
            .arg(ttl.map_or(0, ttl_seconds))
            .invoke_async::<u64>(&mut conn)
            .await
            .map_err(|e| {
                warn!(key = %key, error = %e, "Redis error on increment");
                map_redis_error("failed to increment counter in Redis", e)
            })
    }

    async fn put_counter(&self, key: &str, value: u64, ttl: Option<Duration>) -> StoreResult<()> {
        let key = self.full_key(key);
        trace!(key = %key, value, ttl = ?ttl, "SET counter");

        let mut conn = self.conn.clone();
        let result = match ttl {
            Some(ttl) => conn.set_ex::<_, _, ()>(&key, value, ttl_seconds(ttl)).await,
            None => conn.set::<_, _, ()>(&key, value).await,
        };
        result.map_err(|e| {
            warn!(key = %key, error = %e, "Redis error on counter set");
            map_redis_error("failed to write counter to Redis", e)
        })
    }

    async fn conditional_put(&self, key: &str, value: &[u8]) -> StoreResult<bool> {
        let key = self.full_key(key);
        trace!(key = %key, "SETNX");

        let mut conn = self.conn.clone();
        conn.set_nx::<_, _, bool>(&key, value).await.map_err(|e| {
            warn!(key = %key, error = %e, "Redis error on setnx");
            map_redis_error("failed to conditionally write value to Redis", e)
        })
    }
}
