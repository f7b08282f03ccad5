use async_trait::async_trait;
use jiff::Timestamp;
use spito_core::store::StoreResult;
use spito_core::{KvStore, StorageError};
use sqlx::{MySqlPool, Row};
use std::time::Duration;

const DOCUMENTS_DDL: &str = include_str!("../ddl/mysql/spit_documents.sql");
const COUNTERS_DDL: &str = include_str!("../ddl/mysql/spit_counters.sql");

/// MySQL binding of [`KvStore`].
///
/// Documents live in `spit_documents`, counters in `spit_counters`; a key is
/// looked up in the table matching the operation. TTLs are stored as an
/// absolute `expire_at` (unix seconds, rounded up) and rows past it are
/// treated as absent.
#[derive(Debug, Clone)]
pub struct MySqlKvStore {
    pool: MySqlPool,
}

impl MySqlKvStore {
    /// Creates a store from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a store by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Creates the tables if they do not exist yet.
    pub async fn migrate(&self) -> StoreResult<()> {
        for ddl in [DOCUMENTS_DDL, COUNTERS_DDL] {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        }
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn now_unix_seconds() -> i64 {
    Timestamp::now().as_second()
}

const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// First whole second at or after `now + ttl`.
///
/// Rounding down would hide a row before its TTL has elapsed.
fn expire_at(now: Timestamp, ttl: Option<Duration>) -> Option<i64> {
    ttl.map(|ttl| {
        let ttl = i128::try_from(ttl.as_nanos()).unwrap_or(i128::MAX);
        let deadline = now.as_nanosecond().saturating_add(ttl);
        let secs = deadline.div_euclid(NANOS_PER_SECOND)
            + i128::from(deadline.rem_euclid(NANOS_PER_SECOND) > 0);
        i64::try_from(secs).unwrap_or(i64::MAX)
    })
}


fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

#[async_trait]
impl KvStore for MySqlKvStore {
    async fn put(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StoreResult<()> {
        let expire_at = expire_at(Timestamp::now(), ttl);

        sqlx::query(
            r#"
            INSERT INTO spit_documents (k, v, expire_at)
            VALUES (?, ?, ?)
            ON DUPLICATE KEY UPDATE v = VALUES(v), expire_at = VALUES(expire_at)
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(expire_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn get_raw(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let row = sqlx::query(
            r#"
            SELECT v
            FROM spit_documents
            WHERE k = ?
              AND (expire_at IS NULL OR expire_at > ?)
            LIMIT 1
            "#,
        )
        .bind(key)
        .bind(now_unix_seconds())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(|row| row.try_get::<Vec<u8>, _>("v").map_err(map_sqlx_error))
            .transpose()
    }

    async fn get_counter(&self, key: &str) -> StoreResult<Option<u64>> {
        let row = sqlx::query(
            r#"
            SELECT value
            FROM spit_counters
            WHERE k = ?
              AND (expire_at IS NULL OR expire_at > ?)
            LIMIT 1
            "#,
        )
        .bind(key)
        .bind(now_unix_seconds())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(|row| row.try_get::<u64, _>("value").map_err(map_sqlx_error))
            .transpose()
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let now = now_unix_seconds();
        let mut removed = 0;

        for statement in [
            "DELETE FROM spit_documents WHERE k = ? AND (expire_at IS NULL OR expire_at > ?)",
            "DELETE FROM spit_counters WHERE k = ? AND (expire_at IS NULL OR expire_at > ?)",
        ] {
            let result = sqlx::query(statement)
                .bind(key)
                .bind(now)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
            removed += result.rows_affected();
        }

        Ok(removed > 0)
    }

    async fn atomic_increment(
        &self,
        key: &str,
        delta: u64,
        initial: u64,
        ttl: Option<Duration>,
    ) -> StoreResult<u64> {
        let now = Timestamp::now();
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // The upsert locks the row, so the read below sees this transaction's write.
        sqlx::query(
            r#"
            INSERT INTO spit_counters (k, value, expire_at)
            VALUES (?, ?, ?)
            ON DUPLICATE KEY UPDATE
              value = IF(expire_at IS NOT NULL AND expire_at <= ?, VALUES(value), value + ?),
              expire_at = IF(expire_at IS NOT NULL AND expire_at <= ?, VALUES(expire_at), expire_at)
            "#,
        )
        .bind(key)
        .bind(initial)
        .bind(expire_at(now, ttl))
        .bind(now.as_second())
        .bind(delta)
        .bind(now.as_second())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let value: u64 = sqlx::query("SELECT value FROM spit_counters WHERE k = ?")
            .bind(key)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .try_get("value")
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(value)
    }

    async fn put_counter(&self, key: &str, value: u64, ttl: Option<Duration>) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO spit_counters (k, value, expire_at)
            VALUES (?, ?, ?)
            ON DUPLICATE KEY UPDATE value = VALUES(value), expire_at = VALUES(expire_at)
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(expire_at(Timestamp::now(), ttl))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn conditional_put(&self, key: &str, value: &[u8]) -> StoreResult<bool> {
        let now = now_unix_seconds();
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        sqlx::query(
            "DELETE FROM spit_documents WHERE k = ? AND expire_at IS NOT NULL AND expire_at <= ?",
        )
        .bind(key)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let result = sqlx::query(
            r#"
            INSERT IGNORE INTO spit_documents (k, v, expire_at)
            VALUES (?, ?, NULL)
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(result.rows_affected() == 1)
    }
}
