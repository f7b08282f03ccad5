use crate::timeout::{TimeoutKvStore, DEFAULT_OP_TIMEOUT};
use async_trait::async_trait;
use spito_core::{
    Clock, KvStore, MintedId, Result, Spit, SpitError, SpitId, StorageError, Storager,
    SystemClock,
};
use spito_generator::{
    IdGenerator, ShardPicker, ShardedCounterGenerator, ShardedSettings, SingleCounterGenerator,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};
use typed_builder::TypedBuilder;

/// Store key of a spit record.
pub fn record_key(id: &SpitId) -> String {
    format!("spit::{id}")
}

/// Store key of a spit's click counter.
pub fn clicks_key(id: &SpitId) -> String {
    format!("spit::clicks::{id}")
}

/// How IDs are minted. One scheme per deployment.
#[derive(Debug, Clone)]
pub enum IdScheme {
    Single,
    Sharded(ShardedSettings),
}

#[derive(TypedBuilder)]
pub struct StoragerSettings {
    #[builder(default = IdScheme::Single)]
    scheme: IdScheme,
    /// Bound on every store call.
    #[builder(default = DEFAULT_OP_TIMEOUT)]
    op_timeout: Duration,
    /// Time source for expiration checks.
    #[builder(default = Arc::new(SystemClock))]
    clock: Arc<dyn Clock>,
    /// Shard choice for the sharded scheme.
    #[builder(default)]
    picker: ShardPicker,
}

/// [`Storager`] over any [`KvStore`].
///
/// Each spit is a JSON document at [`record_key`], with its clicks counted
/// separately at [`clicks_key`] so a view never rewrites the document. Both
/// keys carry the spit's TTL natively, and reads additionally check the
/// expiration against the clock, evicting what they find expired.
pub struct KvStorager<K> {
    store: Arc<TimeoutKvStore<K>>,
    generator: Box<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl<K: KvStore> KvStorager<K> {
    /// Wraps `store` and runs the one-time ID bootstrap.
    ///
    /// Must succeed before the storager can be used; a failure is fatal to
    /// startup and is not retried.
    pub async fn init(store: K, settings: StoragerSettings) -> Result<Self> {
        let store = Arc::new(TimeoutKvStore::new(store, settings.op_timeout));

        let generator: Box<dyn IdGenerator> = match settings.scheme {
            IdScheme::Single => {
                info!("minting ids from a single counter");
                Box::new(SingleCounterGenerator::new(store.clone()))
            }
            IdScheme::Sharded(sharded) => {
                info!(
                    shards = sharded.shards,
                    segment_width = sharded.segment_width,
                    "bootstrapping sharded id counters"
                );
                Box::new(
                    ShardedCounterGenerator::bootstrap(store.clone(), sharded, settings.picker)
                        .await?,
                )
            }
        };

        Ok(Self {
            store,
            generator,
            clock: settings.clock,
        })
    }

    /// The bounded store this storager writes through.
    pub fn store(&self) -> &TimeoutKvStore<K> {
        &self.store
    }

    async fn load(&self, id: &SpitId) -> Result<Spit> {
        let key = record_key(id);
        trace!(id = %id, "loading spit");

        let body = self
            .store
            .get_raw(&key)
            .await
            .map_err(|e| store_error("get", id, e))?
            .ok_or_else(|| SpitError::NotFound(id.to_string()))?;

        let spit: Spit = serde_json::from_slice(&body).map_err(|e| {
            warn!(id = %id, error = %e, "stored spit is malformed");
            SpitError::MalformedRecord {
                id: id.to_string(),
                message: e.to_string(),
            }
        })?;

        if spit.is_expired_at(self.clock.now()) {
            debug!(id = %id, "spit expired, evicting");
            self.evict(id).await?;
            return Err(SpitError::Expired(id.to_string()));
        }

        Ok(spit)
    }

    async fn evict(&self, id: &SpitId) -> Result<bool> {
        let existed = self
            .store
            .delete(&record_key(id))
            .await
            .map_err(|e| store_error("delete", id, e))?;
        self.store
            .delete(&clicks_key(id))
            .await
            .map_err(|e| store_error("delete", id, e))?;
        Ok(existed)
    }

    fn ttl(&self, spit: &Spit) -> Option<Duration> {
        spit.remaining_ttl(self.clock.now())
            .and_then(|ttl| Duration::try_from(ttl).ok())
    }
}

fn store_error(operation: &'static str, id: &SpitId, err: StorageError) -> SpitError {
    warn!(operation, id = %id, error = %err, "store call failed");
    SpitError::store(operation, err)
}

#[async_trait]
impl<K: KvStore> Storager for KvStorager<K> {
    async fn put(&self, spit: &Spit) -> Result<()> {
        let id = spit.id();
        let body = serde_json::to_vec(spit)
            .map_err(|e| SpitError::store("put", StorageError::InvalidData(e.to_string())))?;
        let ttl = self.ttl(spit);

        self.store
            .put(&record_key(id), &body, ttl)
            .await
            .map_err(|e| store_error("put", id, e))?;

        // Reset rather than keep a counter left over from an earlier record.
        self.store
            .put_counter(&clicks_key(id), 0, ttl)
            .await
            .map_err(|e| store_error("put", id, e))?;

        debug!(id = %id, kind = %spit.kind(), exp = spit.exp(), "stored spit");
        Ok(())
    }

    async fn get(&self, id: &SpitId) -> Result<Spit> {
        let spit = self.load(id).await?;
        let clicks = self
            .store
            .get_counter(&clicks_key(id))
            .await
            .map_err(|e| store_error("get_clicks", id, e))?
            .unwrap_or(0);
        Ok(spit.with_clicks(clicks))
    }

    async fn get_with_analytics(&self, id: &SpitId) -> Result<Spit> {
        let spit = self.load(id).await?;
        let ttl = self.ttl(&spit);
        let clicks_key = clicks_key(id);
        let clicks = self
            .store
            .atomic_increment(&clicks_key, 1, 1, ttl)
            .await
            .map_err(|e| store_error("increment_clicks", id, e))?;

        // A delete that landed after `load` leaves the increment above
        // re-creating the counter; drop it again.
        let still_stored = self
            .store
            .get_raw(&record_key(id))
            .await
            .map_err(|e| store_error("get", id, e))?
            .is_some();
        if !still_stored {
            debug!(id = %id, "spit deleted during view, dropping its click counter");
            self.store
                .delete(&clicks_key)
                .await
                .map_err(|e| store_error("delete", id, e))?;
            return Err(SpitError::NotFound(id.to_string()));
        }

        trace!(id = %id, clicks, "counted click");
        Ok(spit.with_clicks(clicks))
    }

    async fn delete(&self, id: &SpitId) -> Result<()> {
        if self.evict(id).await? {
            debug!(id = %id, "deleted spit");
            Ok(())
        } else {
            Err(SpitError::NotFound(id.to_string()))
        }
    }

    async fn next_id(&self) -> Result<MintedId> {
        self.generator.mint().await
    }

    fn validate_id(&self, id: &str) -> bool {
        self.generator.validate(id)
    }
}
