use spito_core::{
    Clock, RawSpitFields, Result, Spit, SpitDraft, SpitError, SpitId, Storager, SystemClock,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Entry point of the request-handling layer into the spit lifecycle.
///
/// A [`SpitDraft`] is the unsaved state; [`SpitService::save`] mints its ID
/// exactly once and turns it into a persisted [`Spit`]. Expiry is not a
/// stored state: reads past the expiration evict the spit and report it as
/// not found.
pub struct SpitService<S> {
    storager: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for SpitService<S> {
    fn clone(&self) -> Self {
        Self {
            storager: self.storager.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<S: Storager> SpitService<S> {
    pub fn new(storager: Arc<S>) -> Self {
        Self::with_clock(storager, Arc::new(SystemClock))
    }

    /// Creates a service that stamps creation times from `clock`.
    pub fn with_clock(storager: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { storager, clock }
    }

    pub fn storager(&self) -> &Arc<S> {
        &self.storager
    }

    /// Validates a raw submission and saves it.
    ///
    /// Validation failures come back as [`SpitError::Validation`] carrying the
    /// per-field messages; nothing is written in that case.
    pub async fn create(&self, fields: &RawSpitFields) -> Result<Spit> {
        let draft = SpitDraft::from_fields(fields)?;
        self.save(draft).await
    }

    /// Mints an ID for `draft` and persists it with zero clicks.
    pub async fn save(&self, draft: SpitDraft) -> Result<Spit> {
        let minted = self.storager.next_id().await?;
        let spit = draft.into_spit(minted, self.clock.now());
        self.storager.put(&spit).await?;

        info!(id = %spit.id(), kind = %spit.kind(), exp = spit.exp(), "saved spit");
        Ok(spit)
    }

    /// Fetches a spit without counting a view.
    pub async fn load(&self, id: &str) -> Result<Spit> {
        let id = self.parse_id(id)?;
        self.storager.get(&id).await
    }

    /// Fetches a spit for a public view, counting one click.
    pub async fn load_with_click(&self, id: &str) -> Result<Spit> {
        let id = self.parse_id(id)?;
        let spit = self.storager.get_with_analytics(&id).await?;
        debug!(id = %id, clicks = spit.clicks(), "public view");
        Ok(spit)
    }

    /// Counts one click and returns the new total.
    pub async fn register_click(&self, id: &str) -> Result<u64> {
        Ok(self.load_with_click(id).await?.clicks())
    }

    /// Deletes a spit and its click counter.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let id = self.parse_id(id)?;
        self.storager.delete(&id).await?;
        info!(id = %id, "deleted spit");
        Ok(())
    }

    /// Format-only check against the alphabets in effect; no store access.
    pub fn validate_id_format(&self, id: &str) -> bool {
        self.storager.validate_id(id)
    }

    fn parse_id(&self, id: &str) -> Result<SpitId> {
        let id = id.trim();
        if self.validate_id_format(id) {
            Ok(SpitId::new_unchecked(id))
        } else {
            Err(SpitError::InvalidId(id.to_string()))
        }
    }
}
