use crate::error::Result;
use crate::id::{MintedId, SpitId};
use crate::spit::Spit;
use async_trait::async_trait;

/// Persistence of spits, decoupled from the concrete backend.
///
/// The storager owns ID minting because the counters live in the same store
/// as the records.
#[async_trait]
pub trait Storager: Send + Sync + 'static {
    /// Unconditionally writes the record and resets its click counter to zero.
    async fn put(&self, spit: &Spit) -> Result<()>;

    /// Fetches a record with its current click count.
    ///
    /// Fails with `NotFound` if absent. A record past its expiration is
    /// deleted and reported as `Expired`.
    async fn get(&self, id: &SpitId) -> Result<Spit>;

    /// Like [`Storager::get`], then atomically counts one click and returns
    /// the record with the updated count.
    async fn get_with_analytics(&self, id: &SpitId) -> Result<Spit>;

    /// Removes the record and its click counter. Fails with `NotFound` if absent.
    async fn delete(&self, id: &SpitId) -> Result<()>;

    /// Mints a fresh, unique ID.
    async fn next_id(&self) -> Result<MintedId>;

    /// Checks the format of `id` against the alphabets in effect. No store access.
    fn validate_id(&self, id: &str) -> bool;
}
