use crate::{counter_error, IdGenerator, SINGLE_COUNTER_KEY};
use async_trait::async_trait;
use spito_core::{KvStore, MintedId, RawId, Result, SpitId};
use spito_encoding::Alphabet;
use std::sync::Arc;
use tracing::trace;

/// One global counter, one alphabet.
///
/// Every mint serializes on the same counter key, which is fine at moderate
/// write rates.
#[derive(Debug)]
pub struct SingleCounterGenerator<K> {
    store: Arc<K>,
    alphabet: Alphabet,
    key: String,
}

impl<K: KvStore> SingleCounterGenerator<K> {
    pub fn new(store: Arc<K>) -> Self {
        Self::with_alphabet(store, Alphabet::default())
    }

    pub fn with_alphabet(store: Arc<K>, alphabet: Alphabet) -> Self {
        Self {
            store,
            alphabet,
            key: SINGLE_COUNTER_KEY.to_string(),
        }
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }
}

#[async_trait]
impl<K: KvStore> IdGenerator for SingleCounterGenerator<K> {
    async fn mint(&self) -> Result<MintedId> {
        let value = self
            .store
            .atomic_increment(&self.key, 1, 1, None)
            .await
            .map_err(|e| counter_error(&self.key, e))?;

        let id = self.alphabet.encode(value);
        trace!(id = %id, raw = value, "minted id");

        Ok(MintedId {
            id: SpitId::new_unchecked(id),
            raw: RawId::single(value),
        })
    }

    fn validate(&self, id: &str) -> bool {
        self.alphabet.is_valid(id)
    }
}
