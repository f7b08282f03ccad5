use crate::{
    counter_error, counter_unavailable, shard_alphabet_key, shard_counter_key, IdGenerator,
    ShardPicker,
};
use async_trait::async_trait;
use spito_core::{KvStore, MintedId, RawId, Result, SpitError, SpitId, StorageError};
use spito_encoding::Alphabet;
use std::sync::Arc;
use tracing::{info, trace};
use typed_builder::TypedBuilder;

/// Layout of sharded IDs.
#[derive(Debug, Clone, TypedBuilder)]
pub struct ShardedSettings {
    /// Number of counters, and of segments per ID.
    #[builder(default = 3)]
    pub shards: usize,
    /// Characters per segment. Each shard can issue `base^width` values.
    #[builder(default = 6)]
    pub segment_width: usize,
    /// Alphabet the per-shard alphabets are shuffled from.
    #[builder(default)]
    pub base_alphabet: Alphabet,
}

#[derive(Debug)]
struct Shard {
    counter_key: String,
    alphabet: Alphabet,
}

/// N counters, each with its own shuffled alphabet.
///
/// A mint advances one randomly picked counter by one and reads the others,
/// then concatenates every counter as a fixed-width segment in shard order.
/// Spreading the increments over N keys relieves the hot counter of the
/// single-counter scheme.
///
/// Two concurrent mints that advance *different* shards may observe the same
/// counter tuple. Only the counter a mint advances is guaranteed unique.
#[derive(Debug)]
pub struct ShardedCounterGenerator<K> {
    store: Arc<K>,
    shards: Vec<Shard>,
    segment_width: usize,
    picker: ShardPicker,
}

impl<K: KvStore> ShardedCounterGenerator<K> {
    /// Agrees on the per-shard alphabets with every other process sharing the store.
    ///
    /// Each shard first tries to store a freshly shuffled alphabet if none is
    /// there yet, then reads the key back and uses whatever won. The local
    /// candidate is never used without that confirmation. Counters are created
    /// at zero if absent.
    pub async fn bootstrap(
        store: Arc<K>,
        settings: ShardedSettings,
        picker: ShardPicker,
    ) -> Result<Self> {
        if settings.shards == 0 {
            return Err(SpitError::Bootstrap("at least one shard is required".into()));
        }
        if settings.segment_width == 0 {
            return Err(SpitError::Bootstrap("segment width must be positive".into()));
        }

        let candidates = shuffle_candidates(&settings.base_alphabet, settings.shards);
        let mut shards = Vec::with_capacity(settings.shards);

        for (index, candidate) in candidates.into_iter().enumerate() {
            let alphabet_key = shard_alphabet_key(index);
            let written = store
                .conditional_put(&alphabet_key, candidate.to_string().as_bytes())
                .await
                .map_err(|e| bootstrap_error(&alphabet_key, e))?;

            let alphabet = read_alphabet(store.as_ref(), &alphabet_key).await?;
            if written {
                info!(shard = index, key = %alphabet_key, "stored new shard alphabet");
            } else {
                info!(shard = index, key = %alphabet_key, "adopted existing shard alphabet");
            }

            let counter_key = shard_counter_key(index);
            store
                .atomic_increment(&counter_key, 0, 0, None)
                .await
                .map_err(|e| bootstrap_error(&counter_key, e))?;

            shards.push(Shard {
                counter_key,
                alphabet,
            });
        }

        Ok(Self {
            store,
            shards,
            segment_width: settings.segment_width,
            picker,
        })
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn segment_width(&self) -> usize {
        self.segment_width
    }

    /// The alphabets in effect, in shard order.
    pub fn alphabets(&self) -> impl Iterator<Item = &Alphabet> {
        self.shards.iter().map(|shard| &shard.alphabet)
    }
}

fn shuffle_candidates(base: &Alphabet, shards: usize) -> Vec<Alphabet> {
    let mut rng = rand::rng();
    (0..shards).map(|_| base.shuffled(&mut rng)).collect()
}

async fn read_alphabet<K: KvStore>(store: &K, key: &str) -> Result<Alphabet> {
    let bytes = store
        .get_raw(key)
        .await
        .map_err(|e| bootstrap_error(key, e))?
        .ok_or_else(|| SpitError::Bootstrap(format!("alphabet {key} missing after write")))?;

    let chars = String::from_utf8(bytes)
        .map_err(|e| SpitError::Bootstrap(format!("alphabet {key} is not utf-8: {e}")))?;
    chars
        .parse()
        .map_err(|e| SpitError::Bootstrap(format!("alphabet {key} is invalid: {e}")))
}

fn bootstrap_error(key: &str, err: StorageError) -> SpitError {
    SpitError::Bootstrap(format!("{key}: {err}"))
}

#[async_trait]
impl<K: KvStore> IdGenerator for ShardedCounterGenerator<K> {
    async fn mint(&self) -> Result<MintedId> {
        let chosen = self.picker.pick(self.shards.len());
        let mut values = Vec::with_capacity(self.shards.len());

        for (index, shard) in self.shards.iter().enumerate() {
            let delta = u64::from(index == chosen);
            let value = self
                .store
                .atomic_increment(&shard.counter_key, delta, delta, None)
                .await
                .map_err(|e| counter_error(&shard.counter_key, e))?;
            values.push(value);
        }

        let mut id = String::with_capacity(self.shards.len() * self.segment_width);
        for (shard, value) in self.shards.iter().zip(&values) {
            let segment = shard
                .alphabet
                .encode_padded(*value, self.segment_width)
                .map_err(|e| counter_unavailable(&shard.counter_key, e))?;
            id.push_str(&segment);
        }

        trace!(id = %id, shard = chosen, raw = ?values, "minted sharded id");
        Ok(MintedId {
            id: SpitId::new_unchecked(id),
            raw: RawId::shards(values),
        })
    }

    fn validate(&self, id: &str) -> bool {
        let chars: Vec<char> = id.chars().collect();
        if chars.len() != self.shards.len() * self.segment_width {
            return false;
        }

        chars
            .chunks(self.segment_width)
            .zip(&self.shards)
            .all(|(segment, shard)| {
                let segment: String = segment.iter().collect();
                shard
                    .alphabet
                    .decode_padded(&segment, self.segment_width)
                    .is_ok()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MapStore;
    use spito_encoding::DEFAULT_CHARS;
    use std::collections::HashSet;

    async fn bootstrap(
        store: &Arc<MapStore>,
        settings: ShardedSettings,
        picker: ShardPicker,
    ) -> ShardedCounterGenerator<MapStore> {
        ShardedCounterGenerator::bootstrap(store.clone(), settings, picker)
            .await
            .unwrap()
    }

    async fn with_defaults(
        store: &Arc<MapStore>,
        picker: ShardPicker,
    ) -> ShardedCounterGenerator<MapStore> {
        bootstrap(store, ShardedSettings::builder().build(), picker).await
    }

    #[tokio::test]
    async fn bootstrap_persists_permuted_alphabets_and_zero_counters() {
        let store = Arc::new(MapStore::default());
        let generator = with_defaults(&store, ShardPicker::seeded(1)).await;

        assert_eq!(generator.shard_count(), 3);
        for (index, alphabet) in generator.alphabets().enumerate() {
            let stored = store.text(&shard_alphabet_key(index)).unwrap();
            assert_eq!(stored, alphabet.to_string());
            assert_eq!(alphabet.base(), DEFAULT_CHARS.chars().count());
            assert!(DEFAULT_CHARS.chars().all(|c| alphabet.contains(c)));
            assert_eq!(store.counter(&shard_counter_key(index)), Some(0));
        }
    }

    #[tokio::test]
    async fn second_bootstrap_adopts_committed_alphabets() {
        let store = Arc::new(MapStore::default());
        let first = with_defaults(&store, ShardPicker::seeded(1)).await;
        let second = with_defaults(&store, ShardPicker::seeded(2)).await;

        let first: Vec<String> = first.alphabets().map(ToString::to_string).collect();
        let second: Vec<String> = second.alphabets().map(ToString::to_string).collect();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn bootstrap_uses_the_stored_value_not_its_candidate() {
        let store = Arc::new(MapStore::default());
        store
            .put(&shard_alphabet_key(1), b"0123456789", None)
            .await
            .unwrap();

        let generator = bootstrap(
            &store,
            ShardedSettings::builder().shards(2).build(),
            ShardPicker::fixed(0),
        )
        .await;

        let alphabets: Vec<String> = generator.alphabets().map(ToString::to_string).collect();
        assert_eq!(alphabets[1], "0123456789");
        assert_ne!(alphabets[0], "0123456789");
    }

    #[tokio::test]
    async fn mint_advances_only_the_picked_shard() {
        let store = Arc::new(MapStore::default());
        let generator = with_defaults(&store, ShardPicker::fixed(1)).await;

        let minted = generator.mint().await.unwrap();
        assert_eq!(minted.raw, RawId::shards(vec![0, 1, 0]));
        assert_eq!(store.counter(&shard_counter_key(0)), Some(0));
        assert_eq!(store.counter(&shard_counter_key(1)), Some(1));
        assert_eq!(store.counter(&shard_counter_key(2)), Some(0));

        let expected: String = generator
            .alphabets()
            .zip([0, 1, 0])
            .map(|(alphabet, n)| alphabet.encode_padded(n, 6).unwrap())
            .collect();
        assert_eq!(minted.id.as_str(), expected);

        let again = generator.mint().await.unwrap();
        assert_eq!(again.raw, RawId::shards(vec![0, 2, 0]));
    }

    #[tokio::test]
    async fn sequential_mints_are_unique_and_valid() {
        let store = Arc::new(MapStore::default());
        let generator = with_defaults(&store, ShardPicker::seeded(9)).await;

        let mut ids = HashSet::new();
        for _ in 0..200 {
            let minted = generator.mint().await.unwrap();
            assert_eq!(minted.id.as_str().chars().count(), 18);
            assert!(generator.validate(minted.id.as_str()));
            assert!(ids.insert(minted.id));
        }
    }

    #[tokio::test]
    async fn validate_checks_length_and_per_shard_alphabet() {
        let store = Arc::new(MapStore::default());
        let generator = bootstrap(
            &store,
            ShardedSettings::builder()
                .shards(2)
                .segment_width(3)
                .base_alphabet(Alphabet::new("abcd").unwrap())
                .build(),
            ShardPicker::fixed(0),
        )
        .await;

        let id = generator.mint().await.unwrap().id;
        assert!(generator.validate(id.as_str()));
        assert!(!generator.validate(&id.as_str()[..5]));
        assert!(!generator.validate("abcabz"));
        assert!(!generator.validate(""));
    }

    #[tokio::test]
    async fn counter_outgrowing_its_segment_fails_the_mint() {
        let store = Arc::new(MapStore::default());
        let generator = bootstrap(
            &store,
            ShardedSettings::builder()
                .shards(2)
                .segment_width(1)
                .base_alphabet(Alphabet::new("ab").unwrap())
                .build(),
            ShardPicker::fixed(0),
        )
        .await;
        store.set_counter(&shard_counter_key(0), 1);

        let err = generator.mint().await.unwrap_err();
        let expected = shard_counter_key(0);
        assert!(matches!(err, SpitError::CounterUnavailable { ref key, .. } if *key == expected));
    }

    #[tokio::test]
    async fn store_failure_fails_the_mint() {
        let store = Arc::new(MapStore::default());
        let generator = with_defaults(&store, ShardPicker::fixed(2)).await;
        store.break_counters();

        assert!(matches!(
            generator.mint().await,
            Err(SpitError::CounterUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn bootstrap_rejects_bad_settings_and_corrupt_alphabets() {
        let store = Arc::new(MapStore::default());
        let zero = ShardedCounterGenerator::bootstrap(
            store.clone(),
            ShardedSettings::builder().shards(0).build(),
            ShardPicker::fixed(0),
        )
        .await;
        assert!(matches!(zero, Err(SpitError::Bootstrap(_))));

        store.put(&shard_alphabet_key(0), b"x", None).await.unwrap();
        let corrupt = ShardedCounterGenerator::bootstrap(
            store,
            ShardedSettings::builder().build(),
            ShardPicker::fixed(0),
        )
        .await;
        assert!(matches!(corrupt, Err(SpitError::Bootstrap(_))));
    }
}
