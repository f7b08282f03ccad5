use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jiff::{SignedDuration, Timestamp};
use spito_core::store::StoreResult;
use spito_core::{Clock, KvStore, StorageError, SystemClock};
use std::time::Duration;

#[derive(Debug, Clone)]
enum Value {
    Bytes(Vec<u8>),
    Counter(u64),
}

/// In-memory storage slot with an optional deadline.
#[derive(Debug, Clone)]
struct Slot {
    value: Value,
    expire_at: Option<Timestamp>,
}

impl Slot {
    fn is_expired(&self, now: Timestamp) -> bool {
        self.expire_at.is_some_and(|expire_at| now >= expire_at)
    }
}

/// In-memory implementation of [`KvStore`] using DashMap.
///
/// Expired slots are treated as absent and dropped when next touched. The
/// per-key entry lock of DashMap makes increments and conditional puts atomic.
#[derive(Debug, Clone)]
pub struct InMemoryKvStore<C = SystemClock> {
    slots: DashMap<String, Slot>,
    clock: C,
}

impl InMemoryKvStore<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for InMemoryKvStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> InMemoryKvStore<C> {
    /// Creates a store whose TTLs run on `clock`.
    pub fn with_clock(clock: C) -> Self {
        Self {
            slots: DashMap::new(),
            clock,
        }
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.slots.iter().filter(|slot| !slot.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn deadline(&self, now: Timestamp, ttl: Option<Duration>) -> StoreResult<Option<Timestamp>> {
        ttl.map(|ttl| {
            SignedDuration::try_from(ttl)
                .ok()
                .and_then(|ttl| now.checked_add(ttl).ok())
                .ok_or_else(|| StorageError::Operation(format!("ttl {ttl:?} out of range")))
        })
        .transpose()
    }

    fn live(&self, key: &str) -> Option<Value> {
        let now = self.clock.now();
        let slot = self.slots.get(key)?;
        if slot.is_expired(now) {
            drop(slot);
            self.slots.remove_if(key, |_, slot| slot.is_expired(now));
            return None;
        }
        Some(slot.value.clone())
    }
}

#[async_trait]
impl<C: Clock> KvStore for InMemoryKvStore<C> {
    async fn put(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StoreResult<()> {
        let expire_at = self.deadline(self.clock.now(), ttl)?;
        self.slots.insert(
            key.to_owned(),
            Slot {
                value: Value::Bytes(value.to_vec()),
                expire_at,
            },
        );
        Ok(())
    }

    async fn get_raw(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.live(key).map(|value| match value {
            Value::Bytes(bytes) => bytes,
            Value::Counter(n) => n.to_string().into_bytes(),
        }))
    }

    async fn get_counter(&self, key: &str) -> StoreResult<Option<u64>> {
        match self.live(key) {
            None => Ok(None),
            Some(Value::Counter(n)) => Ok(Some(n)),
            Some(Value::Bytes(_)) => Err(StorageError::InvalidData(format!(
                "value at '{key}' is not a counter"
            ))),
        }
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let now = self.clock.now();
        Ok(self
            .slots
            .remove(key)
            .is_some_and(|(_, slot)| !slot.is_expired(now)))
    }

    async fn atomic_increment(
        &self,
        key: &str,
        delta: u64,
        initial: u64,
        ttl: Option<Duration>,
    ) -> StoreResult<u64> {
        let now = self.clock.now();
        let fresh = |expire_at| Slot {
            value: Value::Counter(initial),
            expire_at,
        };

        match self.slots.entry(key.to_owned()) {
            Entry::Occupied(mut occupied) if !occupied.get().is_expired(now) => {
                match &mut occupied.get_mut().value {
                    Value::Counter(n) => {
                        *n = n.checked_add(delta).ok_or_else(|| {
                            StorageError::Operation(format!("counter '{key}' overflowed"))
                        })?;
                        Ok(*n)
                    }
                    Value::Bytes(_) => Err(StorageError::InvalidData(format!(
                        "value at '{key}' is not a counter"
                    ))),
                }
            }
            Entry::Occupied(mut occupied) => {
                occupied.insert(fresh(self.deadline(now, ttl)?));
                Ok(initial)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh(self.deadline(now, ttl)?));
                Ok(initial)
            }
        }
    }

    async fn put_counter(&self, key: &str, value: u64, ttl: Option<Duration>) -> StoreResult<()> {
        let expire_at = self.deadline(self.clock.now(), ttl)?;
        self.slots.insert(
            key.to_owned(),
            Slot {
                value: Value::Counter(value),
                expire_at,
            },
        );
        Ok(())
    }

    async fn conditional_put(&self, key: &str, value: &[u8]) -> StoreResult<bool> {
        let now = self.clock.now();
        let slot = Slot {
            value: Value::Bytes(value.to_vec()),
            expire_at: None,
        };

        match self.slots.entry(key.to_owned()) {
            Entry::Occupied(occupied) if !occupied.get().is_expired(now) => Ok(false),
            Entry::Occupied(mut occupied) => {
                occupied.insert(slot);
                Ok(true)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(slot);
                Ok(true)
            }
        }
    }
}
