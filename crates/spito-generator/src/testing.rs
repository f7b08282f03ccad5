use async_trait::async_trait;
use spito_core::store::StoreResult;
use spito_core::{KvStore, StorageError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Value {
    Bytes(Vec<u8>),
    Counter(u64),
}

/// Map-backed store for generator tests, with a switch to fail increments.
#[derive(Debug, Default)]
pub(crate) struct MapStore {
    values: Mutex<HashMap<String, Value>>,
    broken: AtomicBool,
}

impl MapStore {
    pub(crate) fn counter(&self, key: &str) -> Option<u64> {
        match self.values.lock().unwrap().get(key) {
            Some(Value::Counter(n)) => Some(*n),
            _ => None,
        }
    }

    pub(crate) fn set_counter(&self, key: &str, value: u64) {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), Value::Counter(value));
    }

    pub(crate) fn text(&self, key: &str) -> Option<String> {
        match self.values.lock().unwrap().get(key) {
            Some(Value::Bytes(b)) => Some(String::from_utf8(b.clone()).unwrap()),
            _ => None,
        }
    }

    pub(crate) fn break_counters(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl KvStore for MapStore {
    async fn put(&self, key: &str, value: &[u8], _ttl: Option<Duration>) -> StoreResult<()> {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), Value::Bytes(value.to_vec()));
        Ok(())
    }

    async fn get_raw(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        match self.values.lock().unwrap().get(key) {
            Some(Value::Bytes(b)) => Ok(Some(b.clone())),
            Some(Value::Counter(n)) => Ok(Some(n.to_string().into_bytes())),
            None => Ok(None),
        }
    }

    async fn get_counter(&self, key: &str) -> StoreResult<Option<u64>> {
        Ok(self.counter(key))
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        Ok(self.values.lock().unwrap().remove(key).is_some())
    }

    async fn atomic_increment(
        &self,
        key: &str,
        delta: u64,
        initial: u64,
        _ttl: Option<Duration>,
    ) -> StoreResult<u64> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("connection refused".into()));
        }
        let mut values = self.values.lock().unwrap();
        let next = match values.get(key) {
            Some(Value::Counter(n)) => n + delta,
            Some(Value::Bytes(_)) => {
                return Err(StorageError::InvalidData(format!("{key} is not a counter")))
            }
            None => initial,
        };
        values.insert(key.to_string(), Value::Counter(next));
        Ok(next)
    }

    async fn put_counter(&self, key: &str, value: u64, _ttl: Option<Duration>) -> StoreResult<()> {
        self.set_counter(key, value);
        Ok(())
    }

    async fn conditional_put(&self, key: &str, value: &[u8]) -> StoreResult<bool> {
        let mut values = self.values.lock().unwrap();
        if values.contains_key(key) {
            return Ok(false);
        }
        values.insert(key.to_string(), Value::Bytes(value.to_vec()));
        Ok(true)
    }
}
