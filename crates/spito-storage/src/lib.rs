//! Storage backends for spito and the [`Storager`](spito_core::Storager)
//! built on top of them.

pub mod memory;
pub mod mysql;
pub mod redis;
pub mod storager;
pub mod timeout;

pub use memory::InMemoryKvStore;
pub use mysql::MySqlKvStore;
pub use redis::RedisKvStore;
pub use spito_core::{KvStore, StorageError, Storager};
pub use storager::{clicks_key, record_key, IdScheme, KvStorager, StoragerSettings};
pub use timeout::TimeoutKvStore;
