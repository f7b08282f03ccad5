//! Disposable backing services for the storage integration tests.

pub mod error;
pub mod mysql;
pub mod redis;
mod retry;

pub use error::{Result, TestInfraError};
pub use mysql::MySqlServer;
pub use redis::RedisServer;

use testcontainers::{ContainerAsync, GenericImage};

/// Host a container is reachable on, as an IPv4 literal when it is local.
async fn container_host(container: &ContainerAsync<GenericImage>) -> Result<String> {
    let host = container.get_host().await?.to_string();
    Ok(match host.as_str() {
        "localhost" => String::from("127.0.0.1"),
        _ => host,
    })
}
