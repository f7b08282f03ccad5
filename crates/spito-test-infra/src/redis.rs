use crate::retry::retry;
use crate::{container_host, Result};
use redis::aio::MultiplexedConnection;
use std::time::Duration;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage};

const PORT: u16 = 6379;
const CONNECT_ATTEMPTS: usize = 10;
const CONNECT_BACKOFF: Duration = Duration::from_millis(200);

/// A standalone Redis server for one test.
pub struct RedisServer {
    container: ContainerAsync<GenericImage>,
    url: String,
}

impl RedisServer {
    pub async fn start() -> Result<Self> {
        let container = GenericImage::new("redis", "8.6.0")
            .with_exposed_port(PORT.tcp())
            .with_wait_for(WaitFor::message_on_stdout("Ready to accept connections"))
            .start()
            .await?;

        let host = container_host(&container).await?;
        let port = container.get_host_port_ipv4(PORT).await?;
        let url = format!("redis://{host}:{port}");

        Ok(Self { container, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Opens a multiplexed connection, retrying while the port comes up.
    pub async fn connection(&self) -> Result<MultiplexedConnection> {
        let client = redis::Client::open(self.url.as_str())?;
        let conn = retry(CONNECT_ATTEMPTS, CONNECT_BACKOFF, || {
            client.get_multiplexed_async_connection()
        })
        .await?;
        Ok(conn)
    }

    /// Stops the server while the test keeps running, to exercise outages.
    pub async fn stop(&self) -> Result<()> {
        Ok(self.container.stop().await?)
    }
}
