use crate::retry::retry;
use crate::{container_host, Result};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use std::time::Duration;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::ImageExt;
use testcontainers::{ContainerAsync, GenericImage};

/// Database, user and password of the disposable server.
const CREDENTIAL: &str = "spito";

const PORT: u16 = 3306;
const POOL_SIZE: u32 = 8;
// MySQL restarts once after its first-boot initialisation, so the first
// connections may be refused even after the ready message.
const CONNECT_ATTEMPTS: usize = 20;
const CONNECT_BACKOFF: Duration = Duration::from_millis(500);

/// An empty MySQL database for one test.
///
/// The tables are not created here; the store under test owns its schema.
pub struct MySqlServer {
    container: ContainerAsync<GenericImage>,
    database_url: String,
}

impl MySqlServer {
    pub async fn start() -> Result<Self> {
        let container = GenericImage::new("mysql", "8.4")
            .with_exposed_port(PORT.tcp())
            .with_wait_for(WaitFor::message_on_stderr("ready for connections"))
            .with_env_var("MYSQL_DATABASE", CREDENTIAL)
            .with_env_var("MYSQL_USER", CREDENTIAL)
            .with_env_var("MYSQL_PASSWORD", CREDENTIAL)
            .with_env_var("MYSQL_ROOT_PASSWORD", "root")
            .start()
            .await?;

        let host = container_host(&container).await?;
        let port = container.get_host_port_ipv4(PORT).await?;
        let database_url =
            format!("mysql://{CREDENTIAL}:{CREDENTIAL}@{host}:{port}/{CREDENTIAL}");

        Ok(Self {
            container,
            database_url,
        })
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Opens a connection pool, waiting out the server's first-boot restart.
    pub async fn pool(&self) -> Result<MySqlPool> {
        let pool = retry(CONNECT_ATTEMPTS, CONNECT_BACKOFF, || {
            MySqlPoolOptions::new()
                .max_connections(POOL_SIZE)
                .connect(&self.database_url)
        })
        .await?;
        Ok(pool)
    }

    /// Stops the server while the test keeps running, to exercise outages.
    pub async fn stop(&self) -> Result<()> {
        Ok(self.container.stop().await?)
    }
}
