use thiserror::Error;

/// Why a disposable backend could not be provided to a test.
#[derive(Debug, Error)]
pub enum TestInfraError {
    #[error("failed to run container: {0}")]
    Container(#[from] testcontainers::TestcontainersError),

    #[error("redis fixture unreachable: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("mysql fixture unreachable: {0}")]
    MySql(#[from] sqlx::Error),
}

pub type Result<T, E = TestInfraError> = std::result::Result<T, E>;
