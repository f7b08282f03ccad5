use crate::validation::ValidationErrors;
use thiserror::Error;

/// Result type for domain and storage-adapter operations.
pub type Result<T> = std::result::Result<T, SpitError>;

/// Errors raised by a [`KvStore`](crate::KvStore) backend.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage operation failed: {0}")]
    Operation(String),
}

#[derive(Debug, Clone, Error)]
pub enum SpitError {
    #[error("invalid spit: {0}")]
    Validation(ValidationErrors),
    #[error("no spit exists with id {0}")]
    NotFound(String),
    #[error("spit {0} has expired")]
    Expired(String),
    #[error("stored spit {id} is malformed: {message}")]
    MalformedRecord { id: String, message: String },
    #[error("store unavailable during {operation}: {source}")]
    StoreUnavailable {
        operation: &'static str,
        #[source]
        source: StorageError,
    },
    #[error("id counter {key} unavailable: {message}")]
    CounterUnavailable { key: String, message: String },
    #[error("id bootstrap failed: {0}")]
    Bootstrap(String),
    #[error("invalid spit id: {0}")]
    InvalidId(String),
}

impl SpitError {
    /// Wraps a backend error with the name of the operation that failed.
    pub fn store(operation: &'static str, source: StorageError) -> Self {
        Self::StoreUnavailable { operation, source }
    }

    /// Absent, expired and unreadable records all look like "not found" to callers.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::Expired(_) | Self::MalformedRecord { .. }
        )
    }

    /// Returns `true` for errors the caller can fix by changing its input.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidId(_))
    }
}

impl From<ValidationErrors> for SpitError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}
