use std::time::Duration;

use thiserror::Error;

use usercache_core::cache::{CacheError, SerializationError};
use usercache_core::storage::{repository_error_to_status_code, RepositoryError};
use usercache_core::users::ValidationError;

/// Errors surfaced by the user service and its components.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The relational store rejected or failed a query.
    #[error("Store error: {0}")]
    Store(#[from] RepositoryError),
    /// The snapshot cache could not be read or invalidated.
    #[error("Cache error: {0}")]
    Cache(#[source] CacheError),
    /// The pending-write queue could not be appended to or drained.
    #[error("Queue error: {0}")]
    Queue(#[source] CacheError),
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),
    /// A flush cycle ran too long to trim safely under its lease.
    #[error("Flush lease may have lapsed after {}ms, batch left queued", held.as_millis())]
    LeaseExpired { held: Duration },
    /// A store call did not finish within its deadline.
    #[error("{operation} timed out after {}ms", after.as_millis())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

impl ServiceError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Store(err) => repository_error_to_status_code(err),
            ServiceError::Cache(_) | ServiceError::Queue(_) | ServiceError::LeaseExpired { .. } => {
                503
            }
            ServiceError::Validation(_) => 400,
            ServiceError::Serialization(_) => 500,
            ServiceError::Timeout { .. } => 504,
        }
    }
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
