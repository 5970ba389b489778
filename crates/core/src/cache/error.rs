use thiserror::Error;

/// Errors that can occur during key-value store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Key-value store connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Key-value store operation failed: {0}")]
    OperationFailed(String),
    #[error("Wrong value type at key {key}: expected {expected}")]
    WrongType { key: String, expected: &'static str },
}

/// Result type for key-value store operations.
pub type Result<T> = std::result::Result<T, CacheError>;
