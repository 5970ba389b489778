use thiserror::Error;

/// Errors raised while validating caller-supplied user input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid user id: {0:?}")]
    InvalidId(String),
    #[error("User name cannot be empty")]
    EmptyName,
    #[error("User name too long (max {max} characters)")]
    NameTooLong { max: usize },
}
