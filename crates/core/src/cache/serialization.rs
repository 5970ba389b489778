//! Pure functions for serializing/deserializing users to/from stored bytes.
//!
//! JSON is used both for the full-collection snapshot and for each pending
//! queue entry, so values stay readable with `redis-cli`.

use crate::users::User;
use thiserror::Error;

/// Errors that can occur during cache serialization/deserialization.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SerializationError {
    /// Failed to serialize a value to bytes.
    #[error("Failed to serialize: {0}")]
    SerializeFailed(String),
    /// Failed to deserialize bytes to a value.
    #[error("Failed to deserialize: {0}")]
    DeserializeFailed(String),
}

/// Result type for serialization operations.
pub type Result<T> = std::result::Result<T, SerializationError>;

/// Serializes a single user (one pending queue entry) to JSON bytes.
pub fn serialize_user(user: &User) -> Result<Vec<u8>> {
    serde_json::to_vec(user).map_err(|e| SerializationError::SerializeFailed(e.to_string()))
}

/// Deserializes JSON bytes to a single user.
pub fn deserialize_user(bytes: &[u8]) -> Result<User> {
    serde_json::from_slice(bytes).map_err(|e| SerializationError::DeserializeFailed(e.to_string()))
}

/// Serializes the full-collection snapshot to JSON bytes.
pub fn serialize_users(users: &[User]) -> Result<Vec<u8>> {
    serde_json::to_vec(users).map_err(|e| SerializationError::SerializeFailed(e.to_string()))
}

/// Deserializes the full-collection snapshot.
pub fn deserialize_users(bytes: &[u8]) -> Result<Vec<User>> {
    serde_json::from_slice(bytes).map_err(|e| SerializationError::DeserializeFailed(e.to_string()))
}
