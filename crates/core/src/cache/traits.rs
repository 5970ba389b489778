use std::time::Duration;

use async_trait::async_trait;

use super::Result;

/// The key-value primitives the cache and the write-behind queue rely on.
///
/// List indices follow Redis semantics: `stop` is inclusive and negative
/// indices count from the end of the list (`-1` is the last element).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Gets a value by key (GET).
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Sets a value that expires after `ttl` (SETEX).
    async fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;

    /// Deletes a key of any type (DEL).
    async fn delete(&self, key: &str) -> Result<()>;

    /// Sets a value with a millisecond expiry only if the key does not exist
    /// (SET NX PX). Returns true if the value was written.
    async fn set_nx_px(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool>;

    /// Deletes `key` only while it still holds `value`, atomically.
    /// Returns true if the key was deleted.
    async fn delete_if_equals(&self, key: &str, value: &[u8]) -> Result<bool>;

    /// Appends to the tail of a list and returns the new length (RPUSH).
    async fn rpush(&self, key: &str, value: &[u8]) -> Result<u64>;

    /// Returns the length of a list, 0 if it does not exist (LLEN).
    async fn llen(&self, key: &str) -> Result<u64>;

    /// Returns the elements in `[start, stop]` (LRANGE).
    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Vec<u8>>>;

    /// Keeps only the elements in `[start, stop]` (LTRIM).
    async fn ltrim(&self, key: &str, start: i64, stop: i64) -> Result<()>;
}
