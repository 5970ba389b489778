//! User service facade used by the HTTP handlers.

use std::sync::Arc;
use std::time::Duration;

use usercache_core::storage::UserRepository;
use usercache_core::users::{parse_user_id, validate_name, User};

use super::deadline::bounded;
use super::error::{Result, ServiceError};
use super::read_cache::ReadCache;
use super::write_buffer::WriteBuffer;

/// Routes reads through the cache, new users through the write buffer and
/// updates or deletes straight to the relational store.
pub struct UserService {
    repository: Arc<dyn UserRepository>,
    read_cache: Arc<ReadCache>,
    write_buffer: WriteBuffer,
    timeout: Duration,
}

impl UserService {
    pub fn new(
        repository: Arc<dyn UserRepository>,
        read_cache: Arc<ReadCache>,
        write_buffer: WriteBuffer,
        timeout: Duration,
    ) -> Self {
        Self {
            repository,
            read_cache,
            write_buffer,
            timeout,
        }
    }

    /// Every committed user, served cache-aside.
    pub async fn get_all(&self) -> Result<Vec<User>> {
        self.read_cache.get_all().await
    }

    /// Buffers a new user. It becomes visible after the next flush.
    pub async fn insert_new(&self, name: &str) -> Result<User> {
        self.write_buffer.enqueue(name).await
    }

    /// Deletes a committed user. Returns true iff exactly one row went away.
    pub async fn delete_by_id(&self, id: &str) -> Result<bool> {
        let id = parse_user_id(id)?;

        let affected = bounded(
            "delete user",
            self.timeout,
            self.repository.delete(id),
            ServiceError::Store,
        )
        .await?;

        if affected > 0 {
            self.read_cache.invalidate().await?;
        }

        tracing::debug!(user_id = id, affected, "Deleted user");
        Ok(affected == 1)
    }

    /// Renames a committed user. Returns true iff exactly one row changed.
    pub async fn update_name_by_id(&self, id: &str, name: &str) -> Result<bool> {
        let id = parse_user_id(id)?;
        validate_name(name)?;

        let affected = bounded(
            "update user name",
            self.timeout,
            self.repository.update_name(id, name),
            ServiceError::Store,
        )
        .await?;

        if affected > 0 {
            self.read_cache.invalidate().await?;
        }

        tracing::debug!(user_id = id, affected, "Updated user name");
        Ok(affected == 1)
    }

    /// Committed users whose name matches exactly. Not cached.
    pub async fn search_by_name(&self, name: &str) -> Result<Vec<User>> {
        bounded(
            "find users by name",
            self.timeout,
            self.repository.find_by_name(name),
            ServiceError::Store,
        )
        .await
    }

    /// A single committed user. Not cached.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<User>> {
        let id = parse_user_id(id)?;
        bounded(
            "find user by id",
            self.timeout,
            self.repository.find_by_id(id),
            ServiceError::Store,
        )
        .await
    }

    /// Number of buffered users not yet flushed.
    pub async fn pending_count(&self) -> Result<u64> {
        self.write_buffer.pending_len().await
    }
}
