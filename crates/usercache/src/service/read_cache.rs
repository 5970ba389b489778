//! Cache-aside read path for the full user collection.

use std::sync::Arc;
use std::time::Duration;

use usercache_core::cache::{deserialize_users, serialize_users, KeyValueStore, USERS_ALL_KEY};
use usercache_core::storage::UserRepository;
use usercache_core::users::User;

use super::deadline::bounded;
use super::error::{Result, ServiceError};

/// Serves the full user list from a cached snapshot, falling back to the
/// relational store on a miss.
///
/// - **Hit**: the snapshot under `users:all` is returned without touching
///   the store.
/// - **Miss**: the store is queried, the result is written back with the
///   configured TTL and returned.
///
/// A cache that is unreachable or holds an undecodable value is treated as
/// a miss. A store failure on a miss propagates and leaves the cache alone.
pub struct ReadCache {
    repository: Arc<dyn UserRepository>,
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
    timeout: Duration,
}

impl ReadCache {
    pub fn new(
        repository: Arc<dyn UserRepository>,
        store: Arc<dyn KeyValueStore>,
        ttl: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            repository,
            store,
            ttl,
            timeout,
        }
    }

    /// Returns every committed user, ordered by ID.
    pub async fn get_all(&self) -> Result<Vec<User>> {
        match bounded(
            "read users snapshot",
            self.timeout,
            self.store.get(USERS_ALL_KEY),
            ServiceError::Cache,
        )
        .await
        {
            Ok(Some(bytes)) => match deserialize_users(&bytes) {
                Ok(users) => {
                    tracing::trace!(count = users.len(), "Cache hit for users");
                    return Ok(users);
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Users snapshot deserialization failed");
                }
            },
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(error = %err, "Users snapshot read failed, querying store");
            }
        }

        tracing::trace!("Cache miss for users");
        let users = bounded(
            "find all users",
            self.timeout,
            self.repository.find_all(),
            ServiceError::Store,
        )
        .await?;

        match serialize_users(&users) {
            Ok(bytes) => {
                if let Err(err) = bounded(
                    "write users snapshot",
                    self.timeout,
                    self.store.set_ex(USERS_ALL_KEY, &bytes, self.ttl),
                    ServiceError::Cache,
                )
                .await
                {
                    tracing::warn!(error = %err, "Failed to cache users snapshot");
                }
            }
            Err(err) => tracing::warn!(error = %err, "Failed to serialize users snapshot"),
        }

        Ok(users)
    }

    /// Drops the cached snapshot so the next read goes to the store.
    pub async fn invalidate(&self) -> Result<()> {
        bounded(
            "invalidate users snapshot",
            self.timeout,
            self.store.delete(USERS_ALL_KEY),
            ServiceError::Cache,
        )
        .await?;
        tracing::trace!("Invalidated users snapshot");
        Ok(())
    }
}
