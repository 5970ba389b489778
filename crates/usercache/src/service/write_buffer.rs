//! Write-behind buffer for new users.

use std::sync::Arc;
use std::time::Duration;

use usercache_core::cache::{serialize_user, KeyValueStore, USERS_PENDING_KEY};
use usercache_core::users::{validate_name, User};

use super::deadline::bounded;
use super::error::{Result, ServiceError};

/// Appends new users to the pending list instead of writing them to the
/// relational store. The flush scheduler drains the list later.
pub struct WriteBuffer {
    store: Arc<dyn KeyValueStore>,
    timeout: Duration,
}

impl WriteBuffer {
    pub fn new(store: Arc<dyn KeyValueStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Buffers a new user and returns it as accepted.
    ///
    /// The returned user carries its external ID and timestamp but no store
    /// ID, and does not show up in reads until a flush commits it.
    pub async fn enqueue(&self, name: &str) -> Result<User> {
        validate_name(name)?;

        let user = User::pending(name);
        let bytes = serialize_user(&user)?;

        let len = bounded(
            "append pending user",
            self.timeout,
            self.store.rpush(USERS_PENDING_KEY, &bytes),
            ServiceError::Queue,
        )
        .await?;

        tracing::debug!(
            external_id = %user.external_id,
            pending = len,
            "Buffered new user"
        );
        Ok(user)
    }

    /// Number of users waiting for the next flush.
    pub async fn pending_len(&self) -> Result<u64> {
        bounded(
            "read pending length",
            self.timeout,
            self.store.llen(USERS_PENDING_KEY),
            ServiceError::Queue,
        )
        .await
    }
}
