use async_trait::async_trait;

use crate::users::{NewUser, User};

use super::Result;

/// Relational store for the users table.
///
/// Every implementation must bind values as statement parameters; callers
/// pass untrusted input straight through.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Returns every committed user, ordered by ID.
    async fn find_all(&self) -> Result<Vec<User>>;

    /// Gets a user by store-assigned ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Returns users whose name matches exactly.
    async fn find_by_name(&self, name: &str) -> Result<Vec<User>>;

    /// Renames a user and returns the number of affected rows.
    async fn update_name(&self, id: i64, name: &str) -> Result<u64>;

    /// Deletes a user and returns the number of affected rows.
    async fn delete(&self, id: i64) -> Result<u64>;

    /// Inserts all rows atomically and returns how many were written.
    ///
    /// Rows whose `external_id` is already stored are skipped rather than
    /// failing the batch, so redelivering a batch is harmless.
    async fn insert_batch(&self, rows: &[NewUser]) -> Result<u64>;
}
