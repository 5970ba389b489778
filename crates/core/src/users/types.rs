use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user, either buffered in the pending queue or committed to the store.
///
/// `id` is assigned by the relational store and is only present once the
/// row has been committed. `external_id` is assigned when the user is first
/// buffered and never changes, so clients can hold on to it immediately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub external_id: Uuid,
    pub name: String,
    pub date_added: DateTime<Utc>,
}

impl User {
    /// Creates a not-yet-committed user with a fresh external ID and the
    /// current timestamp.
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            id: None,
            external_id: Uuid::new_v4(),
            name: name.into(),
            date_added: Utc::now(),
        }
    }

    /// Sets the store-assigned ID.
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets a specific external ID (useful for testing).
    pub fn with_external_id(mut self, external_id: Uuid) -> Self {
        self.external_id = external_id;
        self
    }

    /// Sets a specific creation timestamp (useful for testing).
    pub fn with_date_added(mut self, date_added: DateTime<Utc>) -> Self {
        self.date_added = date_added;
        self
    }

    /// Returns true once the relational store has assigned an ID.
    pub fn is_committed(&self) -> bool {
        self.id.is_some()
    }

    /// Projects the columns written by a bulk insert.
    pub fn to_new_user(&self) -> NewUser {
        NewUser {
            external_id: self.external_id,
            name: self.name.clone(),
            date_added: self.date_added,
        }
    }
}

/// Row values for a user about to be inserted. The store assigns the ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub external_id: Uuid,
    pub name: String,
    pub date_added: DateTime<Utc>,
}

impl NewUser {
    /// Materializes the committed user once the store has assigned `id`.
    pub fn into_user(self, id: i64) -> User {
        User {
            id: Some(id),
            external_id: self.external_id,
            name: self.name,
            date_added: self.date_added,
        }
    }
}
