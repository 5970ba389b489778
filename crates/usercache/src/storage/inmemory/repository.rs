//! In-memory repository implementation.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use usercache_core::storage::{Result, UserRepository};
use usercache_core::users::{NewUser, User};

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<i64, User>,
    external_ids: HashSet<Uuid>,
    last_id: i64,
}

/// In-memory storage backend.
///
/// Mirrors the SQLite backend's observable behavior: monotonically
/// increasing IDs that are never reused, rows ordered by ID, and batches
/// that silently skip already-stored external IDs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    table: Arc<RwLock<Table>>,
}

impl InMemoryRepository {
    /// Creates a new empty in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn find_all(&self) -> Result<Vec<User>> {
        let table = self.table.read().await;
        Ok(table.rows.values().cloned().collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let table = self.table.read().await;
        Ok(table.rows.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Vec<User>> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .filter(|user| user.name == name)
            .cloned()
            .collect())
    }

    async fn update_name(&self, id: i64, name: &str) -> Result<u64> {
        let mut table = self.table.write().await;
        match table.rows.get_mut(&id) {
            Some(user) => {
                user.name = name.to_string();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, id: i64) -> Result<u64> {
        let mut table = self.table.write().await;
        match table.rows.remove(&id) {
            Some(user) => {
                table.external_ids.remove(&user.external_id);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn insert_batch(&self, rows: &[NewUser]) -> Result<u64> {
        let mut table = self.table.write().await;
        let mut inserted = 0;

        for row in rows {
            if !table.external_ids.insert(row.external_id) {
                continue;
            }
            table.last_id += 1;
            let id = table.last_id;
            table.rows.insert(id, row.clone().into_user(id));
            inserted += 1;
        }

        Ok(inserted)
    }
}
