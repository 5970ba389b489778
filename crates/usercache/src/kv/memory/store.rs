//! In-process key-value store with LRU eviction and Redis-style lists.
//!
//! Plain values live in an LRU with lazy TTL expiry, like a single-node
//! cache. Lists and leases are kept apart from the LRU so pending writes
//! and held locks are never evicted to make room for cached snapshots.

use std::collections::{HashMap, VecDeque};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::RwLock;

use usercache_core::cache::{resolve_range, CacheError, KeyValueStore, Result};

/// A single stored value with its expiration.
#[derive(Debug, Clone)]
struct ValueEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl ValueEntry {
    fn new(value: Vec<u8>, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

/// In-process implementation of [`KeyValueStore`].
///
/// Cloning is cheap and clones share state, so one store can be handed to
/// every component of a single-instance deployment.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    values: Arc<RwLock<LruCache<String, ValueEntry>>>,
    lists: Arc<RwLock<HashMap<String, VecDeque<Vec<u8>>>>>,
    leases: Arc<RwLock<HashMap<String, ValueEntry>>>,
}

impl MemoryStore {
    /// Creates a new store.
    ///
    /// # Arguments
    ///
    /// * `max_entries` - Maximum number of plain values before LRU eviction
    ///   kicks in. Lists are not bounded. A value of 0 is treated as 1.
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            values: Arc::new(RwLock::new(LruCache::new(capacity))),
            lists: Arc::new(RwLock::new(HashMap::new())),
            leases: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn wrong_type(key: &str, expected: &'static str) -> CacheError {
        CacheError::WrongType {
            key: key.to_string(),
            expected,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if self.lists.read().await.contains_key(key) {
            return Err(Self::wrong_type(key, "string"));
        }

        let mut values = self.values.write().await;
        match values.get(key) {
            Some(entry) if entry.is_expired() => {
                values.pop(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        // SETEX overwrites a key of any type.
        self.lists.write().await.remove(key);

        let mut values = self.values.write().await;
        values.put(key.to_string(), ValueEntry::new(value.to_vec(), ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.values.write().await.pop(key);
        self.lists.write().await.remove(key);
        self.leases.write().await.remove(key);
        Ok(())
    }

    async fn set_nx_px(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool> {
        // Hold the lease map for the whole check-and-set.
        let mut leases = self.leases.write().await;
        if leases.get(key).is_some_and(|entry| !entry.is_expired()) {
            return Ok(false);
        }
        if self.lists.read().await.contains_key(key) {
            return Ok(false);
        }
        if self
            .values
            .read()
            .await
            .peek(key)
            .is_some_and(|entry| !entry.is_expired())
        {
            return Ok(false);
        }

        leases.insert(key.to_string(), ValueEntry::new(value.to_vec(), ttl));
        Ok(true)
    }

    async fn delete_if_equals(&self, key: &str, value: &[u8]) -> Result<bool> {
        let mut leases = self.leases.write().await;
        match leases.get(key) {
            Some(entry) if !entry.is_expired() && entry.value == value => {
                leases.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn rpush(&self, key: &str, value: &[u8]) -> Result<u64> {
        if self.values.read().await.contains(key) {
            return Err(Self::wrong_type(key, "list"));
        }

        let mut lists = self.lists.write().await;
        let list = lists.entry(key.to_string()).or_default();
        list.push_back(value.to_vec());
        Ok(list.len() as u64)
    }

    async fn llen(&self, key: &str) -> Result<u64> {
        let lists = self.lists.read().await;
        Ok(lists.get(key).map_or(0, |list| list.len() as u64))
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Vec<u8>>> {
        let lists = self.lists.read().await;
        let Some(list) = lists.get(key) else {
            return Ok(Vec::new());
        };

        Ok(match resolve_range(list.len(), start, stop) {
            Some(range) => list.range(range).cloned().collect(),
            None => Vec::new(),
        })
    }

    async fn ltrim(&self, key: &str, start: i64, stop: i64) -> Result<()> {
        let mut lists = self.lists.write().await;
        let Some(list) = lists.get_mut(key) else {
            return Ok(());
        };

        match resolve_range(list.len(), start, stop) {
            Some(range) => {
                list.truncate(range.end);
                list.drain(..range.start);
            }
            None => list.clear(),
        }

        // Redis removes a key once its list is empty.
        if list.is_empty() {
            lists.remove(key);
        }
        Ok(())
    }
}
