//! Test doubles shared by the service tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use usercache_core::cache::{CacheError, KeyValueStore, Result as CacheResult};
use usercache_core::storage::{RepositoryError, Result, UserRepository};
use usercache_core::users::{NewUser, User};

use crate::kv::MemoryStore;
use crate::storage::InMemoryRepository;

/// Pauses `insert_batch` until the test releases it.
#[derive(Default)]
pub struct InsertGate {
    pub entered: Notify,
    pub release: Notify,
}

/// Repository that counts calls and can be told to fail or stall.
#[derive(Default)]
pub struct MockRepository {
    inner: InMemoryRepository,
    pub find_all_calls: AtomicUsize,
    pub insert_calls: AtomicUsize,
    pub fail_queries: AtomicBool,
    pub fail_inserts: AtomicBool,
    insert_delay: Option<Duration>,
    gate: Option<Arc<InsertGate>>,
}

impl MockRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `insert_batch` sleeps for `delay` before writing.
    pub fn with_insert_delay(mut self, delay: Duration) -> Self {
        self.insert_delay = Some(delay);
        self
    }

    /// Every `insert_batch` waits on `gate` before writing.
    pub fn with_gate(mut self, gate: Arc<InsertGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Inserts rows directly, bypassing counters and failure switches.
    pub async fn seed(&self, names: &[&str]) {
        let rows: Vec<NewUser> = names
            .iter()
            .map(|name| User::pending(*name).to_new_user())
            .collect();
        self.inner.insert_batch(&rows).await.unwrap();
    }

    pub fn find_all_count(&self) -> usize {
        self.find_all_calls.load(Ordering::SeqCst)
    }

    pub fn insert_count(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    fn check(&self, flag: &AtomicBool) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            Err(RepositoryError::ConnectionFailed("injected failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UserRepository for MockRepository {
    async fn find_all(&self) -> Result<Vec<User>> {
        self.find_all_calls.fetch_add(1, Ordering::SeqCst);
        self.check(&self.fail_queries)?;
        self.inner.find_all().await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        self.check(&self.fail_queries)?;
        self.inner.find_by_id(id).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Vec<User>> {
        self.check(&self.fail_queries)?;
        self.inner.find_by_name(name).await
    }

    async fn update_name(&self, id: i64, name: &str) -> Result<u64> {
        self.check(&self.fail_queries)?;
        self.inner.update_name(id, name).await
    }

    async fn delete(&self, id: i64) -> Result<u64> {
        self.check(&self.fail_queries)?;
        self.inner.delete(id).await
    }

    async fn insert_batch(&self, rows: &[NewUser]) -> Result<u64> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        if let Some(delay) = self.insert_delay {
            tokio::time::sleep(delay).await;
        }
        self.check(&self.fail_inserts)?;
        self.inner.insert_batch(rows).await
    }
}

/// Key-value store that counts snapshot reads and can fail on demand.
///
/// Clones made with [`MockStore::sharing`] see the same data, like two
/// processes talking to one Redis.
#[derive(Default)]
pub struct MockStore {
    inner: MemoryStore,
    pub get_calls: AtomicUsize,
    pub fail_reads: AtomicBool,
    pub fail_deletes: AtomicBool,
    pub fail_appends: AtomicBool,
    pub fail_trims: AtomicBool,
    list_read_delay: Option<Duration>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A second handle onto this store's data with its own switches.
    pub fn sharing(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            ..Self::default()
        }
    }

    /// Every LRANGE sleeps for `delay` before reading.
    pub fn with_list_read_delay(mut self, delay: Duration) -> Self {
        self.list_read_delay = Some(delay);
        self
    }

    fn check(&self, flag: &AtomicBool) -> CacheResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(CacheError::ConnectionFailed("injected failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl KeyValueStore for MockStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.check(&self.fail_reads)?;
        self.inner.get(key).await
    }

    async fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        self.inner.set_ex(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.check(&self.fail_deletes)?;
        self.inner.delete(key).await
    }

    async fn set_nx_px(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<bool> {
        self.inner.set_nx_px(key, value, ttl).await
    }

    async fn delete_if_equals(&self, key: &str, value: &[u8]) -> CacheResult<bool> {
        self.inner.delete_if_equals(key, value).await
    }

    async fn rpush(&self, key: &str, value: &[u8]) -> CacheResult<u64> {
        self.check(&self.fail_appends)?;
        self.inner.rpush(key, value).await
    }

    async fn llen(&self, key: &str) -> CacheResult<u64> {
        self.inner.llen(key).await
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> CacheResult<Vec<Vec<u8>>> {
        if let Some(delay) = self.list_read_delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.lrange(key, start, stop).await
    }

    async fn ltrim(&self, key: &str, start: i64, stop: i64) -> CacheResult<()> {
        self.check(&self.fail_trims)?;
        self.inner.ltrim(key, start, stop).await
    }
}
