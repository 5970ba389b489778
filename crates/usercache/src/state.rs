//! Application state shared by all request handlers.
//!
//! Backends are chosen at compile time:
//!
//! | Features          | Key-value store | Relational store      |
//! |-------------------|-----------------|-----------------------|
//! | `sqlite` (default)| `MemoryStore`   | `SqliteRepository`    |
//! | `sqlite,redis`    | `RedisStore`    | `SqliteRepository`    |
//! | none              | `MemoryStore`   | `InMemoryRepository`  |
//! | `redis`           | `RedisStore`    | `InMemoryRepository`  |

use std::sync::Arc;

use usercache_core::cache::KeyValueStore;
use usercache_core::storage::UserRepository;

use crate::config::Config;
use crate::service::{FlushScheduler, ReadCache, UserService, WriteBuffer};

/// Shared application state.
///
/// Cloned for each request handler; everything inside is reference counted.
#[derive(Clone)]
pub struct AppState {
    /// Read and write paths for users.
    pub users: Arc<UserService>,
    /// Write-behind flusher, also triggerable on demand.
    pub flusher: Arc<FlushScheduler>,
}

impl AppState {
    /// Wires the services on top of the given backends.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        repository: Arc<dyn UserRepository>,
        config: &Config,
    ) -> Self {
        let timeout = config.store_timeout();

        let read_cache = Arc::new(ReadCache::new(
            repository.clone(),
            store.clone(),
            config.cache_ttl(),
            timeout,
        ));
        let write_buffer = WriteBuffer::new(store.clone(), timeout);

        let flusher = Arc::new(FlushScheduler::new(
            store,
            repository.clone(),
            read_cache.clone(),
            config.flush_interval(),
            timeout,
            config.flush_on_shutdown,
        ));
        let users = Arc::new(UserService::new(
            repository,
            read_cache,
            write_buffer,
            timeout,
        ));

        Self { users, flusher }
    }

    /// Connects the backends enabled at compile time.
    pub async fn from_config(config: &Config) -> Result<Self, anyhow::Error> {
        let store = open_store(config).await?;
        let repository = open_repository(config).await?;
        Ok(Self::new(store, repository, config))
    }

    /// State backed entirely by in-process stores.
    pub fn in_memory(config: &Config) -> Self {
        Self::new(
            Arc::new(crate::kv::MemoryStore::new(config.cache_max_entries)),
            Arc::new(crate::storage::InMemoryRepository::new()),
            config,
        )
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::in_memory(&Config::default())
    }
}

#[cfg(feature = "redis")]
async fn open_store(config: &Config) -> Result<Arc<dyn KeyValueStore>, anyhow::Error> {
    let store = crate::kv::RedisStore::new(&config.redis_url).await?;
    tracing::info!(url = %config.redis_url, "Using Redis key-value store");
    Ok(Arc::new(store))
}

#[cfg(not(feature = "redis"))]
async fn open_store(config: &Config) -> Result<Arc<dyn KeyValueStore>, anyhow::Error> {
    tracing::info!(
        max_entries = config.cache_max_entries,
        "Using in-process key-value store"
    );
    Ok(Arc::new(crate::kv::MemoryStore::new(config.cache_max_entries)))
}

#[cfg(feature = "sqlite")]
async fn open_repository(config: &Config) -> Result<Arc<dyn UserRepository>, anyhow::Error> {
    let repository = crate::storage::SqliteRepository::new(&config.sqlite_path).await?;
    tracing::info!(path = %config.sqlite_path, "Using SQLite user store");
    Ok(Arc::new(repository))
}

#[cfg(not(feature = "sqlite"))]
async fn open_repository(_config: &Config) -> Result<Arc<dyn UserRepository>, anyhow::Error> {
    tracing::info!("Using in-memory user store");
    Ok(Arc::new(crate::storage::InMemoryRepository::new()))
}
