//! Redis implementation of the key-value primitives.
//!
//! Each trait method is a single Redis command, so the producer (RPUSH) and
//! the consumer (LLEN, LRANGE, LTRIM) interleave at command granularity.
//! The flush protocol only ever trims a prefix whose length it read first,
//! which keeps concurrent appends safe without MULTI/EXEC.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;

use usercache_core::cache::{KeyValueStore, Result};

use super::error::map_redis_error;

/// Deletes KEYS[1] only while it holds ARGV[1].
const DELETE_IF_EQUALS: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
end
return 0
"#;

/// Redis backend using a connection manager for reconnects and pooling.
#[derive(Clone)]
pub struct RedisStore {
    conn: redis::aio::ConnectionManager,
}

impl RedisStore {
    /// Creates a new Redis connection.
    ///
    /// # Arguments
    ///
    /// * `url` - Redis connection URL (e.g., "redis://localhost:6379")
    ///
    /// # Errors
    ///
    /// Returns `CacheError::ConnectionFailed` if the connection cannot be established.
    pub async fn new(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(map_redis_error)?;
        let conn = redis::aio::ConnectionManager::new(client)
            .await
            .map_err(map_redis_error)?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let result: Option<Vec<u8>> = conn.get(key).await.map_err(map_redis_error)?;
        Ok(result)
    }

    async fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds)
            .await
            .map_err(map_redis_error)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await.map_err(map_redis_error)
    }

    async fn set_nx_px(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool> {
        let mut conn = self.conn.clone();
        let millis = (ttl.as_millis() as u64).max(1);
        // Replies OK when set and nil when the key already exists.
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(millis)
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        Ok(reply.is_some())
    }

    async fn delete_if_equals(&self, key: &str, value: &[u8]) -> Result<bool> {
        let mut conn = self.conn.clone();
        let deleted: u64 = redis::Script::new(DELETE_IF_EQUALS)
            .key(key)
            .arg(value)
            .invoke_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        Ok(deleted == 1)
    }

    async fn rpush(&self, key: &str, value: &[u8]) -> Result<u64> {
        let mut conn = self.conn.clone();
        conn.rpush::<_, _, u64>(key, value)
            .await
            .map_err(map_redis_error)
    }

    async fn llen(&self, key: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        conn.llen::<_, u64>(key).await.map_err(map_redis_error)
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Vec<u8>>> {
        let mut conn = self.conn.clone();
        conn.lrange::<_, Vec<Vec<u8>>>(key, start as isize, stop as isize)
            .await
            .map_err(map_redis_error)
    }

    async fn ltrim(&self, key: &str, start: i64, stop: i64) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.ltrim::<_, ()>(key, start as isize, stop as isize)
            .await
            .map_err(map_redis_error)
    }
}
