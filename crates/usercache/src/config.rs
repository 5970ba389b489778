use std::{env, time::Duration};

use usercache_core::cache::DEFAULT_CACHE_TTL;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// TTL of the full-collection snapshot in seconds (default: 3600)
    pub cache_ttl_seconds: u64,
    /// Maximum number of values in the in-process store (default: 10,000)
    pub cache_max_entries: usize,
    /// Seconds between write-behind flush cycles (default: 60)
    pub flush_interval_seconds: u64,
    /// Per-call deadline for key-value and relational operations (default: 5,000)
    pub store_timeout_ms: u64,
    /// Run one last flush cycle when the scheduler stops (default: true)
    pub flush_on_shutdown: bool,
    /// Path to SQLite database file (default: "usercache.db")
    /// Note: Only used when the `sqlite` feature is enabled.
    #[allow(dead_code)]
    pub sqlite_path: String,
    /// Redis connection URL (default: "redis://localhost:6379")
    /// Note: Only used when the `redis` feature is enabled.
    #[allow(dead_code)]
    pub redis_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CACHE_TTL_SECONDS` - Snapshot TTL in seconds (default: 3600)
    /// - `CACHE_MAX_ENTRIES` - Maximum in-process values (default: 10,000)
    /// - `FLUSH_INTERVAL_SECONDS` - Flush period in seconds (default: 60)
    /// - `STORE_TIMEOUT_MS` - Store call deadline in milliseconds (default: 5,000)
    /// - `FLUSH_ON_SHUTDOWN` - Drain the queue once on shutdown (default: true;
    ///   accepts true/false, 1/0, yes/no, on/off)
    /// - `SQLITE_PATH` - SQLite database path (default: "usercache.db")
    /// - `REDIS_URL` - Redis connection URL (default: "redis://localhost:6379")
    pub fn from_env() -> Self {
        Self {
            cache_ttl_seconds: parse_var("CACHE_TTL_SECONDS").unwrap_or(DEFAULT_CACHE_TTL.as_secs()),
            cache_max_entries: parse_var("CACHE_MAX_ENTRIES").unwrap_or(10_000),
            flush_interval_seconds: parse_var("FLUSH_INTERVAL_SECONDS")
                .filter(|secs| *secs > 0)
                .unwrap_or(60),
            store_timeout_ms: parse_var("STORE_TIMEOUT_MS")
                .filter(|ms| *ms > 0)
                .unwrap_or(5_000),
            flush_on_shutdown: parse_flag_var("FLUSH_ON_SHUTDOWN").unwrap_or(true),
            sqlite_path: env::var("SQLITE_PATH").unwrap_or_else(|_| "usercache.db".to_string()),
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
        }
    }

    /// Get the snapshot TTL as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    /// Get the flush period as a Duration.
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_seconds)
    }

    /// Get the store call deadline as a Duration.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Reads and parses `name`. Unparseable values are logged and ignored so the
/// caller's default applies.
fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|raw| parse_value(name, &raw))
}

fn parse_flag_var(name: &str) -> Option<bool> {
    env::var(name).ok().and_then(|raw| parse_flag(name, &raw))
}

fn parse_value<T: std::str::FromStr>(name: &str, raw: &str) -> Option<T> {
    let parsed = raw.trim().parse().ok();
    if parsed.is_none() {
        tracing::warn!(variable = name, value = raw, "Ignoring unparseable setting, using default");
    }
    parsed
}

fn parse_flag(name: &str, raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!(variable = name, value = raw, "Ignoring unparseable flag, using default");
            None
        }
    }
}
