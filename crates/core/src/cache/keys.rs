//! Fixed key names shared by every component that touches the key-value store.

use std::time::Duration;

/// Key holding the serialized snapshot of every committed user.
pub const USERS_ALL_KEY: &str = "users:all";

/// Key of the list of users waiting to be flushed to the relational store.
pub const USERS_PENDING_KEY: &str = "users:pending";

/// Key of the list that receives pending entries which could not be decoded.
pub const USERS_DEAD_KEY: &str = "users:pending:dead";

/// Key of the lease held by whichever process is running a flush cycle.
pub const FLUSH_LEASE_KEY: &str = "users:pending:lease";

/// Default lifetime of the full-collection snapshot.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);
