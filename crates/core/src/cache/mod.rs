mod error;
mod keys;
mod ranges;
mod serialization;
mod traits;

pub use error::{CacheError, Result};
pub use keys::{
    DEFAULT_CACHE_TTL, FLUSH_LEASE_KEY, USERS_ALL_KEY, USERS_DEAD_KEY, USERS_PENDING_KEY,
};
pub use ranges::resolve_range;
pub use serialization::{
    deserialize_user, deserialize_users, serialize_user, serialize_users, SerializationError,
};
pub use traits::KeyValueStore;
