//! Redis key-value backend.
//!
//! Shares one multiplexed connection manager across all components, so the
//! cache, the pending queue and the flush scheduler all see the same keys.

mod error;
mod store;

pub use store::RedisStore;
