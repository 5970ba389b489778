//! Key-value store backends.
//!
//! This module provides concrete implementations of the
//! `usercache_core::cache::KeyValueStore` trait.
//!
//! # Feature Flags
//!
//! - `redis`: Redis backend using the redis crate (shared across instances)
//!
//! When several instances share one Redis, each runs its own flush loop.
//! Cycles are serialized across instances by a lease under
//! `users:pending:lease`, taken with `set_nx_px`.
//!
//! The in-process [`MemoryStore`] is always compiled; it is the backend of
//! single-instance builds and the test double everywhere else.

pub mod memory;

#[cfg(feature = "redis")]
pub mod redis_impl;

pub use memory::MemoryStore;

#[cfg(feature = "redis")]
pub use redis_impl::RedisStore;
