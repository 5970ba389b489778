//! Functional core for usercache.
//!
//! Pure data types, validation, cache keys and serialization, plus the
//! traits that the I/O backends in the `usercache` crate implement.

pub mod cache;
pub mod flush;
pub mod storage;
pub mod users;
