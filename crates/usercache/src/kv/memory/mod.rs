//! In-process key-value store.
//!
//! Used for single-instance deployments and as the test double for every
//! component that talks to the key-value store.

mod store;

pub use store::MemoryStore;
