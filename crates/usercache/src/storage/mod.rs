//! Relational storage backends.
//!
//! This module provides concrete implementations of the
//! `usercache_core::storage::UserRepository` trait.
//!
//! # Feature Flags
//!
//! - `sqlite` (default): SQLite storage backend using `rusqlite` and `tokio-rusqlite`
//!
//! Without `sqlite` the binary falls back to [`InMemoryRepository`], which
//! is always compiled because the service tests depend on it.
//!
//! # Examples
//!
//! Build with SQLite (default):
//! ```bash
//! cargo build -p usercache
//! ```
//!
//! Build with the in-memory repository:
//! ```bash
//! cargo build -p usercache --no-default-features
//! ```

pub mod inmemory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use inmemory::InMemoryRepository;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteRepository;
