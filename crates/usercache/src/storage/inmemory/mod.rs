//! In-memory storage backend.
//!
//! Used when the `sqlite` feature is disabled, and as the relational test
//! double for the service layer.

mod repository;

pub use repository::InMemoryRepository;
