//! Read and write paths for users.
//!
//! - [`ReadCache`]: cache-aside snapshot of the full collection
//! - [`WriteBuffer`]: appends new users to the pending list
//! - [`FlushScheduler`]: periodically commits the pending list
//! - [`UserService`]: the facade the HTTP handlers talk to

mod deadline;
mod error;
mod flush;
mod read_cache;
mod users;
mod write_buffer;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Result, ServiceError};
pub use flush::{FlushHandle, FlushOutcome, FlushScheduler};
pub use read_cache::ReadCache;
pub use users::UserService;
pub use write_buffer::WriteBuffer;
