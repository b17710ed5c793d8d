//! Concurrency-control strategies implementing [`LockBackend`](crate::LockBackend).

mod cas;
mod transactional;

pub use cas::{CasBackend, COLUMN_ETAG, COLUMN_EXPIRES, COLUMN_OWNER};
pub use transactional::TransactionalBackend;
