//! Lease-based distributed mutual-exclusion locks.
//!
//! Clients acquire, refresh and release named locks held in a shared store.
//! One protocol ([`LockBackend`]) is implemented by two concurrency-control
//! strategies:
//!
//! - [`CasBackend`] for stores that only offer single-row conditional writes,
//! - [`TransactionalBackend`] for stores with serializable transactions.
//!
//! Blocking acquisition is written once on top of `try_lock`
//! (see [`lock::blocking`]), and [`LockService`] fronts a backend for the
//! gRPC and HTTP transports.

pub mod backends;
pub mod config;
pub mod lock;
pub mod service;
pub mod store;

pub use backends::{CasBackend, TransactionalBackend};
pub use config::{BackendKind, Config, ConfigError};
pub use lock::{CancelToken, Lock, LockBackend, LockError, PollPolicy};
pub use service::LockService;
pub use store::{ConditionalStore, InMemoryRowStore, InMemoryTxnStore, StoreError, TransactionalStore};
