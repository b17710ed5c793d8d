//! Storage substrates the lock strategies are written against.
//!
//! Two contracts, one per concurrency-control primitive:
//!
//! - [`ConditionalStore`]: atomic check-and-mutate on a single row.
//! - [`TransactionalStore`]: serializable read-write transactions.
//!
//! Each comes with an in-memory implementation that honours the contract.

mod error;
mod in_memory_row;
mod in_memory_txn;
mod row;
mod transaction;

pub use error::StoreError;
pub use in_memory_row::InMemoryRowStore;
pub use in_memory_txn::{InMemoryTxnStore, DEFAULT_MAX_ATTEMPTS};
pub use row::{ConditionalStore, Mutation, Row, RowFilter};
pub use transaction::{LeaseRow, Transaction, TransactionalStore};
