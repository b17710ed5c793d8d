use std::time::SystemTime;

use super::StoreError;

/// A lease row as a transactional store keeps it, keyed by lock id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseRow {
    pub owner: String,
    pub expires_at: SystemTime,
}

/// Handle for one read-write transaction.
///
/// Reads observe committed state. Writes are buffered and become visible to
/// others only when the enclosing [`TransactionalStore::read_write`] closure
/// returns `Ok` and the commit succeeds.
pub trait Transaction {
    fn read(&mut self, id: &str) -> Result<Option<LeaseRow>, StoreError>;

    fn upsert(&mut self, id: &str, row: LeaseRow);

    fn delete(&mut self, id: &str);
}

/// A store offering serializable read-write transactions.
///
/// `read_write` runs `f` inside a transaction. If `f` returns `Err`, nothing
/// is written and the error is returned unchanged. If `f` returns `Ok` but the
/// commit conflicts with a concurrent commit, the store runs `f` again from
/// scratch; `f` must therefore be safe to re-run. When the store gives up it
/// returns [`StoreError::Aborted`].
pub trait TransactionalStore: Send + Sync {
    fn read_write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnMut(&mut dyn Transaction) -> Result<T, E>,
        E: From<StoreError>;
}
