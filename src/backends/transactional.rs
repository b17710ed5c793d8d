//! Lock strategy for stores with serializable read-write transactions.
//!
//! Every operation is one read-decide-write transaction on the lease row.
//! The store's isolation guarantees that two concurrent acquirers cannot
//! both observe "absent or expired" and both commit, so no version tag is
//! stored.

use std::time::SystemTime;

use tracing::debug;

use crate::lock::{is_expired, Lock, LockBackend, LockError};
use crate::store::{LeaseRow, TransactionalStore};

/// [`LockBackend`] over any [`TransactionalStore`].
pub struct TransactionalBackend<S> {
    store: S,
}

impl<S: TransactionalStore> TransactionalBackend<S> {
    pub fn new(store: S) -> Self {
        TransactionalBackend { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

fn lease_row(lock: &Lock) -> LeaseRow {
    LeaseRow {
        owner: lock.owner.clone(),
        expires_at: lock.expires_at,
    }
}

impl<S: TransactionalStore> LockBackend for TransactionalBackend<S> {
    fn try_lock(&self, lock: &Lock) -> Result<(), LockError> {
        self.store.read_write(|txn| -> Result<(), LockError> {
            match txn.read(&lock.id)? {
                Some(current) if !is_expired(current.expires_at, SystemTime::now()) => {
                    Err(LockError::Busy)
                }
                _ => {
                    txn.upsert(&lock.id, lease_row(lock));
                    Ok(())
                }
            }
        })?;

        debug!(id = %lock.id, owner = %lock.owner, "lock acquired");
        Ok(())
    }

    fn refresh(&self, lock: &Lock) -> Result<(), LockError> {
        self.store.read_write(|txn| -> Result<(), LockError> {
            let current = txn.read(&lock.id)?.ok_or(LockError::NotFound)?;
            if current.owner != lock.owner {
                return Err(LockError::InvalidOwner);
            }
            if lock.expires_at <= current.expires_at {
                return Err(LockError::InvalidRefresh);
            }
            txn.upsert(&lock.id, lease_row(lock));
            Ok(())
        })?;

        debug!(id = %lock.id, owner = %lock.owner, "lock refreshed");
        Ok(())
    }

    fn release(&self, lock: &Lock) -> Result<(), LockError> {
        let released = self.store.read_write(|txn| -> Result<bool, LockError> {
            let Some(current) = txn.read(&lock.id)? else {
                return Ok(false);
            };
            if current.owner != lock.owner {
                return Err(LockError::InvalidOwner);
            }
            txn.delete(&lock.id);
            Ok(true)
        })?;

        if released {
            debug!(id = %lock.id, owner = %lock.owner, "lock released");
        }
        Ok(())
    }
}
