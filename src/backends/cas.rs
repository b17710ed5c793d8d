//! Optimistic lock strategy for stores with single-row conditional writes.
//!
//! Each lock id is one row with three cells:
//!
//! | column    | value                                          |
//! |-----------|------------------------------------------------|
//! | `etag`    | UUID v4 text, regenerated on every write       |
//! | `owner`   | owner string                                   |
//! | `expires` | u64 big-endian milliseconds since Unix epoch   |
//!
//! Acquisition is insert-if-absent, falling back to read-then-CAS on the
//! `etag` when the stored lease has expired. The `etag` never leaves this
//! module.

use std::time::SystemTime;

use tracing::{debug, trace};
use uuid::Uuid;

use crate::lock::{from_unix_millis, is_expired, to_unix_millis, Lock, LockBackend, LockError};
use crate::store::{ConditionalStore, Mutation, Row, RowFilter, StoreError};

pub const COLUMN_ETAG: &str = "etag";
pub const COLUMN_OWNER: &str = "owner";
pub const COLUMN_EXPIRES: &str = "expires";

/// Bound on read-then-CAS rounds in `refresh` before reporting contention.
const MAX_REFRESH_ATTEMPTS: usize = 16;

/// The decoded cells of a lock row.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StoredLease {
    etag: Vec<u8>,
    owner: String,
    expires_ms: u64,
}

impl StoredLease {
    fn decode(key: &str, row: &Row) -> Result<Self, StoreError> {
        let corrupt = |reason: String| StoreError::Corrupt {
            key: key.to_string(),
            reason,
        };
        let cell = |column: &str| {
            row.get(column)
                .ok_or_else(|| corrupt(format!("missing {column} cell")))
        };

        let etag = cell(COLUMN_ETAG)?.clone();
        let owner = String::from_utf8(cell(COLUMN_OWNER)?.clone())
            .map_err(|e| corrupt(format!("owner is not utf-8: {e}")))?;
        let expires = cell(COLUMN_EXPIRES)?;
        let expires: [u8; 8] = expires
            .as_slice()
            .try_into()
            .map_err(|_| corrupt(format!("expires cell is {} bytes", expires.len())))?;

        Ok(StoredLease {
            etag,
            owner,
            expires_ms: u64::from_be_bytes(expires),
        })
    }

    fn is_expired_at(&self, now: SystemTime) -> bool {
        is_expired(from_unix_millis(self.expires_ms), now)
    }
}

/// The full set of cells for `lock`, under a freshly generated etag.
fn lease_mutations(lock: &Lock) -> Vec<Mutation> {
    vec![
        Mutation::set(COLUMN_ETAG, Uuid::new_v4().to_string()),
        Mutation::set(COLUMN_OWNER, lock.owner.as_str()),
        Mutation::set(COLUMN_EXPIRES, to_unix_millis(lock.expires_at).to_be_bytes().to_vec()),
    ]
}

/// [`LockBackend`] over any [`ConditionalStore`].
///
/// Holds no state besides the store handle. A lost compare-and-swap in
/// `try_lock` is reported as [`LockError::Busy`] and never retried here.
pub struct CasBackend<S> {
    store: S,
}

impl<S: ConditionalStore> CasBackend<S> {
    pub fn new(store: S) -> Self {
        CasBackend { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn read_lease(&self, id: &str) -> Result<Option<StoredLease>, StoreError> {
        self.store
            .read_row(id)?
            .map(|row| StoredLease::decode(id, &row))
            .transpose()
    }

    /// Write `lock` only if no row exists. Returns whether it was written.
    fn insert_if_absent(&self, lock: &Lock) -> Result<bool, StoreError> {
        let existed =
            self.store
                .check_and_mutate(&lock.id, &RowFilter::RowExists, &[], &lease_mutations(lock))?;
        Ok(!existed)
    }

    /// Write `lock` only if the row still carries `etag`.
    fn swap(&self, lock: &Lock, etag: &[u8]) -> Result<bool, StoreError> {
        let filter = RowFilter::column_equals(COLUMN_ETAG, etag);
        self.store
            .check_and_mutate(&lock.id, &filter, &lease_mutations(lock), &[])
    }
}

impl<S: ConditionalStore> LockBackend for CasBackend<S> {
    fn try_lock(&self, lock: &Lock) -> Result<(), LockError> {
        if self.insert_if_absent(lock)? {
            debug!(id = %lock.id, owner = %lock.owner, "lock created");
            return Ok(());
        }

        let Some(current) = self.read_lease(&lock.id)? else {
            // Released between our insert attempt and the read.
            return if self.insert_if_absent(lock)? {
                debug!(id = %lock.id, owner = %lock.owner, "lock created");
                Ok(())
            } else {
                Err(LockError::Busy)
            };
        };

        if !current.is_expired_at(SystemTime::now()) {
            return Err(LockError::Busy);
        }

        if self.swap(lock, &current.etag)? {
            debug!(
                id = %lock.id,
                owner = %lock.owner,
                previous_owner = %current.owner,
                "expired lock taken over"
            );
            Ok(())
        } else {
            trace!(id = %lock.id, owner = %lock.owner, "lost takeover race");
            Err(LockError::Busy)
        }
    }

    fn refresh(&self, lock: &Lock) -> Result<(), LockError> {
        let requested_ms = to_unix_millis(lock.expires_at);

        for attempt in 1..=MAX_REFRESH_ATTEMPTS {
            let current = self.read_lease(&lock.id)?.ok_or(LockError::NotFound)?;
            if current.owner != lock.owner {
                return Err(LockError::InvalidOwner);
            }
            if requested_ms <= current.expires_ms {
                return Err(LockError::InvalidRefresh);
            }
            if self.swap(lock, &current.etag)? {
                debug!(id = %lock.id, owner = %lock.owner, "lock refreshed");
                return Ok(());
            }
            trace!(id = %lock.id, attempt, "refresh raced a concurrent write");
        }

        Err(StoreError::Contention {
            attempts: MAX_REFRESH_ATTEMPTS,
        }
        .into())
    }

    fn release(&self, lock: &Lock) -> Result<(), LockError> {
        let Some(current) = self.read_lease(&lock.id)? else {
            return Ok(());
        };
        if current.owner != lock.owner {
            return Err(LockError::InvalidOwner);
        }

        // Re-check the owner at delete time: the lease may have expired and
        // been taken over since the read.
        let filter = RowFilter::column_equals(COLUMN_OWNER, lock.owner.as_str());
        if self
            .store
            .check_and_mutate(&lock.id, &filter, &[Mutation::DeleteRow], &[])?
        {
            debug!(id = %lock.id, owner = %lock.owner, "lock released");
            return Ok(());
        }

        match self.read_lease(&lock.id)? {
            None => Ok(()),
            Some(_) => Err(LockError::InvalidOwner),
        }
    }
}
