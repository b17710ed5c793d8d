//! InMemoryTxnStore - optimistic serializable transactions over a HashMap.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::trace;

use super::{LeaseRow, StoreError, Transaction, TransactionalStore};

/// Default number of times a conflicting transaction is re-run.
pub const DEFAULT_MAX_ATTEMPTS: usize = 10;

struct Versioned {
    version: u64,
    row: LeaseRow,
}

#[derive(Default)]
struct Table {
    rows: HashMap<String, Versioned>,
    commits: u64,
}

impl Table {
    fn version_of(&self, id: &str) -> u64 {
        self.rows.get(id).map(|v| v.version).unwrap_or(0)
    }
}

/// In-memory [`TransactionalStore`] using optimistic concurrency control.
///
/// A transaction records the version of every row it reads. At commit the
/// table is locked, the read versions are re-checked, and the buffered writes
/// are applied only if none of them moved. A transaction whose reads went
/// stale is re-run, so concurrent transactions on the same id serialize:
/// only one of them can commit a decision based on what it read.
#[derive(Clone)]
pub struct InMemoryTxnStore {
    table: Arc<Mutex<Table>>,
    max_attempts: usize,
}

impl Default for InMemoryTxnStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTxnStore {
    pub fn new() -> Self {
        Self::with_max_attempts(DEFAULT_MAX_ATTEMPTS)
    }

    pub fn with_max_attempts(max_attempts: usize) -> Self {
        InMemoryTxnStore {
            table: Arc::new(Mutex::new(Table::default())),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Committed row for `id`, outside any transaction.
    pub fn get(&self, id: &str) -> Result<Option<LeaseRow>, StoreError> {
        let table = self.table.lock().map_err(|_| StoreError::Poisoned("get"))?;
        Ok(table.rows.get(id).map(|v| v.row.clone()))
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        let table = self.table.lock().map_err(|_| StoreError::Poisoned("len"))?;
        Ok(table.rows.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    fn commit(&self, txn: InMemoryTxn<'_>) -> Result<bool, StoreError> {
        let mut table = self
            .table
            .lock()
            .map_err(|_| StoreError::Poisoned("commit"))?;

        let stale = txn
            .reads
            .iter()
            .any(|(id, version)| table.version_of(id) != *version);
        if stale {
            return Ok(false);
        }

        if txn.writes.is_empty() {
            return Ok(true);
        }

        table.commits += 1;
        let version = table.commits;
        for (id, write) in txn.writes {
            match write {
                Some(row) => {
                    table.rows.insert(id, Versioned { version, row });
                }
                None => {
                    table.rows.remove(&id);
                }
            }
        }
        Ok(true)
    }
}

struct InMemoryTxn<'a> {
    table: &'a Mutex<Table>,
    reads: HashMap<String, u64>,
    writes: Vec<(String, Option<LeaseRow>)>,
}

impl Transaction for InMemoryTxn<'_> {
    fn read(&mut self, id: &str) -> Result<Option<LeaseRow>, StoreError> {
        let table = self.table.lock().map_err(|_| StoreError::Poisoned("read"))?;
        let current = table.rows.get(id);
        self.reads
            .entry(id.to_string())
            .or_insert_with(|| current.map(|v| v.version).unwrap_or(0));
        Ok(current.map(|v| v.row.clone()))
    }

    fn upsert(&mut self, id: &str, row: LeaseRow) {
        self.writes.push((id.to_string(), Some(row)));
    }

    fn delete(&mut self, id: &str) {
        self.writes.push((id.to_string(), None));
    }
}

impl TransactionalStore for InMemoryTxnStore {
    fn read_write<T, E, F>(&self, mut f: F) -> Result<T, E>
    where
        F: FnMut(&mut dyn Transaction) -> Result<T, E>,
        E: From<StoreError>,
    {
        for attempt in 1..=self.max_attempts {
            let mut txn = InMemoryTxn {
                table: &self.table,
                reads: HashMap::new(),
                writes: Vec::new(),
            };
            let value = f(&mut txn)?;
            if self.commit(txn)? {
                return Ok(value);
            }
            trace!(attempt, "transaction conflicted, retrying");
        }
        Err(StoreError::Aborted {
            attempts: self.max_attempts,
        }
        .into())
    }
}
