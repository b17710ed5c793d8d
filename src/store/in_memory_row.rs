//! InMemoryRowStore - HashMap-backed conditional row store for tests and single-node use.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::row::apply_mutations;
use super::{ConditionalStore, Mutation, Row, RowFilter, StoreError};

/// In-memory [`ConditionalStore`].
///
/// Each `check_and_mutate` runs under the table's write guard, which makes it
/// atomic with respect to every other call. Clone-friendly via Arc: clones
/// are handles onto the same table, the way separate clients share one store.
#[derive(Clone, Default)]
pub struct InMemoryRowStore {
    rows: Arc<RwLock<HashMap<String, Row>>>,
}

impl InMemoryRowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently stored.
    pub fn len(&self) -> Result<usize, StoreError> {
        let rows = self.rows.read().map_err(|_| StoreError::Poisoned("len"))?;
        Ok(rows.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

impl ConditionalStore for InMemoryRowStore {
    fn read_row(&self, key: &str) -> Result<Option<Row>, StoreError> {
        let rows = self
            .rows
            .read()
            .map_err(|_| StoreError::Poisoned("read_row"))?;
        Ok(rows.get(key).cloned())
    }

    fn check_and_mutate(
        &self,
        key: &str,
        filter: &RowFilter,
        on_match: &[Mutation],
        on_miss: &[Mutation],
    ) -> Result<bool, StoreError> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| StoreError::Poisoned("check_and_mutate"))?;

        let mut slot = rows.remove(key);
        let matched = filter.matches(slot.as_ref());
        apply_mutations(&mut slot, if matched { on_match } else { on_miss });
        if let Some(row) = slot.filter(|row| !row.is_empty()) {
            rows.insert(key.to_string(), row);
        }

        Ok(matched)
    }
}
