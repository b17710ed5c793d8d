use std::collections::BTreeMap;

use super::StoreError;

/// A row as column name → cell bytes.
pub type Row = BTreeMap<String, Vec<u8>>;

/// Predicate evaluated atomically against a row by
/// [`ConditionalStore::check_and_mutate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowFilter {
    /// Matches when the row exists with at least one cell.
    RowExists,
    /// Matches when `column` exists and holds exactly `value`.
    ColumnEquals { column: String, value: Vec<u8> },
}

impl RowFilter {
    pub fn column_equals(column: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        RowFilter::ColumnEquals {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, row: Option<&Row>) -> bool {
        match (self, row) {
            (_, None) => false,
            (RowFilter::RowExists, Some(row)) => !row.is_empty(),
            (RowFilter::ColumnEquals { column, value }, Some(row)) => {
                row.get(column).is_some_and(|cell| cell == value)
            }
        }
    }
}

/// A single change applied to a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Set { column: String, value: Vec<u8> },
    DeleteRow,
}

impl Mutation {
    pub fn set(column: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Mutation::Set {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// A store whose only atomic primitive is a conditional mutation of one row.
///
/// `check_and_mutate` evaluates `filter` against the current row and applies
/// `on_match` if it matched, `on_miss` otherwise, as one atomic step. It
/// returns whether the filter matched. There is no multi-row atomicity and
/// no read-then-write isolation: a `read_row` followed by a write can always
/// race with another writer, which is what the filter is for.
pub trait ConditionalStore: Send + Sync {
    fn read_row(&self, key: &str) -> Result<Option<Row>, StoreError>;

    fn check_and_mutate(
        &self,
        key: &str,
        filter: &RowFilter,
        on_match: &[Mutation],
        on_miss: &[Mutation],
    ) -> Result<bool, StoreError>;
}

/// Apply `mutations` in order to the row slot for one key.
pub(crate) fn apply_mutations(slot: &mut Option<Row>, mutations: &[Mutation]) {
    for mutation in mutations {
        match mutation {
            Mutation::Set { column, value } => {
                slot.get_or_insert_with(Row::new)
                    .insert(column.clone(), value.clone());
            }
            Mutation::DeleteRow => *slot = None,
        }
    }
}
