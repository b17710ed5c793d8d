use thiserror::Error;

/// Failure reported by a storage substrate.
///
/// Backends never inspect these beyond passing them up; they are fatal for
/// the call that produced them and are not retried by `try_lock`, `refresh`
/// or `release`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached or refused the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// A read-write transaction kept conflicting and was given up on.
    #[error("transaction aborted after {attempts} attempts")]
    Aborted { attempts: usize },
    /// A conditional write kept losing to concurrent writers.
    #[error("conditional write contended after {attempts} attempts")]
    Contention { attempts: usize },
    /// A stored row could not be decoded.
    #[error("corrupt row {key}: {reason}")]
    Corrupt { key: String, reason: String },
    /// An in-process store guard was poisoned by a panicking writer.
    #[error("store lock poisoned during {0}")]
    Poisoned(&'static str),
}

impl StoreError {
    /// Whether a caller could reasonably retry the same call later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Unavailable(_) | StoreError::Aborted { .. } | StoreError::Contention { .. }
        )
    }
}
