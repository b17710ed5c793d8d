use thiserror::Error;

use crate::store::StoreError;

/// Error type for lock operations.
///
/// Every backend resolves its store-specific conditions into these variants;
/// nothing store-shaped crosses the [`LockBackend`](super::LockBackend)
/// boundary except through [`LockError::Store`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    /// A live lease exists for the id.
    #[error("lock busy")]
    Busy,
    /// The caller is not the owner recorded for the id.
    #[error("lock owner mismatch")]
    InvalidOwner,
    /// A refresh that would not move the expiry strictly forward.
    #[error("refresh must extend the lock expiry")]
    InvalidRefresh,
    /// No record exists for the id.
    #[error("lock not found")]
    NotFound,
    /// A blocking acquire was cancelled before it succeeded.
    #[error("lock wait cancelled")]
    Cancelled,
    /// The request could not be interpreted (missing fields, bad timestamps).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The backing store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LockError {
    /// Only `Busy` is retried by the blocking acquire loop.
    pub fn is_busy(&self) -> bool {
        matches!(self, LockError::Busy)
    }

    /// Map this error to an HTTP-style status code.
    pub fn status_code(&self) -> u16 {
        match self {
            LockError::Busy => 409,
            LockError::InvalidOwner => 403,
            LockError::InvalidRefresh => 422,
            LockError::NotFound => 404,
            LockError::Cancelled => 499,
            LockError::InvalidRequest(_) => 400,
            LockError::Store(e) if e.is_transient() => 503,
            LockError::Store(_) => 500,
        }
    }
}
