use std::sync::Arc;
use std::time::Duration;

use super::blocking::{self, PollPolicy};
use super::{Lock, LockError};

/// The lock protocol every storage strategy implements.
///
/// Strategies supply `try_lock`, `refresh` and `release`; `lock` is provided
/// once for all of them by polling `try_lock` (see [`blocking::acquire`]).
/// Implementations hold no per-id state in process: the store is the only
/// shared resource, so any number of instances may run against it.
pub trait LockBackend: Send + Sync {
    /// Acquire `lock` if no live lease exists for its id.
    ///
    /// Fails with [`LockError::Busy`] when a live lease exists, whoever owns it.
    fn try_lock(&self, lock: &Lock) -> Result<(), LockError>;

    /// Acquire `lock`, retrying while busy until `timeout` has elapsed.
    fn lock(&self, lock: &Lock, timeout: Duration) -> Result<(), LockError> {
        blocking::acquire(self, lock, timeout, &PollPolicy::default(), None)
    }

    /// Move the expiry of an existing lease held by `lock.owner` forward.
    fn refresh(&self, lock: &Lock) -> Result<(), LockError>;

    /// Remove the lease held by `lock.owner`. Releasing an absent id succeeds.
    fn release(&self, lock: &Lock) -> Result<(), LockError>;
}

impl<B: LockBackend + ?Sized> LockBackend for Arc<B> {
    fn try_lock(&self, lock: &Lock) -> Result<(), LockError> {
        (**self).try_lock(lock)
    }

    fn lock(&self, lock: &Lock, timeout: Duration) -> Result<(), LockError> {
        (**self).lock(lock, timeout)
    }

    fn refresh(&self, lock: &Lock) -> Result<(), LockError> {
        (**self).refresh(lock)
    }

    fn release(&self, lock: &Lock) -> Result<(), LockError> {
        (**self).release(lock)
    }
}
