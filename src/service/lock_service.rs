use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::{build_backend, Config, ConfigError};
use crate::lock::{blocking, CancelToken, Lock, LockBackend, LockError, PollPolicy};

/// Stateless façade in front of one [`LockBackend`].
///
/// Transports decode requests into [`Lock`] values and call these methods;
/// the façade owns the poll policy for blocking acquires and logs every
/// outcome. It is cheap to share behind an `Arc` across request workers.
pub struct LockService {
    backend: Arc<dyn LockBackend>,
    policy: PollPolicy,
}

impl LockService {
    pub fn new(backend: Arc<dyn LockBackend>) -> Self {
        LockService {
            backend,
            policy: PollPolicy::default(),
        }
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Build the backend and poll policy named by `config`.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(build_backend(config)?).with_poll_policy(config.poll_policy()))
    }

    pub fn poll_policy(&self) -> &PollPolicy {
        &self.policy
    }

    pub fn try_lock(&self, lock: &Lock) -> Result<(), LockError> {
        observe("try_lock", lock, self.backend.try_lock(lock))
    }

    /// Blocking acquire. `cancel`, when given, ends the wait early.
    pub fn lock(
        &self,
        lock: &Lock,
        timeout: Duration,
        cancel: Option<&CancelToken>,
    ) -> Result<(), LockError> {
        let result = blocking::acquire(&*self.backend, lock, timeout, &self.policy, cancel);
        observe("lock", lock, result)
    }

    pub fn refresh(&self, lock: &Lock) -> Result<(), LockError> {
        observe("refresh", lock, self.backend.refresh(lock))
    }

    pub fn release(&self, lock: &Lock) -> Result<(), LockError> {
        observe("release", lock, self.backend.release(lock))
    }
}

fn observe(op: &'static str, lock: &Lock, result: Result<(), LockError>) -> Result<(), LockError> {
    match &result {
        Ok(()) => debug!(op, id = %lock.id, owner = %lock.owner, "ok"),
        Err(LockError::Store(e)) => warn!(op, id = %lock.id, owner = %lock.owner, error = %e, "store error"),
        Err(e) => debug!(op, id = %lock.id, owner = %lock.owner, error = %e, "rejected"),
    }
    result
}

/// Cancels its token when dropped.
///
/// Transports hold one for the lifetime of a blocking request future, so a
/// request abandoned by its client stops polling the store.
#[cfg(any(feature = "grpc", feature = "http"))]
pub(crate) struct CancelOnDrop(pub(crate) CancelToken);

#[cfg(any(feature = "grpc", feature = "http"))]
impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}
