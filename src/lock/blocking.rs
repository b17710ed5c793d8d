//! Blocking acquire, written once on top of any backend's `try_lock`.
//!
//! Stores offer no change notifications, so waiting is a poll: try, sleep,
//! try again until the lease is won or the caller's timeout runs out. Only
//! [`LockError::Busy`] is retried; every other error ends the wait.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use super::{Lock, LockBackend, LockError};

/// How long to pause between `try_lock` attempts.
///
/// The default is a fixed one second interval. With a `multiplier` above 1.0
/// the pause grows after every busy attempt, up to `max_interval`. Either way
/// a pause never runs past the caller's deadline.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(1))
    }
}

impl PollPolicy {
    pub fn fixed(interval: Duration) -> Self {
        PollPolicy {
            interval,
            max_interval: interval,
            multiplier: 1.0,
        }
    }

    pub fn backoff(initial: Duration, max_interval: Duration, multiplier: f64) -> Self {
        PollPolicy {
            interval: initial,
            max_interval: max_interval.max(initial),
            multiplier: multiplier.max(1.0),
        }
    }

    fn next_interval(&self, current: Duration) -> Duration {
        if self.multiplier <= 1.0 {
            return current;
        }
        current.mul_f64(self.multiplier).min(self.max_interval)
    }
}

/// A cloneable handle that aborts a blocking acquire between polls.
///
/// Cancelling wakes any waiter immediately; the acquire then fails with
/// [`LockError::Cancelled`]. A `try_lock` already in flight is not interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (flag, wake) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep for up to `timeout`. Returns `true` if cancelled.
    fn wait(&self, timeout: Duration) -> bool {
        let (flag, wake) = &*self.inner;
        let guard = flag.lock().unwrap_or_else(PoisonError::into_inner);
        let (cancelled, _) = wake
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        *cancelled
    }
}

/// Acquire `lock` through `backend`, polling `try_lock` while the id is busy.
///
/// The first attempt is made immediately. Between attempts the caller's
/// thread sleeps according to `policy`, capped at the time left before
/// `timeout`. A final attempt is made at the deadline; if it is still busy the
/// result is [`LockError::Busy`]. A zero `timeout` makes exactly one attempt.
pub fn acquire<B: LockBackend + ?Sized>(
    backend: &B,
    lock: &Lock,
    timeout: Duration,
    policy: &PollPolicy,
    cancel: Option<&CancelToken>,
) -> Result<(), LockError> {
    let start = Instant::now();
    let deadline = start.checked_add(timeout);
    let mut interval = policy.interval;
    let mut attempts = 0usize;

    loop {
        attempts += 1;
        match backend.try_lock(lock) {
            Ok(()) => {
                debug!(id = %lock.id, owner = %lock.owner, attempts, "lock acquired");
                return Ok(());
            }
            Err(LockError::Busy) => {}
            Err(err) => return Err(err),
        }

        let now = Instant::now();
        let pause = match deadline {
            Some(deadline) if now >= deadline => {
                debug!(id = %lock.id, owner = %lock.owner, attempts, ?timeout, "lock wait timed out");
                return Err(LockError::Busy);
            }
            Some(deadline) => interval.min(deadline - now),
            None => interval,
        };

        trace!(id = %lock.id, attempts, ?pause, "lock busy, waiting");
        match cancel {
            Some(token) => {
                if token.wait(pause) {
                    debug!(id = %lock.id, owner = %lock.owner, attempts, "lock wait cancelled");
                    return Err(LockError::Cancelled);
                }
            }
            None => thread::sleep(pause),
        }
        interval = policy.next_interval(interval);
    }
}
