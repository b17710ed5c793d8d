//! Lease semantics shared by every backend.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use lockstore::lock::blocking;
use lockstore::{CancelToken, Lock, LockError, PollPolicy};

use crate::support;

fn fast() -> PollPolicy {
    PollPolicy::fixed(Duration::from_millis(25))
}

#[test]
fn expiry_enables_reacquisition_by_anyone() {
    for (name, backend) in support::all() {
        let short = Lock::expiring_in("job", "first", Duration::from_millis(50));
        backend.try_lock(&short).unwrap();
        thread::sleep(Duration::from_millis(100));

        let next = Lock::expiring_in("job", "second", Duration::from_secs(30));
        backend.try_lock(&next).unwrap_or_else(|e| panic!("{name}: {e}"));
        assert_eq!(backend.try_lock(&short.with_owner("third")), Err(LockError::Busy));
    }
}

#[test]
fn same_owner_is_still_busy() {
    for (name, backend) in support::all() {
        let lock = Lock::expiring_in("job", "me", Duration::from_secs(30));
        backend.try_lock(&lock).unwrap();
        assert_eq!(backend.try_lock(&lock), Err(LockError::Busy), "{name}");
    }
}

#[test]
fn mismatched_release_leaves_the_lease() {
    for (name, backend) in support::all() {
        let lock = Lock::expiring_in("job", "me", Duration::from_secs(30));
        backend.try_lock(&lock).unwrap();

        assert_eq!(backend.release(&lock.with_owner("you")), Err(LockError::InvalidOwner));
        assert_eq!(backend.try_lock(&lock.with_owner("you")), Err(LockError::Busy), "{name}");

        backend.release(&lock).unwrap();
        backend
            .try_lock(&lock.with_owner("you"))
            .unwrap_or_else(|e| panic!("{name}: {e}"));
    }
}

#[test]
fn release_is_idempotent() {
    for (name, backend) in support::all() {
        let lock = Lock::expiring_in("job", "me", Duration::from_secs(30));
        backend.release(&lock).unwrap_or_else(|e| panic!("{name}: {e}"));
        backend.try_lock(&lock).unwrap();
        backend.release(&lock).unwrap();
        backend.release(&lock).unwrap_or_else(|e| panic!("{name}: {e}"));
    }
}

#[test]
fn refresh_only_extends() {
    for (name, backend) in support::all() {
        let lock = Lock::expiring_in("job", "me", Duration::from_secs(30));
        backend.try_lock(&lock).unwrap();

        assert_eq!(backend.refresh(&lock), Err(LockError::InvalidRefresh), "{name}");
        let earlier = lock.with_expiry(lock.expires_at - Duration::from_secs(10));
        assert_eq!(backend.refresh(&earlier), Err(LockError::InvalidRefresh), "{name}");

        let later = lock.with_expiry(lock.expires_at + Duration::from_secs(10));
        backend.refresh(&later).unwrap_or_else(|e| panic!("{name}: {e}"));
        assert_eq!(backend.refresh(&lock), Err(LockError::InvalidRefresh), "{name}");
    }
}

#[test]
fn refresh_keeps_the_lock_busy_past_its_old_expiry() {
    for (name, backend) in support::all() {
        let lock = Lock::expiring_in("job", "me", Duration::from_millis(100));
        backend.try_lock(&lock).unwrap();
        backend
            .refresh(&lock.with_expiry(SystemTime::now() + Duration::from_secs(30)))
            .unwrap();

        thread::sleep(Duration::from_millis(200));
        let other = Lock::expiring_in("job", "other", Duration::from_secs(30));
        assert_eq!(backend.try_lock(&other), Err(LockError::Busy), "{name}");
    }
}

#[test]
fn refresh_checks_owner() {
    for (name, backend) in support::all() {
        let lock = Lock::expiring_in("job", "me", Duration::from_secs(30));
        backend.try_lock(&lock).unwrap();

        let later = lock.with_expiry(lock.expires_at + Duration::from_secs(10));
        assert_eq!(
            backend.refresh(&later.with_owner("you")),
            Err(LockError::InvalidOwner),
            "{name}"
        );
    }
}

#[test]
fn refresh_of_absent_id() {
    for (name, backend) in support::all() {
        let lock = Lock::expiring_in("nobody", "me", Duration::from_secs(30));
        assert_eq!(backend.refresh(&lock), Err(LockError::NotFound), "{name}");
    }
}

#[test]
fn blocking_acquire_respects_timeout() {
    for (name, backend) in support::all() {
        let held = Lock::expiring_in("job", "a", Duration::from_secs(30));
        backend.try_lock(&held).unwrap();

        let timeout = Duration::from_millis(200);
        let start = Instant::now();
        let result = blocking::acquire(&*backend, &held.with_owner("b"), timeout, &fast(), None);
        let elapsed = start.elapsed();

        assert_eq!(result, Err(LockError::Busy), "{name}");
        assert!(elapsed >= timeout, "{name}: gave up after {elapsed:?}");
        assert!(elapsed < timeout + Duration::from_secs(1), "{name}: waited {elapsed:?}");
    }
}

#[test]
fn blocking_acquire_succeeds_when_lease_lapses() {
    for (name, backend) in support::all() {
        let held = Lock::expiring_in("job", "a", Duration::from_millis(150));
        backend.try_lock(&held).unwrap();

        let mine = Lock::expiring_in("job", "b", Duration::from_secs(30));
        blocking::acquire(&*backend, &mine, Duration::from_secs(3), &fast(), None)
            .unwrap_or_else(|e| panic!("{name}: {e}"));
        assert_eq!(backend.release(&held), Err(LockError::InvalidOwner), "{name}");
    }
}

#[test]
fn blocking_acquire_can_be_cancelled() {
    for (name, backend) in support::all() {
        let held = Lock::expiring_in("job", "a", Duration::from_secs(30));
        backend.try_lock(&held).unwrap();

        let token = CancelToken::new();
        let waiter = {
            let backend = Arc::clone(&backend);
            let token = token.clone();
            let mine = held.with_owner("b");
            thread::spawn(move || {
                blocking::acquire(&*backend, &mine, Duration::from_secs(30), &fast(), Some(&token))
            })
        };

        thread::sleep(Duration::from_millis(100));
        token.cancel();
        assert_eq!(waiter.join().unwrap(), Err(LockError::Cancelled), "{name}");
    }
}
