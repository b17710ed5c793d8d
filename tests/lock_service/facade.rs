use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use lockstore::{BackendKind, CancelToken, Config, ConfigError, Lock, LockError, LockService};

use crate::support;

#[test]
fn lock_waits_with_the_configured_policy() {
    for (name, service) in support::services() {
        let held = Lock::expiring_in("job", "a", Duration::from_millis(100));
        service.try_lock(&held).unwrap();

        let start = Instant::now();
        let mine = Lock::expiring_in("job", "b", Duration::from_secs(30));
        service
            .lock(&mine, Duration::from_secs(2), None)
            .unwrap_or_else(|e| panic!("{name}: {e}"));
        // A 25ms poll notices the lapse well before the default one-second poll would.
        assert!(start.elapsed() < Duration::from_millis(900), "{name}");
    }
}

#[test]
fn lock_with_zero_timeout_is_a_single_attempt() {
    for (name, service) in support::services() {
        let held = Lock::expiring_in("job", "a", Duration::from_secs(30));
        service.try_lock(&held).unwrap();

        let start = Instant::now();
        assert_eq!(
            service.lock(&held.with_owner("b"), Duration::ZERO, None),
            Err(LockError::Busy),
            "{name}"
        );
        assert!(start.elapsed() < Duration::from_millis(500), "{name}");
    }
}

#[test]
fn cancel_stops_a_waiting_lock() {
    for (name, service) in support::services() {
        let held = Lock::expiring_in("job", "a", Duration::from_secs(30));
        service.try_lock(&held).unwrap();

        let token = CancelToken::new();
        let waiter = {
            let service = Arc::clone(&service);
            let token = token.clone();
            let mine = held.with_owner("b");
            thread::spawn(move || service.lock(&mine, Duration::from_secs(30), Some(&token)))
        };
        thread::sleep(Duration::from_millis(50));
        token.cancel();
        assert_eq!(waiter.join().unwrap(), Err(LockError::Cancelled), "{name}");
    }
}

#[test]
fn from_config_builds_each_backend() {
    for kind in [BackendKind::Cas, BackendKind::Transactional] {
        let config = Config {
            backend: Some(kind),
            poll_interval_ms: 10,
            ..Config::default()
        };
        let service = LockService::from_config(&config).unwrap();
        assert_eq!(service.poll_policy().interval, Duration::from_millis(10));

        let lock = Lock::expiring_in("job", "me", Duration::from_secs(30));
        service.try_lock(&lock).unwrap();
        assert_eq!(service.try_lock(&lock), Err(LockError::Busy), "{}", kind.as_str());
        service.release(&lock).unwrap();
    }
}

#[test]
fn from_config_requires_a_backend() {
    let err = LockService::from_config(&Config::default()).err().unwrap();
    assert!(matches!(err, ConfigError::MissingBackend));
}
