//! Racing acquirers: exactly one wins while a lease is live.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, SystemTime};

use lockstore::{Lock, LockBackend, LockError};

use crate::support;

const CONTENDERS: usize = 16;

/// Start `CONTENDERS` threads calling `try_lock` at once; return the winners.
fn race(backend: &Arc<dyn LockBackend>, id: &str) -> Vec<String> {
    let barrier = Arc::new(Barrier::new(CONTENDERS));
    let handles: Vec<_> = (0..CONTENDERS)
        .map(|i| {
            let backend = backend.clone();
            let barrier = barrier.clone();
            let lock = Lock::expiring_in(id, format!("owner-{i}"), Duration::from_secs(30));
            thread::spawn(move || {
                barrier.wait();
                match backend.try_lock(&lock) {
                    Ok(()) => Some(lock.owner),
                    Err(LockError::Busy) => None,
                    Err(e) => panic!("unexpected error: {e}"),
                }
            })
        })
        .collect();

    handles
        .into_iter()
        .filter_map(|h| h.join().unwrap())
        .collect()
}

#[test]
fn one_winner_for_a_fresh_id() {
    for (name, backend) in support::all() {
        let winners = race(&backend, "fresh");
        assert_eq!(winners.len(), 1, "{name}: winners {winners:?}");

        // The winner, and only the winner, can release.
        let winner = Lock::expiring_in("fresh", winners[0].clone(), Duration::from_secs(30));
        let loser_owner = if winners[0] == "owner-0" { "owner-1" } else { "owner-0" };
        assert_eq!(
            backend.release(&winner.with_owner(loser_owner)),
            Err(LockError::InvalidOwner),
            "{name}"
        );
        backend.release(&winner).unwrap();
    }
}

#[test]
fn one_winner_for_an_expired_lease() {
    for (name, backend) in support::all() {
        let stale = Lock::new("stale", "previous", SystemTime::now() - Duration::from_secs(1));
        backend.try_lock(&stale).unwrap();

        let winners = race(&backend, "stale");
        assert_eq!(winners.len(), 1, "{name}: winners {winners:?}");
    }
}

#[test]
fn ids_are_independent() {
    for (name, backend) in support::all() {
        let a = Lock::expiring_in("a", "x", Duration::from_secs(30));
        let b = Lock::expiring_in("b", "x", Duration::from_secs(30));
        backend.try_lock(&a).unwrap();
        backend.try_lock(&b).unwrap_or_else(|e| panic!("{name}: {e}"));
    }
}
