use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A lease on the resource named by `id`, held by `owner` until `expires_at`.
///
/// The same shape is used for every request: `try_lock`, `lock` and
/// `refresh` read all three fields, `release` reads `id` and `owner`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lock {
    pub id: String,
    pub owner: String,
    pub expires_at: SystemTime,
}

impl Lock {
    pub fn new(id: impl Into<String>, owner: impl Into<String>, expires_at: SystemTime) -> Self {
        Lock {
            id: id.into(),
            owner: owner.into(),
            expires_at,
        }
    }

    /// A lease that expires `ttl` from now.
    pub fn expiring_in(id: impl Into<String>, owner: impl Into<String>, ttl: Duration) -> Self {
        Self::new(id, owner, SystemTime::now() + ttl)
    }

    /// The same lease moved to a different expiry.
    pub fn with_expiry(&self, expires_at: SystemTime) -> Self {
        Lock {
            expires_at,
            ..self.clone()
        }
    }

    /// The same lease requested by a different owner.
    pub fn with_owner(&self, owner: impl Into<String>) -> Self {
        Lock {
            owner: owner.into(),
            ..self.clone()
        }
    }

    /// A lease is live while `now < expires_at`.
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        is_expired(self.expires_at, now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(SystemTime::now())
    }
}

pub(crate) fn is_expired(expires_at: SystemTime, now: SystemTime) -> bool {
    now >= expires_at
}

/// Milliseconds since the Unix epoch, clamped to zero for earlier instants.
pub fn to_unix_millis(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

pub fn from_unix_millis(millis: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(millis)
}
