//! Config struct definition and defaults.

use serde::{Deserialize, Serialize};

use crate::store::DEFAULT_MAX_ATTEMPTS;

/// Which concurrency-control strategy serves the locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Optimistic strategy over a conditional row store.
    Cas,
    /// Read-modify-write transactions over a transactional store.
    Transactional,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Cas => "cas",
            BackendKind::Transactional => "transactional",
        }
    }
}

/// Service configuration, as read from `config.yaml`.
///
/// Unknown fields are ignored. Every field has a default except `backend`,
/// which must be set either here or on the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// gRPC listen port.
    pub port: u16,

    /// HTTP/JSON listen port; the HTTP transport is off when unset.
    pub http_port: Option<u16>,

    pub backend: Option<BackendKind>,

    // =========================================================================
    // Blocking acquire
    // =========================================================================
    /// Pause between `try_lock` attempts while waiting.
    pub poll_interval_ms: u64,

    /// Upper bound for the pause when `poll_multiplier` grows it.
    pub poll_max_interval_ms: Option<u64>,

    pub poll_multiplier: f64,

    // =========================================================================
    // Stores
    // =========================================================================
    /// Times a conflicting transaction is re-run before it is aborted.
    pub max_txn_attempts: usize,

    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 9876,
            http_port: None,
            backend: None,
            poll_interval_ms: 1000,
            poll_max_interval_ms: None,
            poll_multiplier: 1.0,
            max_txn_attempts: DEFAULT_MAX_ATTEMPTS,
            log_level: "info".to_string(),
        }
    }
}
