//! Config loading, overrides, validation and backend construction.

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::args::Cli;
use super::model::{BackendKind, Config};
use crate::backends::{CasBackend, TransactionalBackend};
use crate::lock::{LockBackend, PollPolicy};
use crate::store::{InMemoryRowStore, InMemoryTxnStore};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read { path: String, source: io::Error },

    #[error("failed to parse config YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("no backend specified (expected one of: cas, transactional)")]
    MissingBackend,

    #[error("poll_interval_ms must be positive")]
    InvalidPollInterval,

    #[error("poll_multiplier must be at least 1.0, got {0}")]
    InvalidPollMultiplier(f64),

    #[error("max_txn_attempts must be positive")]
    InvalidTxnAttempts,
}

impl Config {
    /// Load config from a YAML file. A missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_yaml(&content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Config::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    /// Parse config from a YAML string. Validation is left to [`Config::validate`]
    /// so that command-line overrides can fill in missing values first.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Overlay values given on the command line (or via environment).
    pub fn apply(&mut self, cli: &Cli) {
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(port) = cli.http_port {
            self.http_port = Some(port);
        }
        if let Some(backend) = cli.backend {
            self.backend = Some(backend);
        }
        if let Some(ms) = cli.poll_interval_ms {
            self.poll_interval_ms = ms;
        }
        if let Some(level) = &cli.log_level {
            self.log_level = level.clone();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backend_kind()?;
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidPollInterval);
        }
        if self.poll_multiplier.is_nan() || self.poll_multiplier < 1.0 {
            return Err(ConfigError::InvalidPollMultiplier(self.poll_multiplier));
        }
        if self.max_txn_attempts == 0 {
            return Err(ConfigError::InvalidTxnAttempts);
        }
        Ok(())
    }

    pub fn backend_kind(&self) -> Result<BackendKind, ConfigError> {
        self.backend.ok_or(ConfigError::MissingBackend)
    }

    pub fn poll_policy(&self) -> PollPolicy {
        let interval = Duration::from_millis(self.poll_interval_ms);
        match self.poll_max_interval_ms {
            Some(max) => PollPolicy::backoff(interval, Duration::from_millis(max), self.poll_multiplier),
            None => PollPolicy::fixed(interval),
        }
    }
}

/// Construct the configured strategy over a fresh in-memory store.
pub fn build_backend(config: &Config) -> Result<Arc<dyn LockBackend>, ConfigError> {
    let backend: Arc<dyn LockBackend> = match config.backend_kind()? {
        BackendKind::Cas => Arc::new(CasBackend::new(InMemoryRowStore::new())),
        BackendKind::Transactional => Arc::new(TransactionalBackend::new(
            InMemoryTxnStore::with_max_attempts(config.max_txn_attempts),
        )),
    };
    Ok(backend)
}
