//! Command-line flags for `lockd`.

use std::path::PathBuf;

use clap::Parser;

use super::model::BackendKind;

/// Lease-based lock service.
///
/// Flags override values from the YAML config file; every flag can also be
/// given through its environment variable.
#[derive(Parser, Debug, Default, Clone)]
#[command(name = "lockd")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the YAML config file. A missing file is not an error.
    #[arg(long, env = "LOCKD_CONFIG", default_value = "config.yaml")]
    pub config: PathBuf,

    /// gRPC listen port.
    #[arg(long, env = "LOCKD_PORT")]
    pub port: Option<u16>,

    /// HTTP/JSON listen port.
    #[arg(long, env = "LOCKD_HTTP_PORT")]
    pub http_port: Option<u16>,

    /// Backend to use for locking.
    #[arg(long, env = "LOCKD_BACKEND", value_enum)]
    pub backend: Option<BackendKind>,

    /// Pause between lock attempts while a blocking acquire waits.
    #[arg(long, env = "LOCKD_POLL_INTERVAL_MS")]
    pub poll_interval_ms: Option<u64>,

    /// Default log filter when RUST_LOG is unset.
    #[arg(long, env = "LOCKD_LOG_LEVEL")]
    pub log_level: Option<String>,
}
