//! `lockd`: serves the lock protocol over gRPC (and optionally HTTP).

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lockstore::config::{Cli, Config};
use lockstore::service::{self, LockService};

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)
        .with_context(|| format!("error reading config {}", cli.config.display()))?;
    config.apply(&cli);

    init_tracing(&config.log_level);

    let service = Arc::new(LockService::from_config(&config).context("error creating service")?);
    let backend = config.backend_kind()?;

    if let Some(port) = config.http_port {
        #[cfg(feature = "http")]
        {
            let service = service.clone();
            let addr = format!("0.0.0.0:{port}");
            info!(%addr, "starting http server");
            tokio::spawn(async move {
                if let Err(e) = service::serve(service, &addr).await {
                    warn!(error = %e, "http server stopped");
                }
            });
        }
        #[cfg(not(feature = "http"))]
        {
            warn!(port, "http_port is set but lockd was built without the http feature");
        }
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(%addr, backend = backend.as_str(), "starting grpc server");
    service::serve_grpc_with_shutdown(service, addr, shutdown_signal())
        .await
        .context("grpc server failed")?;

    Ok(())
}
