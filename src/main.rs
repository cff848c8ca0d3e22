//! Round-robin HTTP load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request        ┌───────────────────────────────────────────────┐
//!     ──────────────────────┼─▶ http server ─▶ dispatcher ─▶ server pool    │
//!                           │                   │  ▲  retry    │ round-robin │
//!                           │                   │  └───────────┘ skip dead   │
//!                           │                   ▼                            │
//!     Client Response       │               backend forwarder ───────────────┼──▶ Backend
//!     ◀─────────────────────┼───────────────────┘                            │
//!                           │                                                │
//!                           │   health monitor ── TCP probe ──▶ liveness     │
//!                           └───────────────────────────────────────────────┘
//! ```
//!
//! Backends come from `--backends` (comma separated) and/or a TOML file given
//! with `--config`; flags win over the file.

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use failover_lb::config::{ensure_valid, read_config, ProxyConfig};
use failover_lb::lifecycle::{os_signal, Shutdown};
use failover_lb::observability::{logging, metrics};
use failover_lb::HttpServer;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Load balanced backends, use commas to separate.
    #[arg(short, long, value_delimiter = ',')]
    backends: Vec<String>,

    /// Port to serve.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => ProxyConfig::default(),
    };
    if !cli.backends.is_empty() {
        config.backends = cli.backends.clone();
    }
    if let Some(port) = cli.port {
        config.listener.set_port(port);
    }

    logging::init_logging(&config.observability.log_level);
    tracing::info!("failover-lb v{} starting", env!("CARGO_PKG_VERSION"));

    if let Err(e) = ensure_valid(&config) {
        tracing::error!(error = %e, "Invalid configuration");
        return Err(e.into());
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        backends = config.backends.len(),
        health_interval_secs = config.health_check.interval_secs,
        max_attempts = config.retries.max_attempts,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?);
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config)?;

    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    tokio::spawn(async move {
        os_signal().await;
        shutdown.trigger();
    });

    server.run(listener, signal).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
