//! YeePlayer Relay - standalone fan-out relay for YeePlayer boards.
//!
//! Peers connect to `/ws`; every well-formed envelope one peer sends is
//! forwarded to all the others. The relay holds no board state.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use yeeplayer_core::{api, ErrorCode, RelayState};

use crate::config::ServerConfig;

/// YeePlayer Relay - stateless envelope fan-out for shared boards.
#[derive(Parser, Debug)]
#[command(name = "yeeplayer-relay")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "YEEPLAYER_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Bind port (overrides config file and `YEEPLAYER_BIND_PORT`; 0 scans 8000-8010).
    #[arg(short = 'p', long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("YeePlayer Relay v{}", env!("CARGO_PKG_VERSION"));

    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    config.apply_cli(args.port);
    log::info!(
        "Configuration: bind_port={}, heartbeat={}s/{}s",
        config.bind_port,
        config.heartbeat_interval,
        config.heartbeat_timeout
    );

    let state = RelayState::new(config.to_core_config())
        .inspect_err(|e| log::error!("Relay startup failed [{}]", e.code()))
        .context("Invalid relay configuration")?;
    let (port, listener) = api::bind(&state.config)
        .await
        .inspect_err(|e| log::error!("Relay startup failed [{}]", e.code()))
        .context("Failed to bind relay port")?;
    log::info!("Relay ready on port {}", port);

    let connections = state.connections.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = api::serve(listener, state).await {
            log::error!("Server error: {}", e);
        }
    });

    shutdown_signal().await;

    log::info!("Shutdown signal received, closing peers...");
    connections.close_all();
    server_handle.abort();

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
