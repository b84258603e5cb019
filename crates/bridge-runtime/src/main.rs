//! # EVM-Tron Bridge Runtime
//!
//! Loads configuration from the environment (and a `.env` file when
//! present), validates it, and serves the JSON-RPC gateway until Ctrl+C.
//!
//! ## Environment
//!
//! - `TRON_NODE_BASE` / `CHAINSTACK_BASE_ENDPOINT` / `TRON_RPC_URL`: node base URL
//! - `TRON_PRIVATE_KEY` / `PRIVATE_KEY`: gateway signing key
//! - `RUST_LOG`: log filter (default `info`)
//! - `LOG_FORMAT=json`: structured log lines

use anyhow::{Context, Result};
use evm_tron_bridge::{BridgeConfig, BridgeService, VERSION};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    init_tracing();
    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment file");
    }

    info!(version = VERSION, "Starting EVM-Tron bridge");

    let config = BridgeConfig::from_env();
    let addr = config.http_addr();
    let service = BridgeService::from_config(config).context("invalid bridge configuration")?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Bridge is running. Press Ctrl+C to stop.");

    service.serve(listener, shutdown_signal()).await?;
    Ok(())
}
