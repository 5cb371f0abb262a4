//! Endel sync bridge -- headless task sync endpoint.
//!
//! Serves the task file over HTTP so a phone or another PC can pull or
//! push the whole collection, without running the interactive menu.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:5000
//! cargo run --bin endel-bridge
//!
//! # Custom address and task file
//! cargo run --bin endel-bridge -- --bind 127.0.0.1:8080 --data-file ./tareas.json
//!
//! # Or via environment variables
//! ENDEL_BRIDGE_ADDR=127.0.0.1:8080 cargo run --bin endel-bridge
//! ```

use std::sync::Arc;

use clap::Parser;
use endel_bridge::config::{BridgeCliArgs, BridgeConfig};
use endel_bridge::server::{self, BridgeState};
use endel_bridge::store::TaskStore;

#[tokio::main]
async fn main() {
    let cli = BridgeCliArgs::parse();

    // Load config from CLI args + config file + env vars + defaults.
    let config = match BridgeConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing with the resolved log level.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(
        addr = %config.bind_addr,
        data_file = %config.data_file.display(),
        "starting endel sync bridge"
    );

    let store = Arc::new(TaskStore::open(&config.data_file));
    if let Err(e) = store.load().await {
        // Keep serving; a push from a peer replaces a corrupt file.
        tracing::warn!(error = %e, "task file is not readable at startup");
    }
    let state = Arc::new(BridgeState::new(store));

    match server::start_server_with_state(&config.bind_addr, state, config.max_payload_size).await
    {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "sync endpoint listening");
            tokio::select! {
                result = handle => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "sync endpoint task failed");
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutting down");
                }
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start sync endpoint");
            std::process::exit(1);
        }
    }
}
