//! `Endel` — terminal task manager with due-date reminders and LAN sync.
//!
//! Runs the numbered menu on stdin/stdout, serves the task file to peers
//! on port 5000, and schedules a desktop notification for tasks due
//! tomorrow. Configuration via CLI flags, environment variables, or
//! config file (`~/.config/endel/config.toml`).
//!
//! ```bash
//! # Local only
//! cargo run --bin endel -- --no-server
//!
//! # Sync with a phone on the LAN
//! cargo run --bin endel -- --peer 192.168.0.67
//!
//! # Or via environment variables
//! ENDEL_PEER=192.168.0.67:5000 ENDEL_DATA_FILE=/tmp/tareas.json cargo run
//! ```

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::io::BufReader;
use tracing_appender::non_blocking::WorkerGuard;

use endel::app::App;
use endel::config::{CliArgs, ClientConfig};
use endel::menu::Menu;
use endel::notify::{self, AlertHandle, DesktopNotifier};
use endel::sync::{PeerAddr, SyncClient};
use endel_bridge::server::{self, BridgeState};
use endel_bridge::store::TaskStore;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Logs go to a file; stdout belongs to the menu.
    let _log_guard = init_logging(&config.log_level, cli.log_file.as_deref());

    tracing::info!(data_file = %config.data_file.display(), "endel starting");

    let store = Arc::new(TaskStore::open(config.data_file.clone()));

    let server = if config.serve {
        start_endpoint(&config, Arc::clone(&store)).await
    } else {
        None
    };

    let alert = if config.notify_enabled {
        arm_due_alert(&config, &store).await
    } else {
        None
    };

    let sync = match config.peer.as_deref().map(|peer| {
        PeerAddr::parse(peer).and_then(|addr| SyncClient::new(addr, config.sync_timeout))
    }) {
        Some(Ok(client)) => Some(client),
        Some(Err(e)) => {
            eprintln!("Warning: {e}; pull and push are disabled");
            tracing::warn!(error = %e, "peer not usable");
            None
        }
        None => None,
    };

    let app = App::new(Arc::clone(&store))
        .with_sync(sync)
        .with_timetable(config.timetable.clone())
        .with_clear_screen(config.clear_screen);

    let stdin = BufReader::new(tokio::io::stdin());
    let result = Menu::new(&app, stdin, std::io::stdout()).run().await;

    if let Some(alert) = alert {
        alert.cancel();
    }
    if let Some(server) = server {
        server.abort();
    }

    match result {
        Ok(()) => {
            tracing::info!("endel exiting");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "menu ended with an error");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("endel.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Serves the task file to peers. A bind failure only disables serving.
async fn start_endpoint(
    config: &ClientConfig,
    store: Arc<TaskStore>,
) -> Option<tokio::task::JoinHandle<()>> {
    let state = Arc::new(BridgeState::new(store));
    match server::start_server_with_state(&config.bind_addr, state, config.max_payload_size).await
    {
        Ok((addr, handle)) => {
            tracing::info!(%addr, "sync endpoint listening");
            Some(handle)
        }
        Err(e) => {
            eprintln!(
                "Warning: could not serve on {} ({e}); peers cannot sync with this machine",
                config.bind_addr
            );
            tracing::warn!(addr = %config.bind_addr, error = %e, "sync endpoint not started");
            None
        }
    }
}

/// Arms the one-shot notification for tasks due tomorrow.
async fn arm_due_alert(config: &ClientConfig, store: &TaskStore) -> Option<AlertHandle> {
    let tasks = match store.load().await {
        Ok(tasks) => tasks,
        Err(e) => {
            tracing::warn!(error = %e, "due alert skipped: task file unreadable");
            return None;
        }
    };
    notify::schedule_due_alert(
        tasks.as_slice(),
        chrono::Local::now().naive_local(),
        config.alert_hour,
        config.notify_title.clone(),
        Arc::new(DesktopNotifier::default()),
    )
}
