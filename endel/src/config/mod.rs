//! Configuration system for the Endel client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/endel/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use endel_bridge::config::default_data_file;
use endel_bridge::server::DEFAULT_MAX_PAYLOAD_SIZE;
use endel_proto::wire::DEFAULT_PORT;

use crate::notify::{DEFAULT_ALERT_HOUR, DEFAULT_TITLE};
use crate::sync::DEFAULT_SYNC_TIMEOUT;
use crate::timetable::Timetable;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// A value is outside its allowed range.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue {
        /// Dotted config key.
        key: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    storage: StorageFileConfig,
    sync: SyncFileConfig,
    notify: NotifyFileConfig,
    ui: UiFileConfig,
    timetable: Option<Timetable>,
}

/// `[storage]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StorageFileConfig {
    data_file: Option<PathBuf>,
}

/// `[sync]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SyncFileConfig {
    peer: Option<String>,
    bind_addr: Option<String>,
    serve: Option<bool>,
    timeout_secs: Option<u64>,
    max_payload_size: Option<usize>,
}

/// `[notify]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct NotifyFileConfig {
    enabled: Option<bool>,
    alert_hour: Option<u32>,
    title: Option<String>,
}

/// `[ui]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct UiFileConfig {
    clear_screen: Option<bool>,
}

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// CLI arguments for the Endel client.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Endel — task manager with reminders and LAN sync")]
pub struct CliArgs {
    /// Path to config file (default: `~/.config/endel/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Task file (default: `<data dir>/endel/tareas.json`).
    #[arg(short, long, env = "ENDEL_DATA_FILE")]
    pub data_file: Option<PathBuf>,

    /// Peer to pull from / push to (`host`, `host:port` or `http://...`).
    #[arg(short, long, env = "ENDEL_PEER")]
    pub peer: Option<String>,

    /// Address the embedded sync endpoint binds to.
    #[arg(short, long, env = "ENDEL_BIND")]
    pub bind: Option<String>,

    /// Do not start the embedded sync endpoint.
    #[arg(long)]
    pub no_server: bool,

    /// Do not schedule the due-tomorrow notification.
    #[arg(long)]
    pub no_notify: bool,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "ENDEL_LOG")]
    pub log_level: String,

    /// Log file path (default: `<tmp>/endel.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -- Storage --
    /// Task collection file.
    pub data_file: PathBuf,

    // -- Sync --
    /// Peer address for pull/push, if configured.
    pub peer: Option<String>,
    /// Bind address of the embedded endpoint.
    pub bind_addr: String,
    /// Whether to run the embedded endpoint.
    pub serve: bool,
    /// Per-request timeout for pull/push.
    pub sync_timeout: Duration,
    /// Maximum accepted request body for the embedded endpoint.
    pub max_payload_size: usize,

    // -- Notify --
    /// Whether to schedule the due-tomorrow alert.
    pub notify_enabled: bool,
    /// Local hour the alert fires.
    pub alert_hour: u32,
    /// Notification title.
    pub notify_title: String,

    // -- UI --
    /// Clear the terminal before each menu screen.
    pub clear_screen: bool,
    /// Weekly timetable and subject catalog.
    pub timetable: Timetable,

    // -- Logging --
    /// Log level filter string.
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            peer: None,
            bind_addr: format!("0.0.0.0:{DEFAULT_PORT}"),
            serve: true,
            sync_timeout: DEFAULT_SYNC_TIMEOUT,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            notify_enabled: true,
            alert_hour: DEFAULT_ALERT_HOUR,
            notify_title: DEFAULT_TITLE.to_string(),
            clear_screen: true,
            timetable: Timetable::default(),
            log_level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// CLI args and env vars are parsed via `clap`. If `--config` is given
    /// and the file does not exist, returns an error. If no `--config` is
    /// given, the default path (`~/.config/endel/config.toml`) is tried
    /// and silently ignored if missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read
    /// or parsed, or if a value is out of range.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        let config = Self::resolve(cli, file);
        config.validate()?;
        Ok(config)
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default. This is separated from `load()` to
    /// enable unit testing without CLI parsing.
    #[must_use]
    fn resolve(cli: &CliArgs, file: ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            data_file: cli
                .data_file
                .clone()
                .or(file.storage.data_file)
                .unwrap_or(defaults.data_file),
            peer: cli
                .peer
                .clone()
                .or(file.sync.peer)
                .filter(|p| !p.trim().is_empty()),
            bind_addr: cli
                .bind
                .clone()
                .or(file.sync.bind_addr)
                .unwrap_or(defaults.bind_addr),
            serve: !cli.no_server && file.sync.serve.unwrap_or(defaults.serve),
            sync_timeout: file
                .sync
                .timeout_secs
                .map_or(defaults.sync_timeout, Duration::from_secs),
            max_payload_size: file
                .sync
                .max_payload_size
                .unwrap_or(defaults.max_payload_size),
            notify_enabled: !cli.no_notify
                && file.notify.enabled.unwrap_or(defaults.notify_enabled),
            alert_hour: file.notify.alert_hour.unwrap_or(defaults.alert_hour),
            notify_title: file.notify.title.unwrap_or(defaults.notify_title),
            clear_screen: file.ui.clear_screen.unwrap_or(defaults.clear_screen),
            timetable: file.timetable.unwrap_or(defaults.timetable),
            log_level: cli.log_level.clone(),
        }
    }

    /// Checks values that the types alone cannot constrain.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.alert_hour > 23 {
            return Err(ConfigError::InvalidValue {
                key: "notify.alert_hour",
                reason: format!("{} is not an hour of the day (0-23)", self.alert_hour),
            });
        }
        if self.sync_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "sync.timeout_secs",
                reason: "must be at least 1 second".to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Default config file path: `~/.config/endel/config.toml`.
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("endel").join("config.toml"))
}

/// Load and parse a TOML config file.
fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    }

    let Some(path) = default_config_path() else {
        return Ok(ConfigFile::default());
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
