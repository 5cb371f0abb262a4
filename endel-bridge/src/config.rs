//! Configuration system for the headless sync bridge.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/endel-bridge/config.toml`)
//! 4. Compiled defaults

use std::path::{Path, PathBuf};

use endel_proto::wire::DEFAULT_PORT;

use crate::server::DEFAULT_MAX_PAYLOAD_SIZE;

/// File name of the task collection inside the data directory.
pub const TASK_FILE_NAME: &str = "tareas.json";

/// Errors that can occur when loading bridge configuration.
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
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure for the bridge.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct BridgeConfigFile {
    server: ServerFileConfig,
    storage: StorageFileConfig,
}

/// `[server]` section of the bridge config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    bind_addr: Option<String>,
    max_payload_size: Option<usize>,
}

/// `[storage]` section of the bridge config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StorageFileConfig {
    data_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// CLI arguments for the bridge.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Endel task sync bridge")]
pub struct BridgeCliArgs {
    /// Address to bind the sync endpoint to.
    #[arg(short, long, env = "ENDEL_BRIDGE_ADDR")]
    pub bind: Option<String>,

    /// Task file to serve (default: `<data dir>/endel/tareas.json`).
    #[arg(short, long, env = "ENDEL_DATA_FILE")]
    pub data_file: Option<PathBuf>,

    /// Path to config file (default: `~/.config/endel-bridge/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Maximum accepted request body in bytes.
    #[arg(long)]
    pub max_payload_size: Option<usize>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "ENDEL_BRIDGE_LOG")]
    pub log_level: String,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved bridge configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Address to bind the endpoint to (e.g., `0.0.0.0:5000`).
    pub bind_addr: String,
    /// Task collection file.
    pub data_file: PathBuf,
    /// Maximum accepted request body in bytes.
    pub max_payload_size: usize,
    /// Log level filter string.
    pub log_level: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{DEFAULT_PORT}"),
            data_file: default_data_file(),
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            log_level: "info".to_string(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an error.
    /// If no `--config` is given, the default path is tried and missing file
    /// is treated as empty config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read
    /// or parsed.
    pub fn load(cli: &BridgeCliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolve a `BridgeConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    #[must_use]
    fn resolve(cli: &BridgeCliArgs, file: &BridgeConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            bind_addr: cli
                .bind
                .clone()
                .or_else(|| file.server.bind_addr.clone())
                .unwrap_or(defaults.bind_addr),
            data_file: cli
                .data_file
                .clone()
                .or_else(|| file.storage.data_file.clone())
                .unwrap_or(defaults.data_file),
            max_payload_size: cli
                .max_payload_size
                .or(file.server.max_payload_size)
                .unwrap_or(defaults.max_payload_size),
            log_level: cli.log_level.clone(),
        }
    }
}

/// Default task file: `<data dir>/endel/tareas.json`, or `./tareas.json`
/// when the platform has no data directory.
#[must_use]
pub fn default_data_file() -> PathBuf {
    dirs::data_dir().map_or_else(
        || PathBuf::from(TASK_FILE_NAME),
        |dir| dir.join("endel").join(TASK_FILE_NAME),
    )
}

/// Where to look for the bridge config file, and whether it must exist.
///
/// An explicit `--config` path must exist; the default
/// `~/.config/endel-bridge/config.toml` is optional.
fn config_source(explicit_path: Option<&Path>) -> Option<(PathBuf, bool)> {
    match explicit_path {
        Some(path) => Some((path.to_path_buf(), true)),
        None => dirs::config_dir().map(|dir| (dir.join("endel-bridge").join("config.toml"), false)),
    }
}

/// Reads the bridge config file, or an empty one when the optional
/// default file is absent.
fn load_config_file(explicit_path: Option<&Path>) -> Result<BridgeConfigFile, ConfigError> {
    let Some((path, required)) = config_source(explicit_path) else {
        return Ok(BridgeConfigFile::default());
    };

    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(BridgeConfigFile::default());
        }
        Err(source) => return Err(ConfigError::ReadFile { path, source }),
    };
    Ok(toml::from_str(&contents)?)
}
