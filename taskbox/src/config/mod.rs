//! Configuration system for `TaskBox`.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/taskbox/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;
use std::time::Duration;

use taskbox_proto::MAX_TASK_TITLE_LENGTH;

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
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    storage: StorageFileConfig,
    snooze: SnoozeFileConfig,
    tasks: TasksFileConfig,
}

/// `[storage]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StorageFileConfig {
    data_dir: Option<PathBuf>,
    fallback_dir: Option<PathBuf>,
}

/// `[snooze]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SnoozeFileConfig {
    poll_interval_secs: Option<u64>,
}

/// `[tasks]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct TasksFileConfig {
    max_title_len: Option<usize>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Where store snapshots are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Preferred storage directory.
    pub data_dir: PathBuf,
    /// Directory tried when `data_dir` is unusable. Memory is used when
    /// both fail.
    pub fallback_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
        Self {
            data_dir: base.join("taskbox"),
            fallback_dir: Some(std::env::temp_dir().join("taskbox")),
        }
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Storage locations.
    pub storage: StorageConfig,
    /// Interval between snooze polls.
    pub snooze_poll_interval: Duration,
    /// Maximum task title length in characters.
    pub max_task_title_len: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            snooze_poll_interval: Duration::from_secs(60),
            max_task_title_len: MAX_TASK_TITLE_LENGTH,
        }
    }
}

impl AppConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// CLI args and env vars are parsed via `clap`. If `--config` is given
    /// and the file does not exist, returns an error. If no `--config` is
    /// given, the default path (`~/.config/taskbox/config.toml`) is tried
    /// and silently ignored if missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolve an `AppConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    #[must_use]
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            storage: StorageConfig {
                data_dir: cli
                    .data_dir
                    .clone()
                    .or_else(|| file.storage.data_dir.clone())
                    .unwrap_or(defaults.storage.data_dir),
                fallback_dir: file
                    .storage
                    .fallback_dir
                    .clone()
                    .or(defaults.storage.fallback_dir),
            },
            snooze_poll_interval: cli
                .poll_interval_secs
                .or(file.snooze.poll_interval_secs)
                .map_or(defaults.snooze_poll_interval, Duration::from_secs),
            max_task_title_len: file
                .tasks
                .max_title_len
                .unwrap_or(defaults.max_task_title_len),
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Task and project shell for a mail-driven inbox")]
pub struct CliArgs {
    /// Directory for persisted state.
    #[arg(long, env = "TASKBOX_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Seconds between snooze polls.
    #[arg(long)]
    pub poll_interval_secs: Option<u64>,

    /// Path to config file (default: `~/.config/taskbox/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log filter directive (trace, debug, info, warn, error, or per-target).
    #[arg(long, default_value = "info", env = "TASKBOX_LOG")]
    pub log_level: String,

    /// Path to log file (default: `taskbox.log` in the data directory).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("taskbox").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
