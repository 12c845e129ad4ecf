//! File logging for the `taskbox` binary.
//!
//! Stdout carries shell output only, so logs always go to a file: the
//! `--log-file` path if given, otherwise `taskbox.log` next to the persisted
//! state. The filter comes from `--log-level` / `TASKBOX_LOG` alone;
//! `RUST_LOG` is not consulted.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Log file name used when no `--log-file` is given.
pub const DEFAULT_LOG_FILE: &str = "taskbox.log";

/// Filter applied when the configured directive does not parse.
const FALLBACK_DIRECTIVE: &str = "info";

/// Picks the log file: `explicit`, or [`DEFAULT_LOG_FILE`] in `data_dir`.
#[must_use]
pub fn log_path(explicit: Option<&Path>, data_dir: &Path) -> PathBuf {
    explicit.map_or_else(|| data_dir.join(DEFAULT_LOG_FILE), Path::to_path_buf)
}

/// Builds the filter from a directive such as `debug` or
/// `info,taskbox::mail=trace`. An invalid directive falls back to `info`.
#[must_use]
pub fn filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|e| {
        eprintln!("Warning: invalid log level {directive:?} ({e}), using {FALLBACK_DIRECTIVE}");
        EnvFilter::new(FALLBACK_DIRECTIVE)
    })
}

/// Installs the global subscriber writing to [`log_path`].
///
/// A log directory that cannot be created falls back to the system temp
/// directory. Returns a [`WorkerGuard`] that must be held until shutdown so
/// buffered entries are flushed, or `None` if no usable file name remains.
pub fn init(directive: &str, explicit: Option<&Path>, data_dir: &Path) -> Option<WorkerGuard> {
    let path = log_path(explicit, data_dir);
    let file_name = path.file_name()?.to_str()?;
    let wanted_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let dir = match std::fs::create_dir_all(wanted_dir) {
        Ok(()) => wanted_dir.to_path_buf(),
        Err(e) => {
            eprintln!(
                "Warning: cannot create log directory {} ({e}), logging to temp dir",
                wanted_dir.display()
            );
            std::env::temp_dir()
        }
    };

    let file_appender = tracing_appender::rolling::never(&dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(filter(directive))
        .with_ansi(false)
        .init();

    Some(guard)
}
