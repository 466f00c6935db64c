//! Structured logging for the wiring audit
//!
//! Console output goes to stderr (stdout is reserved for command output).
//! A JSON copy of every event is written to a daily rotating file under
//! `dirs::config_dir()/linkaudit/logs/`, or under `LINKAUDIT_LOG_DIR` when set.

pub mod macros;

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_DIR_ENV: &str = "LINKAUDIT_LOG_DIR";

/// Installs the global subscriber and returns the log directory.
///
/// `default_level` is used when `RUST_LOG` is not set (for example the
/// value of `--log-level`). Calling this twice is harmless: a second
/// global subscriber is silently skipped.
pub fn init_logging(default_level: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let log_dir = log_directory()?;
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "linkaudit.log");

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_line_number(true)
        .compact();

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .json();

    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;

    let init_result = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    if let Err(e) = init_result {
        if e.to_string().contains("already been set") {
            return Ok(log_dir);
        }
        return Err(Box::new(e));
    }

    tracing::debug!("Logging initialized. Log directory: {}", log_dir.display());

    Ok(log_dir)
}

/// Map a user-facing level name (`INFO`, `warn`, `DEBUG`...) to a filter directive.
pub fn level_directive(level: &str) -> Option<&'static str> {
    match level.trim().to_ascii_lowercase().as_str() {
        "error" => Some("error"),
        "warn" | "warning" => Some("warn"),
        "info" => Some("info"),
        "debug" => Some("debug"),
        "trace" => Some("trace"),
        _ => None,
    }
}

fn log_directory() -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(dir) = std::env::var_os(LOG_DIR_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let config_dir = dirs::config_dir().ok_or("no per-user config directory on this platform")?;
    Ok(config_dir.join("linkaudit").join("logs"))
}
