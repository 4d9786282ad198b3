//! Logging initialisation
//!
//! Writes to %APPDATA%\HandsOff\app.log. Every start rotates the previous
//! session's log to `app.log.1`, keeping nine old sessions.

use crate::config::ConfigManager;
use crate::error::{HandsOffError, Result, StringError};
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt};

/// Historical logs kept (app.log.1 through app.log.9)
const MAX_LOG_FILES: u8 = 9;

/// Install the global tracing subscriber
///
/// Level comes from `RUST_LOG`, defaulting to `info`.
pub fn init_logging() -> Result<()> {
    let log_dir = ConfigManager::get_app_dir();
    std::fs::create_dir_all(&log_dir)?;

    rotate_logs_on_startup(&log_dir.join("app.log"))?;

    // Rotation is per session, handled above
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix("app")
        .filename_suffix("log")
        .build(&log_dir)
        .map_err(|e| HandsOffError::ConfigError(Box::new(e)))?;

    let subscriber = fmt()
        .with_writer(file_appender)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| HandsOffError::ConfigError(Box::new(e)))?;

    tracing::info!("HandsOff v{} started", env!("CARGO_PKG_VERSION"));

    Ok(())
}

/// Shift `app.log` → `app.log.1` → … → `app.log.9`, dropping the oldest
fn rotate_logs_on_startup(log_path: &Path) -> Result<()> {
    if !log_path.exists() {
        return Ok(());
    }

    let log_dir = log_path
        .parent()
        .ok_or_else(|| HandsOffError::ConfigError(StringError::new("Invalid log path")))?;
    let log_name = log_path
        .file_name()
        .ok_or_else(|| HandsOffError::ConfigError(StringError::new("Invalid log filename")))?
        .to_string_lossy();
    let numbered = |i: u8| log_dir.join(format!("{log_name}.{i}"));

    let oldest = numbered(MAX_LOG_FILES);
    if oldest.exists() {
        std::fs::remove_file(&oldest)?;
    }

    for i in (1..MAX_LOG_FILES).rev() {
        let current = numbered(i);
        if current.exists() {
            std::fs::rename(&current, numbered(i + 1))?;
        }
    }

    std::fs::rename(log_path, numbered(1))?;
    Ok(())
}
