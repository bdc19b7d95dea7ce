//! Tracing subscriber initialization.
//!
//! The viewer core never draws its own diagnostics; logs go to a file the
//! host (or a `tail -f`) can watch. Respects `RUST_LOG`, defaulting to
//! `info`.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for logging initialization failures.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// Failed to create the log directory.
    #[error("failed to create log directory at {path:?}: {source}")]
    DirectoryCreation {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The log path has no usable file name or parent directory.
    #[error("invalid log file path: {0:?}")]
    InvalidPath(PathBuf),

    /// A tracing subscriber was already installed.
    #[error("tracing subscriber already initialized")]
    SubscriberAlreadySet,
}

/// Initialize file-based tracing output.
///
/// Creates the log directory if needed, then installs a non-ANSI file
/// appender subscriber filtered by `RUST_LOG` (default `info`).
///
/// # Errors
///
/// [`LoggingError`] when the directory cannot be created, the path has no
/// file name, or a subscriber is already installed.
pub fn init(log_path: &Path) -> Result<(), LoggingError> {
    use tracing_subscriber::EnvFilter;

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| LoggingError::DirectoryCreation {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let file_name = log_path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| LoggingError::InvalidPath(log_path.to_path_buf()))?;
    let directory = log_path
        .parent()
        .ok_or_else(|| LoggingError::InvalidPath(log_path.to_path_buf()))?;

    let appender = tracing_appender::rolling::never(directory, file_name);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(appender)
        .with_ansi(false)
        .try_init()
        .map_err(|_| LoggingError::SubscriberAlreadySet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    #[serial(tracing_init)]
    fn init_creates_missing_log_directory() {
        let test_dir = std::env::temp_dir().join("jolv_test_logs_create");
        let log_file = test_dir.join("jolv.log");
        let _ = fs::remove_dir_all(&test_dir);

        // Subscriber may already be set by another test; directory creation
        // happens regardless.
        let _ = init(&log_file);

        assert!(test_dir.exists());
        let _ = fs::remove_dir_all(&test_dir);
    }

    #[test]
    #[serial(tracing_init)]
    fn init_accepts_existing_directory() {
        let test_dir = std::env::temp_dir().join("jolv_test_logs_exists");
        let log_file = test_dir.join("jolv.log");
        let _ = fs::create_dir_all(&test_dir);

        let _ = init(&log_file);

        assert!(test_dir.exists());
        let _ = fs::remove_dir_all(&test_dir);
    }
}
