//! Configuration file loading with precedence handling.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Errors that can occur during config loading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Failed to read an explicitly requested config file.
    #[error("failed to read config file at {path}: {reason}")]
    ReadError {
        /// Path that failed to read.
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },

    /// Config file contains invalid TOML.
    #[error("invalid TOML in {path}: {reason}")]
    ParseError {
        /// Path with invalid TOML.
        path: PathBuf,
        /// Parse error details.
        reason: String,
    },
}

/// TOML configuration file structure.
///
/// All fields are optional; unset fields fall back to defaults.
/// Corresponds to `~/.config/jolv/config.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Maximum materialized lines before the window is trimmed.
    #[serde(default)]
    pub capacity: Option<usize>,

    /// Events per history page.
    #[serde(default)]
    pub page_size: Option<u64>,

    /// Scroll rest-detection debounce, in milliseconds.
    #[serde(default)]
    pub rest_debounce_ms: Option<u64>,

    /// Path to the tracing log file.
    #[serde(default)]
    pub log_file_path: Option<PathBuf>,
}

/// Resolved configuration after applying precedence rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerConfig {
    /// Maximum materialized lines before the window is trimmed.
    pub capacity: usize,
    /// Events per history page.
    pub page_size: u64,
    /// Scroll rest-detection debounce.
    pub rest_debounce: Duration,
    /// Path to the tracing log file.
    pub log_file_path: PathBuf,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            capacity: 500,
            page_size: 50,
            rest_debounce: Duration::from_millis(250),
            log_file_path: default_log_path(),
        }
    }
}

/// Resolve the default log file path.
///
/// `~/.local/state/jolv/jolv.log` on Unix-like systems, with the platform
/// state directory resolved by `dirs`.
fn default_log_path() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("jolv")
        .join("jolv.log")
}

/// Load the config file, if one exists.
///
/// An explicit `path` must exist and parse; the default location is allowed
/// to be absent.
///
/// # Errors
///
/// [`ConfigError::ReadError`] when an explicitly requested file cannot be
/// read, [`ConfigError::ParseError`] for invalid TOML in either case.
pub fn load_config(path: Option<PathBuf>) -> Result<Option<ConfigFile>, ConfigError> {
    let (path, required) = match path {
        Some(path) => (path, true),
        None => {
            let Some(config_dir) = dirs::config_dir() else {
                return Ok(None);
            };
            (config_dir.join("jolv").join("config.toml"), false)
        }
    };

    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(_) if !required => return Ok(None),
        Err(err) => {
            return Err(ConfigError::ReadError {
                path,
                reason: err.to_string(),
            });
        }
    };

    let parsed = toml::from_str(&contents).map_err(|err| ConfigError::ParseError {
        path,
        reason: err.to_string(),
    })?;
    Ok(Some(parsed))
}

/// Merge a loaded config file over the defaults.
pub fn resolve(file: Option<ConfigFile>) -> ViewerConfig {
    let file = file.unwrap_or_default();
    let defaults = ViewerConfig::default();
    ViewerConfig {
        capacity: file.capacity.unwrap_or(defaults.capacity),
        page_size: file.page_size.unwrap_or(defaults.page_size),
        rest_debounce: file
            .rest_debounce_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.rest_debounce),
        log_file_path: file.log_file_path.unwrap_or(defaults.log_file_path),
    }
}

/// Apply `JOLV_*` environment overrides on top of a resolved config.
///
/// Recognized variables: `JOLV_CAPACITY`, `JOLV_PAGE_SIZE`,
/// `JOLV_REST_DEBOUNCE_MS`, `JOLV_LOG_FILE`. Unparseable values are
/// ignored with a warning rather than failing startup.
pub fn apply_env_overrides(mut config: ViewerConfig) -> ViewerConfig {
    if let Some(capacity) = env_parse::<usize>("JOLV_CAPACITY") {
        config.capacity = capacity;
    }
    if let Some(page_size) = env_parse::<u64>("JOLV_PAGE_SIZE") {
        config.page_size = page_size;
    }
    if let Some(ms) = env_parse::<u64>("JOLV_REST_DEBOUNCE_MS") {
        config.rest_debounce = Duration::from_millis(ms);
    }
    if let Ok(path) = std::env::var("JOLV_LOG_FILE") {
        config.log_file_path = PathBuf::from(path);
    }
    config
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(%name, %raw, "ignoring unparseable environment override");
            None
        }
    }
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
