//! Viewer configuration.
//!
//! Resolution follows the precedence chain: hardcoded defaults, then the
//! TOML config file, then `JOLV_*` environment overrides.

pub mod loader;

pub use loader::{
    apply_env_overrides, load_config, resolve, ConfigError, ConfigFile, ViewerConfig,
};
