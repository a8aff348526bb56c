//! Configuration module for Reel.
//!
//! The configuration file supports JSONC format (JSON with comments).
//! Both single-line (`//`) and multi-line (`/* */`) comments are allowed.

pub mod types;

use std::path::PathBuf;
use std::sync::OnceLock;

pub use types::{
    ConfigError, DEFAULT_CHANNEL_BUFFER, DEFAULT_TIMELINE_NAME, HotkeyConfig, ReelConfig,
    TimelineConfig, config_paths, load_config as load_config_default, load_config_from_path,
    parse_config,
};

/// Global configuration instance, loaded once.
static CONFIG: OnceLock<ReelConfig> = OnceLock::new();

/// Path to the currently loaded configuration file.
static CONFIG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Custom config path override (set via CLI --config flag).
static CUSTOM_CONFIG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Sets a custom configuration file path to use instead of the default search paths.
///
/// This must be called before `init()` or `get_config()` to take effect.
/// Returns `false` if a path was already set.
pub fn set_custom_config_path(path: PathBuf) -> bool { CUSTOM_CONFIG_PATH.set(path).is_ok() }

/// Returns the custom configuration path, if one was set.
pub fn custom_config_path() -> Option<&'static PathBuf> { CUSTOM_CONFIG_PATH.get() }

/// Loads the configuration from disk, or the defaults if that fails.
fn load_or_default() -> ReelConfig {
    let result = CUSTOM_CONFIG_PATH.get().map_or_else(load_config_default, load_config_from_path);

    match result {
        Ok((config, path)) => {
            tracing::debug!(path = %path.display(), "loaded configuration");
            let _ = CONFIG_PATH.set(path);
            config
        }
        Err(ConfigError::NotFound) => {
            tracing::debug!("no configuration file found, using defaults");
            ReelConfig::default()
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to load configuration, using defaults");
            ReelConfig::default()
        }
    }
}

/// Initializes and returns the global configuration instance.
///
/// Idempotent: later calls return the same instance.
pub fn init() -> &'static ReelConfig { CONFIG.get_or_init(load_or_default) }

/// Returns the global configuration instance, initializing it if necessary.
pub fn get_config() -> &'static ReelConfig { CONFIG.get_or_init(load_or_default) }

/// Returns the path to the loaded configuration file, if any.
pub fn get_config_path() -> Option<&'static PathBuf> { CONFIG_PATH.get() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_types_are_available() {
        let config = ReelConfig::default();
        assert!(config.hotkeys.is_empty());
        assert_eq!(config.timeline.name, DEFAULT_TIMELINE_NAME);
        assert_eq!(config.timeline.channel_buffer, DEFAULT_CHANNEL_BUFFER);
    }

    #[test]
    fn test_config_error() {
        let err = ConfigError::NotFound;
        assert!(err.to_string().contains("No configuration file found"));
    }

    #[test]
    fn test_get_config_is_stable() {
        let first: *const ReelConfig = get_config();
        let second: *const ReelConfig = init();
        assert_eq!(first, second);
    }
}
