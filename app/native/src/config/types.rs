//! Configuration types and file discovery for Reel.

use std::fs;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default display name for timelines created without one.
pub const DEFAULT_TIMELINE_NAME: &str = "Timeline";

/// Default request buffer of a timeline actor.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Settings applied to newly spawned timelines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct TimelineConfig {
    /// Name given to timelines that are not named explicitly.
    pub name: String,

    /// Capacity of the timeline request channel.
    pub channel_buffer: usize,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_TIMELINE_NAME.to_string(),
            channel_buffer: DEFAULT_CHANNEL_BUFFER,
        }
    }
}

impl TimelineConfig {
    /// Returns the channel capacity, never zero.
    #[must_use]
    pub fn buffer(&self) -> usize { self.channel_buffer.max(1) }
}

/// A hotkey binding as written in the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct HotkeyConfig {
    /// Key sequence such as `"Ctrl+Shift+S"` or `"Alt+page up"`.
    pub sequence: String,

    /// Display name. Together with `component` it identifies the hotkey.
    pub name: String,

    /// Component the hotkey belongs to.
    pub component: String,

    /// Free-form description shown in listings.
    pub description: String,

    /// Context in which the hotkey is active. Empty or `"any"` matches all.
    pub context: String,

    /// Whether holding the key fires repeatedly.
    pub auto_repeat: bool,
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ReelConfig {
    /// Timeline defaults.
    pub timeline: TimelineConfig,

    /// Hotkey bindings, in registration order.
    pub hotkeys: Vec<HotkeyConfig>,
}

/// Errors that can occur when loading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No configuration file was found in any of the expected locations.
    #[error(
        "No configuration file found. Expected at ~/.config/reel/config.jsonc, \
         the platform config directory, or ~/.reel.jsonc"
    )]
    NotFound,

    /// The configuration file exists but could not be read.
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// The configuration file contains invalid JSON.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Configuration file names to search for (in priority order).
const CONFIG_FILE_NAMES: &[&str] = &["config.jsonc", "config.json"];

/// Legacy configuration file names in home directory.
const LEGACY_CONFIG_FILE_NAMES: &[&str] = &[".reel.jsonc", ".reel.json"];

/// Returns the possible configuration file paths in priority order.
///
/// 1. `$XDG_CONFIG_HOME/reel/config.jsonc` or `config.json`, if set
/// 2. `~/.config/reel/config.jsonc` or `config.json`
/// 3. `<platform config dir>/reel/config.jsonc` or `config.json`
/// 4. `~/.reel.jsonc` or `~/.reel.json`
#[must_use]
pub fn config_paths() -> Vec<PathBuf> {
    fn push_dir(dir: &Path, paths: &mut Vec<PathBuf>) {
        for filename in CONFIG_FILE_NAMES {
            let path = dir.join(filename);
            // XDG_CONFIG_HOME may already point at ~/.config
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }

    let mut paths = Vec::new();

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        push_dir(&PathBuf::from(xdg_config).join("reel"), &mut paths);
    }

    if let Some(home) = dirs::home_dir() {
        push_dir(&home.join(".config").join("reel"), &mut paths);
    }

    if let Some(config_dir) = dirs::config_dir() {
        push_dir(&config_dir.join("reel"), &mut paths);
    }

    if let Some(home) = dirs::home_dir() {
        for filename in LEGACY_CONFIG_FILE_NAMES {
            paths.push(home.join(filename));
        }
    }

    paths
}

/// Parses a configuration from JSONC text.
///
/// # Errors
///
/// Returns `ConfigError::ParseError` if the text is not valid JSON once
/// comments are stripped.
pub fn parse_config(text: &str) -> Result<ReelConfig, ConfigError> {
    let reader = json_comments::StripComments::new(text.as_bytes());
    Ok(serde_json::from_reader(reader)?)
}

/// Loads the configuration from the first available config file.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if no configuration file exists in any of
/// the expected locations, or the errors of [`load_config_from_path`].
pub fn load_config() -> Result<(ReelConfig, PathBuf), ConfigError> {
    config_paths()
        .into_iter()
        .find(|path| path.exists())
        .map_or(Err(ConfigError::NotFound), load_config_from_path)
}

/// Loads the configuration from a specific file.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if the file does not exist,
/// `ConfigError::IoError` if it cannot be read, and
/// `ConfigError::ParseError` if it is not valid JSONC.
pub fn load_config_from_path(path: impl AsRef<Path>) -> Result<(ReelConfig, PathBuf), ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConfigError::NotFound);
    }
    let file = fs::File::open(path)?;
    let reader = json_comments::StripComments::new(file);
    let config: ReelConfig = serde_json::from_reader(reader)?;
    Ok((config, path.to_path_buf()))
}
