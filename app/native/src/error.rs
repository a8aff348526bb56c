//! Error types for Reel.
//!
//! `ReelError` is the error surfaced by the CLI. Subsystem errors convert
//! into it so commands can use `?` throughout.

use serde::Serialize;
use thiserror::Error;

use crate::actor::ActorError;
use crate::config::ConfigError;
use crate::modules::hotkeys::KeyParseError;
use crate::modules::timeline::TimelineError;

/// Errors that can occur while running a Reel command.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "kind", content = "message")]
pub enum ReelError {
    /// Invalid command arguments.
    #[error("{0}")]
    InvalidArguments(String),
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// Timeline operation failed.
    #[error("Timeline error: {0}")]
    TimelineError(String),
    /// Hotkey definition or monitor failure.
    #[error("Hotkey error: {0}")]
    HotkeyError(String),
    /// IO error.
    #[error("IO error: {0}")]
    IoError(String),
    /// Generic command error.
    #[error("{0}")]
    CommandError(String),
}

impl From<std::io::Error> for ReelError {
    fn from(err: std::io::Error) -> Self { Self::IoError(err.to_string()) }
}

impl From<serde_json::Error> for ReelError {
    fn from(err: serde_json::Error) -> Self { Self::CommandError(err.to_string()) }
}

impl From<String> for ReelError {
    fn from(msg: String) -> Self { Self::CommandError(msg) }
}

impl From<&str> for ReelError {
    fn from(msg: &str) -> Self { Self::CommandError(msg.to_string()) }
}

impl From<TimelineError> for ReelError {
    fn from(err: TimelineError) -> Self { Self::TimelineError(err.to_string()) }
}

impl From<ConfigError> for ReelError {
    fn from(err: ConfigError) -> Self { Self::ConfigError(err.to_string()) }
}

impl From<KeyParseError> for ReelError {
    fn from(err: KeyParseError) -> Self { Self::HotkeyError(err.to_string()) }
}

impl From<ActorError> for ReelError {
    fn from(err: ActorError) -> Self { Self::CommandError(err.to_string()) }
}
