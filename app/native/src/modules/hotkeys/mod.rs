//! Hotkeys: press/release state machines with watcher notification.
//!
//! - [`keys`] - key codes, modifier masks, labels and sequence parsing
//! - [`WatcherRegistry`] - weakly referenced watchers scoped by context
//! - [`Hotkey`] - one binding and its state machine
//! - [`monitor`] - the actor that feeds key input to every hotkey

mod hotkey;
pub mod keys;
pub mod monitor;
mod watchers;

pub use hotkey::{Hotkey, HotkeyEvent};
pub use keys::{KeyParseError, Modifiers};
pub use monitor::{HotkeyInfo, KeypressMonitor, MonitorHandle};
pub use watchers::{ANY_CONTEXT, WatcherEntry, WatcherRegistry};

use crate::config::HotkeyConfig;

/// Builds hotkeys from configuration entries.
///
/// Entries whose sequence cannot be parsed are skipped with a warning.
#[must_use]
pub fn from_config(entries: &[HotkeyConfig]) -> Vec<Hotkey> {
    entries
        .iter()
        .filter_map(|entry| match Hotkey::from_config(entry) {
            Ok(hotkey) => Some(hotkey),
            Err(err) => {
                tracing::warn!(
                    "hotkeys: skipping '{}' ({}): {err}",
                    entry.name,
                    entry.sequence
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(sequence: &str, name: &str) -> HotkeyConfig {
        HotkeyConfig {
            sequence: sequence.to_string(),
            name: name.to_string(),
            component: "viewer".to_string(),
            ..HotkeyConfig::default()
        }
    }

    #[test]
    fn test_from_config_skips_invalid_sequences() {
        let hotkeys = from_config(&[
            entry("Space", "Play"),
            entry("Hyper+X", "Broken"),
            entry("Ctrl+Z", "Undo"),
        ]);

        let names: Vec<_> = hotkeys.iter().map(Hotkey::name).collect();
        assert_eq!(names, ["Play", "Undo"]);
    }
}
