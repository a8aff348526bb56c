//! A single hotkey binding and its press/release state machine.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::keys::{self, KeyParseError, Modifiers};
use super::watchers::WatcherRegistry;
use crate::actor::{ActorId, WeakAddress};
use crate::config::HotkeyConfig;

/// Namespace for name-based hotkey ids.
const HOTKEY_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a3e_8d4b_5e7f_9a0b_1c2d_3e4f_5a6b);

/// Notification delivered to hotkey watchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotkeyEvent {
    pub hotkey_id: Uuid,
    pub pressed: bool,
}

/// A keyboard shortcut bound to a key code and an exact modifier mask.
///
/// The id is derived from `name + component`, so registering a binding with
/// the same name and component again refers to the same hotkey even if the
/// key changed. Watchers are held weakly and pruned when they go away.
#[derive(Debug, Clone)]
pub struct Hotkey {
    key: i32,
    modifiers: Modifiers,
    id: Uuid,
    name: String,
    component: String,
    description: String,
    context: String,
    auto_repeat: bool,
    pressed: bool,
    watchers: WatcherRegistry<HotkeyEvent>,
}

impl Hotkey {
    /// Creates a released binding with an empty context and no watchers.
    #[must_use]
    pub fn new(
        key: i32,
        modifiers: Modifiers,
        name: impl Into<String>,
        component: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let component = component.into();
        Self {
            key,
            modifiers,
            id: Self::id_for(&name, &component),
            name,
            component,
            description: String::new(),
            context: String::new(),
            auto_repeat: false,
            pressed: false,
            watchers: WatcherRegistry::new(),
        }
    }

    /// Builds a binding from its configuration entry.
    ///
    /// # Errors
    ///
    /// Returns [`KeyParseError`] if the configured sequence cannot be parsed.
    pub fn from_config(config: &HotkeyConfig) -> Result<Self, KeyParseError> {
        let (key, modifiers) = keys::parse_sequence(&config.sequence)?;
        Ok(Self::new(key, modifiers, &config.name, &config.component)
            .with_description(&config.description)
            .with_context(&config.context)
            .with_auto_repeat(config.auto_repeat))
    }

    /// Returns the id every binding named `name` in `component` shares.
    #[must_use]
    pub fn id_for(name: &str, component: &str) -> Uuid {
        Uuid::new_v5(&HOTKEY_NAMESPACE, format!("{name}{component}").as_bytes())
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    #[must_use]
    pub const fn with_auto_repeat(mut self, auto_repeat: bool) -> Self {
        self.auto_repeat = auto_repeat;
        self
    }

    /// Adds a watcher registered under the binding's own context.
    #[must_use]
    pub fn with_watcher(mut self, watcher: WeakAddress<HotkeyEvent>) -> Self {
        self.add_watcher(watcher);
        self
    }

    #[must_use]
    pub const fn id(&self) -> Uuid { self.id }

    #[must_use]
    pub const fn key_code(&self) -> i32 { self.key }

    #[must_use]
    pub const fn modifiers(&self) -> Modifiers { self.modifiers }

    #[must_use]
    pub fn name(&self) -> &str { &self.name }

    #[must_use]
    pub fn component(&self) -> &str { &self.component }

    #[must_use]
    pub fn description(&self) -> &str { &self.description }

    #[must_use]
    pub fn context(&self) -> &str { &self.context }

    #[must_use]
    pub const fn auto_repeat(&self) -> bool { self.auto_repeat }

    #[must_use]
    pub const fn is_pressed(&self) -> bool { self.pressed }

    #[must_use]
    pub const fn watchers(&self) -> &WatcherRegistry<HotkeyEvent> { &self.watchers }

    /// Registers a watcher under the binding's context.
    pub fn add_watcher(&mut self, watcher: WeakAddress<HotkeyEvent>) {
        let context = self.context.clone();
        self.watchers.upsert(watcher, context);
    }

    /// Registers a watcher under an explicit context.
    pub fn add_watcher_with_context(
        &mut self,
        watcher: WeakAddress<HotkeyEvent>,
        context: impl Into<String>,
    ) {
        self.watchers.upsert(watcher, context);
    }

    /// Drops the watcher with identity `id`. Returns whether it was present.
    pub fn remove_watcher(&mut self, id: ActorId) -> bool { self.watchers.remove(id) }

    /// Takes the binding and watchers of a newer definition.
    ///
    /// Key, modifiers and auto-repeat are overwritten, watchers are merged by
    /// identity. The pressed state is kept. Returns whether the key or the
    /// modifiers changed.
    pub fn update(&mut self, other: &Self) -> bool {
        let changed = other.key != self.key || other.modifiers != self.modifiers;
        self.key = other.key;
        self.modifiers = other.modifiers;
        self.auto_repeat = other.auto_repeat;
        self.watchers.merge(&other.watchers);
        changed
    }

    /// Evaluates the binding against the keys currently held down.
    ///
    /// The binding is pressed while its key is held and the held modifiers
    /// match its mask exactly. Watchers are notified on every transition and,
    /// while pressed, on auto-repeat input if the binding allows it. Returns
    /// whether watchers were notified.
    pub fn update_state(
        &mut self,
        current_keys: &BTreeSet<i32>,
        context: &str,
        auto_repeat: bool,
    ) -> bool {
        let observed = keys::observed_modifiers(current_keys);
        let key_present = current_keys.contains(&self.key);

        if observed == self.modifiers && key_present {
            if !self.pressed {
                self.pressed = true;
                self.notify_watchers(context);
                return true;
            }
            if auto_repeat && self.auto_repeat {
                self.notify_watchers(context);
                return true;
            }
            return false;
        }

        if self.pressed {
            self.pressed = false;
            self.notify_watchers(context);
            return true;
        }
        false
    }

    fn notify_watchers(&mut self, context: &str) {
        let event = HotkeyEvent {
            hotkey_id: self.id,
            pressed: self.pressed,
        };
        let delivered = self.watchers.notify(context, &event);
        tracing::trace!(
            "hotkeys: '{}' pressed={} delivered to {delivered} watcher(s)",
            self.name,
            self.pressed
        );
    }

    /// Returns the bound key as a single character.
    #[must_use]
    pub fn key(&self) -> String { keys::key_char(self.key) }

    /// Returns a label such as `Ctrl+Shift+S`.
    #[must_use]
    pub fn sequence(&self) -> String { keys::sequence_label(self.key, self.modifiers) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Mailbox;

    const KEY_A: i32 = 65;
    const KEY_CTRL: i32 = 16;

    fn ctrl_a() -> Hotkey {
        Hotkey::new(KEY_A, Modifiers::CONTROL, "Select All", "timeline").with_context("viewer")
    }

    #[test]
    fn test_press_repeat_release_cycle() {
        let mut watcher: Mailbox<HotkeyEvent> = Mailbox::new();
        let mut hotkey = ctrl_a().with_watcher(watcher.address());
        let held = BTreeSet::from([KEY_A, KEY_CTRL]);

        assert!(hotkey.update_state(&held, "viewer", false));
        assert!(hotkey.is_pressed());
        assert_eq!(
            watcher.drain(),
            vec![HotkeyEvent { hotkey_id: hotkey.id(), pressed: true }]
        );

        assert!(!hotkey.update_state(&held, "viewer", false));
        assert!(watcher.drain().is_empty());

        assert!(hotkey.update_state(&BTreeSet::new(), "viewer", false));
        assert!(!hotkey.is_pressed());
        assert_eq!(
            watcher.drain(),
            vec![HotkeyEvent { hotkey_id: hotkey.id(), pressed: false }]
        );
    }

    #[test]
    fn test_auto_repeat_requires_binding_flag() {
        let mut watcher: Mailbox<HotkeyEvent> = Mailbox::new();
        let held = BTreeSet::from([KEY_A, KEY_CTRL]);

        let mut plain = ctrl_a().with_watcher(watcher.address());
        plain.update_state(&held, "viewer", false);
        assert!(!plain.update_state(&held, "viewer", true));
        assert_eq!(watcher.drain().len(), 1);

        let mut repeating = ctrl_a().with_auto_repeat(true).with_watcher(watcher.address());
        repeating.update_state(&held, "viewer", false);
        assert!(repeating.update_state(&held, "viewer", true));
        assert!(repeating.update_state(&held, "viewer", true));
        assert_eq!(watcher.drain().len(), 3);
        assert!(repeating.is_pressed());
    }

    #[test]
    fn test_modifier_mask_must_match_exactly() {
        let mut hotkey = ctrl_a();
        let with_shift = BTreeSet::from([KEY_A, KEY_CTRL, 0x0100_0020]);
        assert!(!hotkey.update_state(&with_shift, "viewer", false));
        assert!(!hotkey.is_pressed());

        let without_ctrl = BTreeSet::from([KEY_A]);
        assert!(!hotkey.update_state(&without_ctrl, "viewer", false));
        assert!(!hotkey.is_pressed());
    }

    #[test]
    fn test_extra_modifier_releases_pressed_binding() {
        let mut hotkey = ctrl_a();
        hotkey.update_state(&BTreeSet::from([KEY_A, KEY_CTRL]), "viewer", false);
        assert!(hotkey.is_pressed());

        let with_alt = BTreeSet::from([KEY_A, KEY_CTRL, 17]);
        assert!(hotkey.update_state(&with_alt, "viewer", false));
        assert!(!hotkey.is_pressed());
    }

    #[test]
    fn test_notification_respects_watcher_context() {
        let mut viewer: Mailbox<HotkeyEvent> = Mailbox::new();
        let mut anywhere: Mailbox<HotkeyEvent> = Mailbox::new();
        let mut hotkey = ctrl_a();
        hotkey.add_watcher_with_context(viewer.address(), "viewer");
        hotkey.add_watcher_with_context(anywhere.address(), "any");

        hotkey.update_state(&BTreeSet::from([KEY_A, KEY_CTRL]), "playlist", false);

        assert!(viewer.drain().is_empty());
        assert_eq!(anywhere.drain().len(), 1);
    }

    #[test]
    fn test_id_derived_from_name_and_component() {
        let a = Hotkey::new(KEY_A, Modifiers::CONTROL, "Play", "viewer");
        let b = Hotkey::new(66, Modifiers::ALT, "Play", "viewer");
        let c = Hotkey::new(KEY_A, Modifiers::CONTROL, "Play", "timeline");

        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
        assert_eq!(a.id(), Hotkey::id_for("Play", "viewer"));
    }

    #[test]
    fn test_update_reports_binding_change_and_keeps_pressed() {
        let first: Mailbox<HotkeyEvent> = Mailbox::new();
        let second: Mailbox<HotkeyEvent> = Mailbox::new();

        let mut current = ctrl_a().with_watcher(first.address());
        current.update_state(&BTreeSet::from([KEY_A, KEY_CTRL]), "viewer", false);

        let same_binding = ctrl_a().with_auto_repeat(true).with_watcher(second.address());
        assert!(!current.update(&same_binding));
        assert!(current.auto_repeat());
        assert!(current.is_pressed());
        assert_eq!(current.watchers().len(), 2);

        let rebound = Hotkey::new(66, Modifiers::CONTROL, "Select All", "timeline")
            .with_watcher(first.address());
        assert!(current.update(&rebound));
        assert_eq!(current.key_code(), 66);
        assert_eq!(current.watchers().len(), 2);
        assert!(current.is_pressed());
    }

    #[test]
    fn test_dead_watcher_does_not_block_transition() {
        let dead: Mailbox<HotkeyEvent> = Mailbox::new();
        let mut hotkey = ctrl_a().with_watcher(dead.address());
        drop(dead);

        assert!(hotkey.update_state(&BTreeSet::from([KEY_A, KEY_CTRL]), "viewer", false));
        assert!(hotkey.is_pressed());
        assert!(hotkey.watchers().is_empty());
    }

    #[test]
    fn test_from_config() {
        let config = HotkeyConfig {
            sequence: "Ctrl+Shift+S".to_string(),
            name: "Save".to_string(),
            component: "session".to_string(),
            description: "Save the session".to_string(),
            context: "any".to_string(),
            auto_repeat: false,
        };

        let hotkey = Hotkey::from_config(&config).unwrap();
        assert_eq!(hotkey.key_code(), 83);
        assert_eq!(hotkey.modifiers(), Modifiers::CONTROL | Modifiers::SHIFT);
        assert_eq!(hotkey.sequence(), "Ctrl+Shift+S");
        assert_eq!(hotkey.key(), "S");
        assert_eq!(hotkey.id(), Hotkey::id_for("Save", "session"));
    }
}
