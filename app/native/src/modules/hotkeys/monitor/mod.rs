//! Keypress monitor actor.
//!
//! The monitor owns every registered [`Hotkey`] and the set of keys held
//! down. Each key input updates that set and re-evaluates all hotkeys in
//! registration order, which in turn notify their watchers. Watchers never
//! talk to the monitor after registering; they only receive
//! [`HotkeyEvent`](crate::modules::hotkeys::HotkeyEvent) values.
//!
//! # Panic Recovery
//!
//! A panicking handler is caught and logged, and the monitor keeps
//! processing input.

mod handle;
mod messages;

use std::collections::BTreeSet;
use std::panic::{AssertUnwindSafe, catch_unwind};

pub use handle::MonitorHandle;
pub use messages::{HotkeyInfo, MonitorMessage, MonitorQuery, MonitorResult};
use tokio::sync::mpsc;

use super::Hotkey;

/// Channel buffer size for the monitor.
const CHANNEL_BUFFER_SIZE: usize = 256;

/// The actor that turns key input into hotkey transitions.
pub struct KeypressMonitor {
    hotkeys: Vec<Hotkey>,
    held: BTreeSet<i32>,
    receiver: mpsc::Receiver<MonitorMessage>,
}

impl KeypressMonitor {
    /// Spawn a monitor with no hotkeys.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn() -> MonitorHandle { Self::spawn_with(Vec::new()) }

    /// Spawn a monitor preloaded with `hotkeys`.
    ///
    /// Hotkeys sharing an id are folded together with [`Hotkey::update`].
    #[must_use]
    pub fn spawn_with(hotkeys: impl IntoIterator<Item = Hotkey>) -> MonitorHandle {
        tracing::debug!("hotkeys: spawning keypress monitor");
        let (sender, receiver) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        let mut actor = Self {
            hotkeys: Vec::new(),
            held: BTreeSet::new(),
            receiver,
        };
        for hotkey in hotkeys {
            actor.register(hotkey);
        }

        tokio::spawn(actor.run());
        MonitorHandle::new(sender)
    }

    async fn run(mut self) {
        tracing::trace!("hotkeys: monitor loop starting");

        while let Some(msg) = self.receiver.recv().await {
            if matches!(msg, MonitorMessage::Shutdown) {
                tracing::debug!("hotkeys: monitor received shutdown message");
                return;
            }

            let msg_name = msg.name();
            let result = catch_unwind(AssertUnwindSafe(|| self.handle_message(msg)));

            if let Err(panic_info) = result {
                let panic_msg = panic_info
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic_info.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!("hotkeys: PANIC in monitor while handling '{msg_name}': {panic_msg}");
            }
        }

        tracing::debug!("hotkeys: monitor channel closed, exiting");
    }

    fn handle_message(&mut self, msg: MonitorMessage) {
        match msg {
            MonitorMessage::KeyDown { key, context, auto_repeat } => {
                self.held.insert(key);
                self.evaluate(&context, auto_repeat);
            }
            MonitorMessage::KeyUp { key, context } => {
                self.held.remove(&key);
                self.evaluate(&context, false);
            }
            MonitorMessage::AllKeysUp { context } => {
                self.held.clear();
                self.evaluate(&context, false);
            }
            MonitorMessage::Snapshot { keys, context, auto_repeat } => {
                self.held = keys;
                self.evaluate(&context, auto_repeat);
            }
            MonitorMessage::RegisterHotkey { hotkey, respond_to } => {
                let id = self.register(*hotkey);
                let _ = respond_to.send(id);
            }
            MonitorMessage::WatchHotkey { hotkey_id, watcher, context, respond_to } => {
                let found = self.hotkeys.iter_mut().find(|h| h.id() == hotkey_id);
                let watched = found.is_some_and(|hotkey| {
                    match context {
                        Some(context) => hotkey.add_watcher_with_context(watcher, context),
                        None => hotkey.add_watcher(watcher),
                    }
                    true
                });
                if !watched {
                    tracing::warn!("hotkeys: watch requested for unknown hotkey {hotkey_id}");
                }
                let _ = respond_to.send(watched);
            }
            MonitorMessage::UnwatchHotkey { hotkey_id, watcher, respond_to } => {
                let removed = self
                    .hotkeys
                    .iter_mut()
                    .find(|h| h.id() == hotkey_id)
                    .is_some_and(|hotkey| hotkey.remove_watcher(watcher));
                let _ = respond_to.send(removed);
            }
            MonitorMessage::Query { query, respond_to } => {
                let _ = respond_to.send(self.answer(query));
            }
            MonitorMessage::Shutdown => {}
        }
    }

    fn register(&mut self, hotkey: Hotkey) -> uuid::Uuid {
        let id = hotkey.id();
        if let Some(existing) = self.hotkeys.iter_mut().find(|h| h.id() == id) {
            if existing.update(&hotkey) {
                tracing::debug!(
                    "hotkeys: '{}' rebound to {}",
                    existing.name(),
                    existing.sequence()
                );
            }
        } else {
            tracing::debug!("hotkeys: registered '{}' as {}", hotkey.name(), hotkey.sequence());
            self.hotkeys.push(hotkey);
        }
        id
    }

    fn evaluate(&mut self, context: &str, auto_repeat: bool) {
        for hotkey in &mut self.hotkeys {
            hotkey.update_state(&self.held, context, auto_repeat);
        }
    }

    fn answer(&self, query: MonitorQuery) -> MonitorResult {
        match query {
            MonitorQuery::GetHotkeys => {
                MonitorResult::Hotkeys(self.hotkeys.iter().map(HotkeyInfo::from).collect())
            }
            MonitorQuery::GetHotkey { id } => MonitorResult::Hotkey(
                self.hotkeys.iter().find(|h| h.id() == id).map(HotkeyInfo::from),
            ),
            MonitorQuery::GetPressedKeys => {
                MonitorResult::PressedKeys(self.held.iter().copied().collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::actor::Mailbox;
    use crate::modules::hotkeys::{HotkeyEvent, Modifiers};

    const KEY_A: i32 = 65;
    const KEY_CTRL: i32 = 16;

    fn select_all() -> Hotkey {
        Hotkey::new(KEY_A, Modifiers::CONTROL, "Select All", "timeline").with_context("viewer")
    }

    async fn next_event(mailbox: &mut Mailbox<HotkeyEvent>) -> HotkeyEvent {
        tokio::time::timeout(Duration::from_secs(1), mailbox.recv())
            .await
            .expect("timed out waiting for hotkey event")
            .expect("mailbox closed")
    }

    #[tokio::test]
    async fn test_key_down_sequence_presses_and_releases() {
        let handle = KeypressMonitor::spawn();
        let id = handle.register_hotkey(select_all()).await.unwrap();

        let mut watcher: Mailbox<HotkeyEvent> = Mailbox::new();
        assert!(handle.watch_hotkey(id, watcher.address(), None).await.unwrap());

        handle.key_down(KEY_CTRL, "viewer", false).await.unwrap();
        handle.key_down(KEY_A, "viewer", false).await.unwrap();
        assert_eq!(next_event(&mut watcher).await, HotkeyEvent { hotkey_id: id, pressed: true });

        handle.key_up(KEY_A, "viewer").await.unwrap();
        assert_eq!(next_event(&mut watcher).await, HotkeyEvent { hotkey_id: id, pressed: false });

        assert_eq!(handle.pressed_keys().await.unwrap(), vec![KEY_CTRL]);
        handle.shutdown().unwrap();
    }

    #[tokio::test]
    async fn test_snapshot_repeat_without_auto_repeat_is_silent() {
        let handle = KeypressMonitor::spawn();
        let id = handle.register_hotkey(select_all()).await.unwrap();
        let mut watcher: Mailbox<HotkeyEvent> = Mailbox::new();
        handle.watch_hotkey(id, watcher.address(), None).await.unwrap();

        let held = BTreeSet::from([KEY_A, KEY_CTRL]);
        handle.snapshot(held.clone(), "viewer", false).await.unwrap();
        handle.snapshot(held, "viewer", true).await.unwrap();
        handle.all_keys_up("viewer").await.unwrap();

        // Round trip so every input above has been handled.
        assert!(handle.pressed_keys().await.unwrap().is_empty());
        let events = watcher.drain();
        assert_eq!(events.len(), 2);
        assert!(events[0].pressed);
        assert!(!events[1].pressed);
        handle.shutdown().unwrap();
    }

    #[tokio::test]
    async fn test_register_same_identity_updates_binding() {
        let handle = KeypressMonitor::spawn();
        let first = handle.register_hotkey(select_all()).await.unwrap();
        let rebound = Hotkey::new(66, Modifiers::CONTROL, "Select All", "timeline");
        let second = handle.register_hotkey(rebound).await.unwrap();

        assert_eq!(first, second);
        let hotkeys = handle.hotkeys().await.unwrap();
        assert_eq!(hotkeys.len(), 1);
        assert_eq!(hotkeys[0].key_code, 66);
        assert_eq!(hotkeys[0].sequence, "Ctrl+B");
        handle.shutdown().unwrap();
    }

    #[tokio::test]
    async fn test_watch_unknown_hotkey() {
        let handle = KeypressMonitor::spawn();
        let watcher: Mailbox<HotkeyEvent> = Mailbox::new();
        let unknown = Hotkey::id_for("nope", "nowhere");

        assert!(!handle.watch_hotkey(unknown, watcher.address(), None).await.unwrap());
        assert!(handle.hotkey(unknown).await.unwrap().is_none());
        handle.shutdown().unwrap();
    }

    #[tokio::test]
    async fn test_explicit_watch_context_overrides_binding_context() {
        let handle = KeypressMonitor::spawn_with([select_all()]);
        let id = Hotkey::id_for("Select All", "timeline");
        let mut watcher: Mailbox<HotkeyEvent> = Mailbox::new();
        handle
            .watch_hotkey(id, watcher.address(), Some("playlist".to_string()))
            .await
            .unwrap();

        handle.snapshot(BTreeSet::from([KEY_A, KEY_CTRL]), "viewer", false).await.unwrap();
        assert!(handle.hotkey(id).await.unwrap().is_some_and(|h| h.pressed));
        assert!(watcher.try_recv().is_none());

        handle.snapshot(BTreeSet::new(), "playlist", false).await.unwrap();
        assert_eq!(next_event(&mut watcher).await, HotkeyEvent { hotkey_id: id, pressed: false });
        handle.shutdown().unwrap();
    }

    #[tokio::test]
    async fn test_unwatched_mailbox_receives_nothing() {
        let handle = KeypressMonitor::spawn();
        let id = handle.register_hotkey(select_all()).await.unwrap();
        let mut kept: Mailbox<HotkeyEvent> = Mailbox::new();
        let mut dropped: Mailbox<HotkeyEvent> = Mailbox::new();
        handle.watch_hotkey(id, kept.address(), None).await.unwrap();
        handle.watch_hotkey(id, dropped.address(), None).await.unwrap();

        assert!(handle.unwatch_hotkey(id, dropped.id()).await.unwrap());
        assert!(!handle.unwatch_hotkey(id, dropped.id()).await.unwrap());
        assert!(!handle.unwatch_hotkey(Hotkey::id_for("nope", "nowhere"), kept.id()).await.unwrap());
        assert_eq!(handle.hotkey(id).await.unwrap().map(|h| h.watchers), Some(1));

        handle.snapshot(BTreeSet::from([KEY_A, KEY_CTRL]), "viewer", false).await.unwrap();
        assert_eq!(next_event(&mut kept).await, HotkeyEvent { hotkey_id: id, pressed: true });
        assert!(dropped.try_recv().is_none());
        handle.shutdown().unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_stops_monitor() {
        let handle = KeypressMonitor::spawn();
        handle.shutdown().unwrap();

        let result = handle.query_timeout(MonitorQuery::GetHotkeys, Duration::from_secs(1)).await;
        assert!(result.is_err());
    }
}
