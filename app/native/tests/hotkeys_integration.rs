//! Integration tests for hotkeys: configuration through the keypress
//! monitor to watcher mailboxes.

use std::collections::BTreeSet;
use std::time::Duration;

use reel_lib::actor::Mailbox;
use reel_lib::config::parse_config;
use reel_lib::modules::hotkeys::{self, Hotkey, HotkeyEvent, KeypressMonitor, MonitorHandle};

const KEY_SHIFT: i32 = 0x0100_0020;
const KEY_CTRL: i32 = 0x0100_0021;
const KEY_S: i32 = 83;
const KEY_SPACE: i32 = 32;

const CONFIG: &str = r#"{
    // Bindings are identified by name + component.
    "hotkeys": [
        { "sequence": "Ctrl+Shift+S", "name": "Save As", "component": "session" },
        { "sequence": "Space", "name": "Play", "component": "viewer", "context": "viewer" },
        { "sequence": "Ctrl+Bogus", "name": "Broken", "component": "session" }
    ]
}"#;

async fn monitor_from_config() -> MonitorHandle {
    let config = parse_config(CONFIG).unwrap();
    KeypressMonitor::spawn_with(hotkeys::from_config(&config.hotkeys))
}

async fn next_event(mailbox: &mut Mailbox<HotkeyEvent>) -> HotkeyEvent {
    tokio::time::timeout(Duration::from_secs(1), mailbox.recv())
        .await
        .expect("timed out waiting for hotkey event")
        .expect("mailbox closed")
}

#[tokio::test]
async fn test_configured_hotkeys_are_registered_in_order() {
    let monitor = monitor_from_config().await;
    let infos = monitor.hotkeys().await.unwrap();

    let sequences: Vec<_> = infos.iter().map(|info| info.sequence.as_str()).collect();
    assert_eq!(sequences, ["Ctrl+Shift+S", "Space"]);
    assert_eq!(infos[0].id, Hotkey::id_for("Save As", "session"));
    monitor.shutdown().unwrap();
}

#[tokio::test]
async fn test_key_input_drives_watchers() {
    let monitor = monitor_from_config().await;
    let save_as = Hotkey::id_for("Save As", "session");
    let mut watcher: Mailbox<HotkeyEvent> = Mailbox::new();
    assert!(monitor.watch_hotkey(save_as, watcher.address(), None).await.unwrap());

    for key in [KEY_CTRL, KEY_SHIFT, KEY_S] {
        monitor.key_down(key, "timeline", false).await.unwrap();
    }
    assert_eq!(next_event(&mut watcher).await, HotkeyEvent { hotkey_id: save_as, pressed: true });

    monitor.all_keys_up("timeline").await.unwrap();
    assert_eq!(next_event(&mut watcher).await, HotkeyEvent { hotkey_id: save_as, pressed: false });
    assert!(monitor.pressed_keys().await.unwrap().is_empty());
    monitor.shutdown().unwrap();
}

#[tokio::test]
async fn test_watchers_only_hear_their_context() {
    let monitor = monitor_from_config().await;
    let play = Hotkey::id_for("Play", "viewer");

    let mut viewer: Mailbox<HotkeyEvent> = Mailbox::new();
    let mut anywhere: Mailbox<HotkeyEvent> = Mailbox::new();
    monitor.watch_hotkey(play, viewer.address(), None).await.unwrap();
    monitor.watch_hotkey(play, anywhere.address(), Some("any".to_string())).await.unwrap();

    monitor.snapshot(BTreeSet::from([KEY_SPACE]), "playlist", false).await.unwrap();
    assert_eq!(next_event(&mut anywhere).await, HotkeyEvent { hotkey_id: play, pressed: true });

    // Drain the monitor before checking the quiet watcher.
    monitor.pressed_keys().await.unwrap();
    assert!(viewer.try_recv().is_none());

    monitor.snapshot(BTreeSet::new(), "viewer", false).await.unwrap();
    assert_eq!(next_event(&mut viewer).await, HotkeyEvent { hotkey_id: play, pressed: false });
    assert_eq!(next_event(&mut anywhere).await, HotkeyEvent { hotkey_id: play, pressed: false });
    monitor.shutdown().unwrap();
}

#[tokio::test]
async fn test_dropped_watcher_is_pruned_on_next_notification() {
    let monitor = monitor_from_config().await;
    let play = Hotkey::id_for("Play", "viewer");

    let mut kept: Mailbox<HotkeyEvent> = Mailbox::new();
    let gone: Mailbox<HotkeyEvent> = Mailbox::new();
    monitor.watch_hotkey(play, kept.address(), Some("any".to_string())).await.unwrap();
    monitor.watch_hotkey(play, gone.address(), Some("any".to_string())).await.unwrap();
    assert_eq!(monitor.hotkey(play).await.unwrap().unwrap().watchers, 2);

    drop(gone);
    monitor.snapshot(BTreeSet::from([KEY_SPACE]), "viewer", false).await.unwrap();
    assert!(next_event(&mut kept).await.pressed);
    assert_eq!(monitor.hotkey(play).await.unwrap().unwrap().watchers, 1);
    monitor.shutdown().unwrap();
}

#[tokio::test]
async fn test_auto_repeat_requires_binding_opt_in() {
    let config = parse_config(
        r#"{ "hotkeys": [{ "sequence": "Ctrl+S", "name": "Nudge", "component": "timeline", "autoRepeat": true }] }"#,
    )
    .unwrap();
    let monitor = KeypressMonitor::spawn_with(hotkeys::from_config(&config.hotkeys));
    let nudge = Hotkey::id_for("Nudge", "timeline");
    let mut watcher: Mailbox<HotkeyEvent> = Mailbox::new();
    monitor.watch_hotkey(nudge, watcher.address(), None).await.unwrap();

    let held = BTreeSet::from([KEY_CTRL, KEY_S]);
    monitor.snapshot(held.clone(), "timeline", false).await.unwrap();
    monitor.snapshot(held.clone(), "timeline", true).await.unwrap();
    monitor.snapshot(held, "timeline", true).await.unwrap();

    monitor.pressed_keys().await.unwrap();
    let events = watcher.drain();
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|event| event.pressed));
    monitor.shutdown().unwrap();
}
