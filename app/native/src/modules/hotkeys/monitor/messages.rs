//! Message types for the keypress monitor.
//!
//! - `MonitorMessage` - key input and registration sent to the monitor
//! - `MonitorQuery` - requests for hotkey data (with response channel)
//! - `MonitorResult` - responses from queries

use std::collections::BTreeSet;

use serde::Serialize;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::actor::{ActorId, WeakAddress};
use crate::modules::hotkeys::{Hotkey, HotkeyEvent};

// ============================================================================
// Monitor Messages
// ============================================================================

/// Messages sent to the keypress monitor.
#[derive(Debug)]
pub enum MonitorMessage {
    // ════════════════════════════════════════════════════════════════════════
    // Key input
    // ════════════════════════════════════════════════════════════════════════
    /// A key went down. `auto_repeat` is set for repeats of a held key.
    KeyDown {
        key: i32,
        context: String,
        auto_repeat: bool,
    },

    /// A key was released.
    KeyUp { key: i32, context: String },

    /// Every key was released at once (focus lost, for instance).
    AllKeysUp { context: String },

    /// Replace the held keys with a full snapshot.
    Snapshot {
        keys: BTreeSet<i32>,
        context: String,
        auto_repeat: bool,
    },

    // ════════════════════════════════════════════════════════════════════════
    // Registration
    // ════════════════════════════════════════════════════════════════════════
    /// Register a hotkey, or update the one sharing its id.
    RegisterHotkey {
        hotkey: Box<Hotkey>,
        respond_to: oneshot::Sender<Uuid>,
    },

    /// Add a watcher to a registered hotkey.
    ///
    /// Without an explicit context the watcher inherits the hotkey's one.
    WatchHotkey {
        hotkey_id: Uuid,
        watcher: WeakAddress<HotkeyEvent>,
        context: Option<String>,
        respond_to: oneshot::Sender<bool>,
    },

    /// Remove a watcher from a registered hotkey.
    UnwatchHotkey {
        hotkey_id: Uuid,
        watcher: ActorId,
        respond_to: oneshot::Sender<bool>,
    },

    // ════════════════════════════════════════════════════════════════════════
    // Queries and lifecycle
    // ════════════════════════════════════════════════════════════════════════
    /// Query monitor state.
    Query {
        query: MonitorQuery,
        respond_to: oneshot::Sender<MonitorResult>,
    },

    /// Stop the monitor.
    Shutdown,
}

impl MonitorMessage {
    /// Returns a short name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::KeyDown { .. } => "KeyDown",
            Self::KeyUp { .. } => "KeyUp",
            Self::AllKeysUp { .. } => "AllKeysUp",
            Self::Snapshot { .. } => "Snapshot",
            Self::RegisterHotkey { .. } => "RegisterHotkey",
            Self::WatchHotkey { .. } => "WatchHotkey",
            Self::UnwatchHotkey { .. } => "UnwatchHotkey",
            Self::Query { .. } => "Query",
            Self::Shutdown => "Shutdown",
        }
    }
}

// ============================================================================
// Queries
// ============================================================================

/// Queries answered by the keypress monitor.
#[derive(Debug, Clone)]
pub enum MonitorQuery {
    /// Every registered hotkey, in registration order.
    GetHotkeys,

    /// A single hotkey by id.
    GetHotkey { id: Uuid },

    /// Keys currently held down.
    GetPressedKeys,
}

/// Results of monitor queries.
#[derive(Debug, Clone)]
pub enum MonitorResult {
    Hotkeys(Vec<HotkeyInfo>),
    Hotkey(Option<HotkeyInfo>),
    PressedKeys(Vec<i32>),
}

/// Serializable summary of a hotkey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotkeyInfo {
    pub id: Uuid,
    pub name: String,
    pub component: String,
    pub description: String,
    pub context: String,
    pub sequence: String,
    pub key_code: i32,
    pub modifiers: u32,
    pub auto_repeat: bool,
    pub pressed: bool,
    pub watchers: usize,
}

impl From<&Hotkey> for HotkeyInfo {
    fn from(hotkey: &Hotkey) -> Self {
        Self {
            id: hotkey.id(),
            name: hotkey.name().to_string(),
            component: hotkey.component().to_string(),
            description: hotkey.description().to_string(),
            context: hotkey.context().to_string(),
            sequence: hotkey.sequence(),
            key_code: hotkey.key_code(),
            modifiers: hotkey.modifiers().bits(),
            auto_repeat: hotkey.auto_repeat(),
            pressed: hotkey.is_pressed(),
            watchers: hotkey.watchers().len(),
        }
    }
}
