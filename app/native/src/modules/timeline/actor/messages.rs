//! Message types for the timeline actor.
//!
//! - `TimelineMessage` - mutation requests and commands sent to the actor
//! - `TimelineQuery` / `TimelineResult` - read-only requests and answers
//! - `TimelineEvent` - changes published to subscribers
//! - `TimelineNotice` - lifecycle notices sent to an associated playhead

use eyeball::Subscriber;
use eyeball_im::VectorSubscriber;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::actor::WeakAddress;
use crate::events::SubscriptionId;
use crate::modules::timeline::item::{ItemEvent, ItemHandle, ItemSnapshot};
use crate::modules::timeline::{ItemRecord, TimelineError, TreeEntry};

/// Responder for a mutation request.
pub type Reply<T> = oneshot::Sender<Result<T, TimelineError>>;

// ============================================================================
// Timeline Messages
// ============================================================================

/// Messages sent to the timeline actor.
pub enum TimelineMessage {
    // ════════════════════════════════════════════════════════════════════════
    // Mutations
    // ════════════════════════════════════════════════════════════════════════
    /// Append an item. `snapshot` is the item's state when it was handed over.
    AddItem {
        snapshot: ItemSnapshot,
        handle: ItemHandle,
        respond_to: Reply<()>,
    },

    RemoveItem {
        id: Uuid,
        respond_to: Reply<ItemRecord>,
    },

    ReplaceItem {
        id: Uuid,
        snapshot: ItemSnapshot,
        handle: ItemHandle,
        in_place: bool,
        respond_to: Reply<ItemHandle>,
    },

    /// Apply a structural description.
    Deserialize {
        description: Value,
        replace: bool,
        respond_to: Reply<Vec<ItemHandle>>,
    },

    /// Acknowledge the current content as saved.
    ClearContentChanged,

    // ════════════════════════════════════════════════════════════════════════
    // Observation
    // ════════════════════════════════════════════════════════════════════════
    Subscribe {
        subscription: SubscriptionId,
        sink: mpsc::UnboundedSender<TimelineEvent>,
    },

    Unsubscribe { subscription: SubscriptionId },

    /// Associate a playhead that is told when the timeline goes away.
    SetPlayhead {
        playhead: Option<WeakAddress<TimelineNotice>>,
    },

    SubscribeContentChanged {
        respond_to: oneshot::Sender<Subscriber<bool>>,
    },

    SubscribeStructure {
        respond_to: oneshot::Sender<VectorSubscriber<TreeEntry>>,
    },

    // ════════════════════════════════════════════════════════════════════════
    // Queries and lifecycle
    // ════════════════════════════════════════════════════════════════════════
    Query {
        query: TimelineQuery,
        respond_to: oneshot::Sender<TimelineResult>,
    },

    /// Tear the timeline down and stop.
    Shutdown,
}

impl TimelineMessage {
    /// Returns a short name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AddItem { .. } => "AddItem",
            Self::RemoveItem { .. } => "RemoveItem",
            Self::ReplaceItem { .. } => "ReplaceItem",
            Self::Deserialize { .. } => "Deserialize",
            Self::ClearContentChanged => "ClearContentChanged",
            Self::Subscribe { .. } => "Subscribe",
            Self::Unsubscribe { .. } => "Unsubscribe",
            Self::SetPlayhead { .. } => "SetPlayhead",
            Self::SubscribeContentChanged { .. } => "SubscribeContentChanged",
            Self::SubscribeStructure { .. } => "SubscribeStructure",
            Self::Query { .. } => "Query",
            Self::Shutdown => "Shutdown",
        }
    }
}

impl std::fmt::Debug for TimelineMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Queries
// ============================================================================

#[derive(Debug, Clone)]
pub enum TimelineQuery {
    GetContentChanged,
    /// Item records in tree order.
    Serialize,
    GetItemIds,
    GetItem { id: Uuid },
    GetInfo,
}

#[derive(Debug, Clone)]
pub enum TimelineResult {
    ContentChanged(bool),
    Structure(Vec<ItemRecord>),
    ItemIds(Vec<Uuid>),
    Item(Option<ItemRecord>),
    Info(TimelineInfo),
}

/// Summary of a timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineInfo {
    pub id: Uuid,
    pub name: String,
    pub items: usize,
    pub content_changed: bool,
}

// ============================================================================
// Events
// ============================================================================

/// A change published on the timeline's event channel.
///
/// `source` is the item an item-originated change came from, and the
/// timeline itself for everything else.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEvent {
    pub source: Uuid,
    pub change: TimelineChange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TimelineChange {
    ItemAdded { record: ItemRecord },
    ItemRemoved { id: Uuid },
    ItemReplaced { previous: Uuid, record: ItemRecord },
    Deserialized { items: Vec<Uuid> },
    /// An item changed its own content.
    Item { event: ItemEvent },
    ContentChanged { changed: bool },
    Closing,
}

/// Lifecycle notice for an associated playhead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TimelineNotice {
    Closing { timeline: Uuid },
}
