//! Message and event types for item actors.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::actor::ActorId;
use crate::events::SubscriptionId;
use crate::modules::timeline::ItemRecord;

/// Messages sent to an item actor.
#[derive(Debug)]
pub enum ItemMessage {
    /// Start delivering change events to `sink`.
    ///
    /// If `known_revision` is behind the item, a `Resync` event is sent to
    /// the new subscriber right away.
    Subscribe {
        subscription: SubscriptionId,
        sink: mpsc::UnboundedSender<ItemEvent>,
        known_revision: Option<u64>,
    },

    /// Stop delivering change events for a subscription.
    Unsubscribe { subscription: SubscriptionId },

    SetName { name: String },

    SetContent { content: Value },

    /// Take the type, name and content of `record`, keeping the item id.
    Refresh { record: ItemRecord },

    Snapshot {
        respond_to: oneshot::Sender<ItemSnapshot>,
    },

    /// Drop every subscriber and stop.
    Shutdown,
}

impl ItemMessage {
    /// Returns a short name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Subscribe { .. } => "Subscribe",
            Self::Unsubscribe { .. } => "Unsubscribe",
            Self::SetName { .. } => "SetName",
            Self::SetContent { .. } => "SetContent",
            Self::Refresh { .. } => "Refresh",
            Self::Snapshot { .. } => "Snapshot",
            Self::Shutdown => "Shutdown",
        }
    }
}

/// Point-in-time copy of an item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSnapshot {
    pub record: ItemRecord,
    pub revision: u64,
}

/// What changed in an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemChange {
    Renamed,
    ContentChanged,
    Refreshed,
    /// Sent to a subscriber whose known revision was stale.
    Resync,
}

/// Change published by an item actor.
///
/// Carries the full record after the change so observers never need to ask
/// the item for its state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemEvent {
    pub item_id: Uuid,
    #[serde(skip)]
    pub actor: ActorId,
    pub revision: u64,
    pub change: ItemChange,
    pub record: ItemRecord,
}
