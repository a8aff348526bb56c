//! Handle for communicating with an item actor.

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::messages::{ItemEvent, ItemMessage, ItemSnapshot};
use crate::actor::{ActorError, ActorId};
use crate::events::{Subscription, SubscriptionId};
use crate::modules::timeline::{ItemRecord, ItemType};

/// Owning handle to an item actor.
///
/// Sending never waits, so the timeline actor can talk to its items from
/// inside its own message loop. The actor stops once it receives
/// [`ItemMessage::Shutdown`] or every handle has been dropped.
#[derive(Debug, Clone)]
pub struct ItemHandle {
    id: Uuid,
    item_type: ItemType,
    actor: ActorId,
    sender: mpsc::UnboundedSender<ItemMessage>,
}

impl ItemHandle {
    pub(crate) const fn new(
        id: Uuid,
        item_type: ItemType,
        actor: ActorId,
        sender: mpsc::UnboundedSender<ItemMessage>,
    ) -> Self {
        Self { id, item_type, actor, sender }
    }

    /// Returns the item id.
    #[must_use]
    pub const fn id(&self) -> Uuid { self.id }

    /// Returns the type the item was spawned with.
    #[must_use]
    pub const fn item_type(&self) -> ItemType { self.item_type }

    /// Returns the identity of the actor behind this handle.
    #[must_use]
    pub const fn actor(&self) -> ActorId { self.actor }

    /// Check whether the actor is still running.
    #[must_use]
    pub fn is_alive(&self) -> bool { !self.sender.is_closed() }

    /// Send a message without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the actor has stopped.
    pub fn send(&self, msg: ItemMessage) -> Result<(), ActorError> {
        self.sender.send(msg).map_err(|_| ActorError::SendFailed)
    }

    /// Route change events to `sink` under `subscription`.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the actor has stopped.
    pub fn subscribe(
        &self,
        subscription: SubscriptionId,
        sink: mpsc::UnboundedSender<ItemEvent>,
        known_revision: Option<u64>,
    ) -> Result<(), ActorError> {
        self.send(ItemMessage::Subscribe { subscription, sink, known_revision })
    }

    /// Subscribe with a fresh channel.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the actor has stopped.
    pub fn subscribe_events(&self) -> Result<Subscription<ItemEvent>, ActorError> {
        let (sink, receiver) = mpsc::unbounded_channel();
        let id = SubscriptionId::next();
        self.subscribe(id, sink, None)?;
        Ok(Subscription { id, receiver })
    }

    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the actor has stopped.
    pub fn unsubscribe(&self, subscription: SubscriptionId) -> Result<(), ActorError> {
        self.send(ItemMessage::Unsubscribe { subscription })
    }

    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the actor has stopped.
    pub fn set_name(&self, name: impl Into<String>) -> Result<(), ActorError> {
        self.send(ItemMessage::SetName { name: name.into() })
    }

    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the actor has stopped.
    pub fn set_content(&self, content: Value) -> Result<(), ActorError> {
        self.send(ItemMessage::SetContent { content })
    }

    /// Replace type, name and content in place.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the actor has stopped.
    pub fn refresh(&self, record: ItemRecord) -> Result<(), ActorError> {
        self.send(ItemMessage::Refresh { record })
    }

    /// Fetch the current record and revision.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the actor has stopped, or
    /// [`ActorError::ReceiveFailed`] if it stopped before answering.
    pub async fn snapshot(&self) -> Result<ItemSnapshot, ActorError> {
        let (tx, rx) = oneshot::channel();
        self.send(ItemMessage::Snapshot { respond_to: tx })?;
        rx.await.map_err(|_| ActorError::ReceiveFailed)
    }

    /// Ask the actor to stop.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the actor has already stopped.
    pub fn shutdown(&self) -> Result<(), ActorError> { self.send(ItemMessage::Shutdown) }
}

impl PartialEq for ItemHandle {
    fn eq(&self, other: &Self) -> bool { self.actor == other.actor }
}

impl Eq for ItemHandle {}
