//! Handle for communicating with a timeline actor.

use std::time::Duration;

use eyeball::Subscriber;
use eyeball_im::VectorSubscriber;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::messages::{
    Reply, TimelineEvent, TimelineInfo, TimelineMessage, TimelineNotice, TimelineQuery,
    TimelineResult,
};
use crate::actor::{ActorError, WeakAddress};
use crate::events::{Subscription, SubscriptionId};
use crate::modules::timeline::item::{ItemActor, ItemHandle};
use crate::modules::timeline::{ItemRecord, TimelineError, TreeEntry, structure};

/// Handle for communicating with a timeline actor.
///
/// This handle is cheap to clone and can be shared across tasks.
#[derive(Debug, Clone)]
pub struct TimelineHandle {
    id: Uuid,
    sender: mpsc::Sender<TimelineMessage>,
}

impl TimelineHandle {
    pub(crate) const fn new(id: Uuid, sender: mpsc::Sender<TimelineMessage>) -> Self {
        Self { id, sender }
    }

    /// Returns the timeline id.
    #[must_use]
    pub const fn id(&self) -> Uuid { self.id }

    // ========================================================================
    // Sending
    // ========================================================================

    /// Send a message to the actor without waiting for delivery.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the channel is closed or full.
    pub fn send(&self, msg: TimelineMessage) -> Result<(), ActorError> {
        self.sender.try_send(msg).map_err(|_| ActorError::SendFailed)
    }

    /// Send a message to the actor and wait for delivery.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the channel is closed.
    pub async fn send_async(&self, msg: TimelineMessage) -> Result<(), ActorError> {
        self.sender.send(msg).await.map_err(|_| ActorError::SendFailed)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> TimelineMessage,
    ) -> Result<T, ActorError> {
        let (tx, rx) = oneshot::channel();
        self.send_async(make(tx)).await?;
        rx.await.map_err(|_| ActorError::ReceiveFailed)
    }

    async fn mutate<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> TimelineMessage,
    ) -> Result<T, TimelineError> {
        self.request(make).await?
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Add a live item to the end of the timeline.
    ///
    /// # Errors
    ///
    /// [`TimelineError::UnresolvableHandle`] if the item does not answer,
    /// [`TimelineError::DuplicateIdentifier`] if its id is already present.
    pub async fn add_item(&self, handle: ItemHandle) -> Result<(), TimelineError> {
        let snapshot = handle
            .snapshot()
            .await
            .map_err(|_| TimelineError::UnresolvableHandle(handle.id()))?;
        self.mutate(|respond_to| TimelineMessage::AddItem { snapshot, handle, respond_to })
            .await
    }

    /// Spawn an item for `record` and add it.
    ///
    /// The item is shut down again if the timeline rejects it.
    ///
    /// # Errors
    ///
    /// Same as [`Self::add_item`].
    pub async fn add_record(&self, record: ItemRecord) -> Result<ItemHandle, TimelineError> {
        let handle = ItemActor::spawn(record);
        match self.add_item(handle.clone()).await {
            Ok(()) => Ok(handle),
            Err(err) => {
                let _ = handle.shutdown();
                Err(err)
            }
        }
    }

    /// Remove an item and return its last record.
    ///
    /// # Errors
    ///
    /// [`TimelineError::NotFound`] if the id is absent.
    pub async fn remove_item(&self, id: Uuid) -> Result<ItemRecord, TimelineError> {
        self.mutate(|respond_to| TimelineMessage::RemoveItem { id, respond_to }).await
    }

    /// Replace the item `id` with `handle`, or refresh it in place.
    ///
    /// # Errors
    ///
    /// See [`ItemTree::replace`](crate::modules::timeline::ItemTree::replace).
    pub async fn replace_item(
        &self,
        id: Uuid,
        handle: ItemHandle,
        in_place: bool,
    ) -> Result<ItemHandle, TimelineError> {
        let snapshot = handle
            .snapshot()
            .await
            .map_err(|_| TimelineError::UnresolvableHandle(handle.id()))?;
        self.mutate(|respond_to| TimelineMessage::ReplaceItem {
            id,
            snapshot,
            handle,
            in_place,
            respond_to,
        })
        .await
    }

    /// Apply a structural description.
    ///
    /// # Errors
    ///
    /// [`TimelineError::MalformedStructure`] if the description is invalid.
    pub async fn deserialize(
        &self,
        description: Value,
        replace: bool,
    ) -> Result<Vec<ItemHandle>, TimelineError> {
        self.mutate(|respond_to| TimelineMessage::Deserialize { description, replace, respond_to })
            .await
    }

    /// Mark the current content as saved.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the actor has stopped.
    pub async fn clear_content_changed(&self) -> Result<(), ActorError> {
        self.send_async(TimelineMessage::ClearContentChanged).await
    }

    // ========================================================================
    // Observation
    // ========================================================================

    /// Subscribe to timeline events.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the actor has stopped.
    pub async fn subscribe(&self) -> Result<Subscription<TimelineEvent>, ActorError> {
        let (sink, receiver) = mpsc::unbounded_channel();
        let id = SubscriptionId::next();
        self.send_async(TimelineMessage::Subscribe { subscription: id, sink }).await?;
        Ok(Subscription { id, receiver })
    }

    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the actor has stopped.
    pub async fn unsubscribe(&self, subscription: SubscriptionId) -> Result<(), ActorError> {
        self.send_async(TimelineMessage::Unsubscribe { subscription }).await
    }

    /// Associate a playhead, or clear the association with `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the actor has stopped.
    pub async fn set_playhead(
        &self,
        playhead: Option<WeakAddress<TimelineNotice>>,
    ) -> Result<(), ActorError> {
        self.send_async(TimelineMessage::SetPlayhead { playhead }).await
    }

    /// Follow the "content changed" flag.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the actor fails.
    pub async fn subscribe_content_changed(&self) -> Result<Subscriber<bool>, ActorError> {
        self.request(|respond_to| TimelineMessage::SubscribeContentChanged { respond_to })
            .await
    }

    /// Follow structural changes of the item tree.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the actor fails.
    pub async fn subscribe_structure(&self) -> Result<VectorSubscriber<TreeEntry>, ActorError> {
        self.request(|respond_to| TimelineMessage::SubscribeStructure { respond_to }).await
    }

    // ========================================================================
    // Query methods
    // ========================================================================

    /// Execute a query and wait for the result.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the channel is closed, or
    /// [`ActorError::ReceiveFailed`] if the response channel is closed.
    pub async fn query(&self, query: TimelineQuery) -> Result<TimelineResult, ActorError> {
        self.request(|respond_to| TimelineMessage::Query { query, respond_to }).await
    }

    /// Execute a query with a timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::Timeout`] if the query doesn't complete in time,
    /// or any error from [`Self::query`].
    pub async fn query_timeout(
        &self,
        query: TimelineQuery,
        timeout: Duration,
    ) -> Result<TimelineResult, ActorError> {
        tokio::time::timeout(timeout, self.query(query))
            .await
            .map_err(|_| ActorError::Timeout(timeout))?
    }

    /// Get the "content changed" flag.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the actor fails.
    pub async fn content_changed(&self) -> Result<bool, ActorError> {
        match self.query(TimelineQuery::GetContentChanged).await? {
            TimelineResult::ContentChanged(changed) => Ok(changed),
            _ => Err(ActorError::ReceiveFailed),
        }
    }

    /// Get item records in tree order.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the actor fails.
    pub async fn serialize(&self) -> Result<Vec<ItemRecord>, ActorError> {
        match self.query(TimelineQuery::Serialize).await? {
            TimelineResult::Structure(records) => Ok(records),
            _ => Err(ActorError::ReceiveFailed),
        }
    }

    /// Get the structural description in `{ "items": [...] }` form.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the actor fails.
    pub async fn description(&self) -> Result<Value, ActorError> {
        Ok(structure::to_description(&self.serialize().await?))
    }

    /// Get item ids in tree order.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the actor fails.
    pub async fn item_ids(&self) -> Result<Vec<Uuid>, ActorError> {
        match self.query(TimelineQuery::GetItemIds).await? {
            TimelineResult::ItemIds(ids) => Ok(ids),
            _ => Err(ActorError::ReceiveFailed),
        }
    }

    /// Get the mirrored record of an item.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the actor fails.
    pub async fn item(&self, id: Uuid) -> Result<Option<ItemRecord>, ActorError> {
        match self.query(TimelineQuery::GetItem { id }).await? {
            TimelineResult::Item(record) => Ok(record),
            _ => Err(ActorError::ReceiveFailed),
        }
    }

    /// Get a summary of the timeline.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the actor fails.
    pub async fn info(&self) -> Result<TimelineInfo, ActorError> {
        match self.query(TimelineQuery::GetInfo).await? {
            TimelineResult::Info(info) => Ok(info),
            _ => Err(ActorError::ReceiveFailed),
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Check whether the actor is still running.
    #[must_use]
    pub fn is_alive(&self) -> bool { !self.sender.is_closed() }

    /// Ask the actor to tear down and stop.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the actor has already stopped.
    pub async fn shutdown(&self) -> Result<(), ActorError> {
        self.send_async(TimelineMessage::Shutdown).await
    }
}
