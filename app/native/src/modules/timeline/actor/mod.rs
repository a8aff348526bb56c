//! Timeline actor module.
//!
//! The timeline actor owns one [`ItemTree`] and one [`EventChannel`] and
//! processes requests sequentially. Its loop waits on two inboxes: requests
//! from handles, and change events from its own items. Handlers never await,
//! so a request is fully applied before the next message is looked at.
//!
//! Every successful mutation and every accepted item event sets the
//! "content changed" flag. Only [`TimelineMessage::ClearContentChanged`]
//! clears it.
//!
//! # Panic Recovery
//!
//! A panicking handler is caught and logged. The actor keeps running, though
//! the tree may be left partially updated.

mod handle;
mod messages;

use std::panic::{AssertUnwindSafe, catch_unwind};

use eyeball::Observable;
pub use handle::TimelineHandle;
pub use messages::{
    Reply, TimelineChange, TimelineEvent, TimelineInfo, TimelineMessage, TimelineNotice,
    TimelineQuery, TimelineResult,
};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::item::ItemEvent;
use super::{ItemTree, TimelineError};
use crate::actor::WeakAddress;
use crate::config::{DEFAULT_CHANNEL_BUFFER, TimelineConfig};
use crate::events::EventChannel;

/// The actor that owns a timeline.
pub struct TimelineActor {
    id: Uuid,
    name: String,
    tree: ItemTree,
    channel: EventChannel<TimelineEvent>,
    content_changed: Observable<bool>,
    playhead: Option<WeakAddress<TimelineNotice>>,
    receiver: mpsc::Receiver<TimelineMessage>,
    item_events: mpsc::UnboundedReceiver<ItemEvent>,
}

impl TimelineActor {
    /// Spawn an empty timeline with a fresh id.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(name: impl Into<String>) -> TimelineHandle {
        Self::spawn_with(Uuid::now_v7(), name, DEFAULT_CHANNEL_BUFFER)
    }

    /// Spawn an empty timeline named and sized from configuration.
    #[must_use]
    pub fn spawn_from_config(config: &TimelineConfig) -> TimelineHandle {
        Self::spawn_with(Uuid::now_v7(), &config.name, config.buffer())
    }

    /// Spawn an empty timeline with an explicit id and request buffer.
    #[must_use]
    pub fn spawn_with(id: Uuid, name: impl Into<String>, buffer: usize) -> TimelineHandle {
        let name = name.into();
        tracing::debug!("timeline: spawning '{name}' ({id})");
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        let (sink, item_events) = mpsc::unbounded_channel();

        let actor = Self {
            id,
            name,
            tree: ItemTree::new(sink),
            channel: EventChannel::new(),
            content_changed: Observable::new(false),
            playhead: None,
            receiver,
            item_events,
        };
        tokio::spawn(actor.run());

        TimelineHandle::new(id, sender)
    }

    async fn run(mut self) {
        tracing::trace!("timeline: '{}' message loop starting", self.name);

        loop {
            tokio::select! {
                msg = self.receiver.recv() => {
                    let Some(msg) = msg else {
                        tracing::debug!("timeline: '{}' channel closed", self.name);
                        break;
                    };
                    if matches!(msg, TimelineMessage::Shutdown) {
                        tracing::debug!("timeline: '{}' received shutdown message", self.name);
                        break;
                    }
                    let msg_name = msg.name();
                    self.guarded(msg_name, |actor| actor.handle_message(msg));
                }
                Some(event) = self.item_events.recv() => {
                    self.guarded("ItemEvent", |actor| actor.on_item_event(&event));
                }
            }
        }

        self.teardown();
    }

    /// Runs a handler, recovering from panics.
    fn guarded(&mut self, what: &str, handler: impl FnOnce(&mut Self)) {
        let result = catch_unwind(AssertUnwindSafe(|| handler(self)));

        if let Err(panic_info) = result {
            let panic_msg = panic_info
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic_info.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(
                "timeline: PANIC in '{}' while handling '{what}': {panic_msg}",
                self.name
            );
        }
    }

    fn handle_message(&mut self, msg: TimelineMessage) {
        match msg {
            TimelineMessage::AddItem { snapshot, handle, respond_to } => {
                let record = snapshot.record.clone();
                let result = self.tree.add(snapshot, handle);
                if result.is_ok() {
                    self.structure_changed(TimelineChange::ItemAdded { record });
                }
                Self::reply(respond_to, "AddItem", result);
            }
            TimelineMessage::RemoveItem { id, respond_to } => {
                let result = self.tree.remove(id);
                if result.is_ok() {
                    self.structure_changed(TimelineChange::ItemRemoved { id });
                }
                Self::reply(respond_to, "RemoveItem", result);
            }
            TimelineMessage::ReplaceItem { id, snapshot, handle, in_place, respond_to } => {
                let result = self.tree.replace(id, snapshot, handle, in_place);
                if let Ok(now) = &result
                    && let Some(entry) = self.tree.get(now.id())
                {
                    let record = entry.record().clone();
                    self.structure_changed(TimelineChange::ItemReplaced { previous: id, record });
                }
                Self::reply(respond_to, "ReplaceItem", result);
            }
            TimelineMessage::Deserialize { description, replace, respond_to } => {
                let result = self.tree.deserialize(&description, replace);
                if let Ok(handles) = &result
                    && !handles.is_empty()
                {
                    let items = handles.iter().map(|h| h.id()).collect();
                    self.structure_changed(TimelineChange::Deserialized { items });
                }
                Self::reply(respond_to, "Deserialize", result);
            }
            TimelineMessage::ClearContentChanged => self.set_content_changed(false),
            TimelineMessage::Subscribe { subscription, sink } => {
                self.channel.attach(subscription, sink);
            }
            TimelineMessage::Unsubscribe { subscription } => {
                self.channel.unsubscribe(subscription);
            }
            TimelineMessage::SetPlayhead { playhead } => self.playhead = playhead,
            TimelineMessage::SubscribeContentChanged { respond_to } => {
                let _ = respond_to.send(Observable::subscribe(&self.content_changed));
            }
            TimelineMessage::SubscribeStructure { respond_to } => {
                let _ = respond_to.send(self.tree.subscribe());
            }
            TimelineMessage::Query { query, respond_to } => {
                let _ = respond_to.send(self.answer(query));
            }
            TimelineMessage::Shutdown => {}
        }
    }

    /// Callback for events published by items in the tree.
    fn on_item_event(&mut self, event: &ItemEvent) {
        if !self.tree.on_item_event(event) {
            return;
        }
        self.set_content_changed(true);
        self.channel.publish(&TimelineEvent {
            source: event.item_id,
            change: TimelineChange::Item { event: event.clone() },
        });
    }

    fn structure_changed(&mut self, change: TimelineChange) {
        self.set_content_changed(true);
        self.channel.publish(&TimelineEvent { source: self.id, change });
    }

    fn set_content_changed(&mut self, changed: bool) {
        if Observable::set_if_not_eq(&mut self.content_changed, changed).is_some() {
            self.channel.publish(&TimelineEvent {
                source: self.id,
                change: TimelineChange::ContentChanged { changed },
            });
        }
    }

    fn reply<T>(respond_to: Reply<T>, what: &str, result: Result<T, TimelineError>) {
        if let Err(err) = &result {
            tracing::debug!("timeline: {what} rejected: {err}");
        }
        let _ = respond_to.send(result);
    }

    fn answer(&self, query: TimelineQuery) -> TimelineResult {
        match query {
            TimelineQuery::GetContentChanged => {
                TimelineResult::ContentChanged(*Observable::get(&self.content_changed))
            }
            TimelineQuery::Serialize => TimelineResult::Structure(self.tree.serialize()),
            TimelineQuery::GetItemIds => TimelineResult::ItemIds(self.tree.ids()),
            TimelineQuery::GetItem { id } => {
                TimelineResult::Item(self.tree.get(id).map(|e| e.record().clone()))
            }
            TimelineQuery::GetInfo => TimelineResult::Info(TimelineInfo {
                id: self.id,
                name: self.name.clone(),
                items: self.tree.len(),
                content_changed: *Observable::get(&self.content_changed),
            }),
        }
    }

    /// Releases every item, then tells the playhead and subscribers.
    fn teardown(&mut self) {
        tracing::debug!(
            "timeline: tearing down '{}' with {} item(s)",
            self.name,
            self.tree.len()
        );
        self.tree.teardown();

        if let Some(playhead) = self.playhead.take()
            && !playhead.send(TimelineNotice::Closing { timeline: self.id })
        {
            tracing::trace!("timeline: playhead already gone");
        }

        self.channel.publish(&TimelineEvent { source: self.id, change: TimelineChange::Closing });
        self.channel.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::actor::Mailbox;
    use crate::events::Subscription;
    use crate::modules::timeline::item::ItemActor;
    use crate::modules::timeline::{ItemRecord, ItemType};

    async fn next(sub: &mut Subscription<TimelineEvent>) -> TimelineEvent {
        tokio::time::timeout(Duration::from_secs(1), sub.recv())
            .await
            .expect("timed out waiting for timeline event")
            .expect("subscription closed")
    }

    /// Waits for the next event that is not a flag toggle.
    async fn next_change(sub: &mut Subscription<TimelineEvent>) -> TimelineChange {
        loop {
            let event = next(sub).await;
            if !matches!(event.change, TimelineChange::ContentChanged { .. }) {
                return event.change;
            }
        }
    }

    #[tokio::test]
    async fn test_add_and_remove_set_content_changed() {
        let timeline = TimelineActor::spawn("Edit");
        assert!(!timeline.content_changed().await.unwrap());

        let item = timeline.add_record(ItemRecord::new(ItemType::Clip)).await.unwrap();
        assert!(timeline.content_changed().await.unwrap());

        timeline.clear_content_changed().await.unwrap();
        assert!(!timeline.content_changed().await.unwrap());

        timeline.remove_item(item.id()).await.unwrap();
        assert!(timeline.content_changed().await.unwrap());
        assert!(timeline.item_ids().await.unwrap().is_empty());
        timeline.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_add_is_rejected() {
        let timeline = TimelineActor::spawn("Edit");
        let item = ItemActor::spawn(ItemRecord::new(ItemType::Clip));
        timeline.add_item(item.clone()).await.unwrap();

        let err = timeline.add_item(item.clone()).await.unwrap_err();
        assert_eq!(err, TimelineError::DuplicateIdentifier(item.id()));
        assert_eq!(timeline.item_ids().await.unwrap(), vec![item.id()]);
        timeline.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_flag_clear() {
        let timeline = TimelineActor::spawn("Edit");

        let missing = Uuid::now_v7();
        assert_eq!(
            timeline.remove_item(missing).await,
            Err(TimelineError::NotFound(missing))
        );
        let malformed = timeline.deserialize(json!({ "items": [{ "type": "clip" }] }), false).await;
        assert!(matches!(malformed, Err(TimelineError::MalformedStructure(_))));

        assert!(!timeline.content_changed().await.unwrap());
        timeline.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_item_change_is_republished() {
        let timeline = TimelineActor::spawn("Edit");
        let item = timeline.add_record(ItemRecord::new(ItemType::Clip)).await.unwrap();
        timeline.clear_content_changed().await.unwrap();
        let mut events = timeline.subscribe().await.unwrap();

        item.set_name("A002").unwrap();

        let event = loop {
            let event = next(&mut events).await;
            if event.source == item.id() {
                break event;
            }
        };
        let TimelineChange::Item { event: item_event } = event.change else {
            panic!("expected an item change, got {:?}", event.change);
        };
        assert_eq!(item_event.record.name, "A002");
        assert!(timeline.content_changed().await.unwrap());
        assert_eq!(timeline.item(item.id()).await.unwrap().unwrap().name, "A002");
        timeline.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_content_changed_subscriber_follows_flag() {
        let timeline = TimelineActor::spawn("Edit");
        let mut flag = timeline.subscribe_content_changed().await.unwrap();
        assert!(!flag.get());

        timeline.add_record(ItemRecord::new(ItemType::Gap)).await.unwrap();
        assert_eq!(flag.next().await, Some(true));

        timeline.clear_content_changed().await.unwrap();
        assert_eq!(flag.next().await, Some(false));
        timeline.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_structure_events_are_published() {
        let timeline = TimelineActor::spawn("Edit");
        let mut events = timeline.subscribe().await.unwrap();

        let item = timeline.add_record(ItemRecord::new(ItemType::Track)).await.unwrap();
        assert!(matches!(
            next_change(&mut events).await,
            TimelineChange::ItemAdded { record } if record.id == item.id()
        ));

        let replacement = ItemActor::spawn(ItemRecord::new(ItemType::Stack));
        timeline.replace_item(item.id(), replacement.clone(), false).await.unwrap();
        assert!(matches!(
            next_change(&mut events).await,
            TimelineChange::ItemReplaced { previous, record }
                if previous == item.id() && record.id == replacement.id()
        ));
        assert_eq!(timeline.item_ids().await.unwrap(), vec![replacement.id()]);
        timeline.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_serialize_deserialize_round_trip() {
        let source = TimelineActor::spawn("Source");
        source.add_record(ItemRecord::new(ItemType::Track).with_name("V1")).await.unwrap();
        source
            .add_record(ItemRecord::new(ItemType::Clip).with_content(json!({ "in": 0, "out": 24 })))
            .await
            .unwrap();
        let description = source.description().await.unwrap();

        let copy = TimelineActor::spawn("Copy");
        let handles = copy.deserialize(description, false).await.unwrap();

        assert_eq!(handles.len(), 2);
        assert_eq!(copy.item_ids().await.unwrap(), source.item_ids().await.unwrap());
        assert_eq!(copy.serialize().await.unwrap(), source.serialize().await.unwrap());
        assert!(copy.content_changed().await.unwrap());
        source.shutdown().await.unwrap();
        copy.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_notifies_playhead_and_releases_items() {
        let timeline = TimelineActor::spawn("Edit");
        let mut playhead: Mailbox<TimelineNotice> = Mailbox::new();
        timeline.set_playhead(Some(playhead.address())).await.unwrap();
        let item = timeline.add_record(ItemRecord::new(ItemType::Clip)).await.unwrap();
        let mut events = timeline.subscribe().await.unwrap();

        timeline.shutdown().await.unwrap();

        let notice = tokio::time::timeout(Duration::from_secs(1), playhead.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(notice, TimelineNotice::Closing { timeline: timeline.id() });
        assert_eq!(next_change(&mut events).await, TimelineChange::Closing);
        assert!(events.recv().await.is_none());
        assert!(item.snapshot().await.is_err());
    }

    #[tokio::test]
    async fn test_dead_playhead_does_not_block_teardown() {
        let timeline = TimelineActor::spawn("Edit");
        let playhead: Mailbox<TimelineNotice> = Mailbox::new();
        timeline.set_playhead(Some(playhead.address())).await.unwrap();
        drop(playhead);
        let mut events = timeline.subscribe().await.unwrap();

        timeline.shutdown().await.unwrap();
        assert_eq!(next_change(&mut events).await, TimelineChange::Closing);
    }

    #[tokio::test]
    async fn test_info() {
        let id = Uuid::now_v7();
        let timeline = TimelineActor::spawn_with(id, "Conform", 8);
        timeline.add_record(ItemRecord::new(ItemType::Marker)).await.unwrap();

        let info = timeline.info().await.unwrap();
        assert_eq!(info.id, id);
        assert_eq!(info.name, "Conform");
        assert_eq!(info.items, 1);
        assert!(info.content_changed);
        timeline.shutdown().await.unwrap();
    }
}
