//! Item actors.
//!
//! Every item of a timeline runs as its own task. It owns its record, bumps
//! a revision counter on each change and publishes an [`ItemEvent`] to its
//! subscribers. The timeline mirrors records from those events instead of
//! querying its items.

mod handle;
mod messages;

use std::panic::{AssertUnwindSafe, catch_unwind};

pub use handle::ItemHandle;
pub use messages::{ItemChange, ItemEvent, ItemMessage, ItemSnapshot};
use tokio::sync::mpsc;

use super::ItemRecord;
use crate::actor::ActorId;
use crate::events::EventChannel;

/// The actor owning one item.
pub struct ItemActor {
    actor: ActorId,
    record: ItemRecord,
    revision: u64,
    channel: EventChannel<ItemEvent>,
    receiver: mpsc::UnboundedReceiver<ItemMessage>,
}

impl ItemActor {
    /// Spawn an item actor for `record`.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(record: ItemRecord) -> ItemHandle {
        let (sender, receiver) = mpsc::unbounded_channel();
        let actor = ActorId::new();
        let handle = ItemHandle::new(record.id, record.item_type, actor, sender);

        tracing::trace!("item: spawning {} {}", record.item_type, record.id);
        let item = Self {
            actor,
            record,
            revision: 0,
            channel: EventChannel::new(),
            receiver,
        };
        tokio::spawn(item.run());

        handle
    }

    async fn run(mut self) {
        while let Some(msg) = self.receiver.recv().await {
            if matches!(msg, ItemMessage::Shutdown) {
                tracing::trace!("item: {} shutting down", self.record.id);
                self.channel.clear();
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
                tracing::error!(
                    "item: PANIC in {} while handling '{msg_name}': {panic_msg}",
                    self.record.id
                );
            }
        }

        tracing::trace!("item: {} channel closed, exiting", self.record.id);
    }

    fn handle_message(&mut self, msg: ItemMessage) {
        match msg {
            ItemMessage::Subscribe { subscription, sink, known_revision } => {
                if known_revision.is_some_and(|known| known != self.revision) {
                    let _ = sink.send(self.event(ItemChange::Resync));
                }
                self.channel.attach(subscription, sink);
            }
            ItemMessage::Unsubscribe { subscription } => {
                self.channel.unsubscribe(subscription);
            }
            ItemMessage::SetName { name } => {
                if name != self.record.name {
                    self.record.name = name;
                    self.changed(ItemChange::Renamed);
                }
            }
            ItemMessage::SetContent { content } => {
                self.record.content = content;
                self.changed(ItemChange::ContentChanged);
            }
            ItemMessage::Refresh { record } => {
                self.record.item_type = record.item_type;
                self.record.name = record.name;
                self.record.content = record.content;
                self.changed(ItemChange::Refreshed);
            }
            ItemMessage::Snapshot { respond_to } => {
                let _ = respond_to.send(ItemSnapshot {
                    record: self.record.clone(),
                    revision: self.revision,
                });
            }
            ItemMessage::Shutdown => {}
        }
    }

    fn changed(&mut self, change: ItemChange) {
        self.revision += 1;
        let event = self.event(change);
        self.channel.publish(&event);
    }

    fn event(&self, change: ItemChange) -> ItemEvent {
        ItemEvent {
            item_id: self.record.id,
            actor: self.actor,
            revision: self.revision,
            change,
            record: self.record.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::events::Subscription;
    use crate::modules::timeline::ItemType;

    async fn next(sub: &mut Subscription<ItemEvent>) -> ItemEvent {
        tokio::time::timeout(Duration::from_secs(1), sub.recv())
            .await
            .expect("timed out waiting for item event")
            .expect("subscription closed")
    }

    #[tokio::test]
    async fn test_changes_bump_revision_and_publish() {
        let handle = ItemActor::spawn(ItemRecord::new(ItemType::Clip).with_name("A001"));
        let mut events = handle.subscribe_events().unwrap();

        handle.set_name("A002").unwrap();
        handle.set_content(json!({ "frames": 48 })).unwrap();

        let renamed = next(&mut events).await;
        assert_eq!(renamed.change, ItemChange::Renamed);
        assert_eq!(renamed.revision, 1);
        assert_eq!(renamed.record.name, "A002");
        assert_eq!(renamed.actor, handle.actor());

        let content = next(&mut events).await;
        assert_eq!(content.change, ItemChange::ContentChanged);
        assert_eq!(content.revision, 2);

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.revision, 2);
        assert_eq!(snapshot.record.content, json!({ "frames": 48 }));
        handle.shutdown().unwrap();
    }

    #[tokio::test]
    async fn test_same_name_is_not_a_change() {
        let handle = ItemActor::spawn(ItemRecord::new(ItemType::Gap).with_name("gap"));
        let mut events = handle.subscribe_events().unwrap();

        handle.set_name("gap").unwrap();
        assert_eq!(handle.snapshot().await.unwrap().revision, 0);
        assert!(events.try_recv().is_none());
        handle.shutdown().unwrap();
    }

    #[tokio::test]
    async fn test_stale_subscriber_gets_resync() {
        let handle = ItemActor::spawn(ItemRecord::new(ItemType::Marker));
        handle.set_name("cue").unwrap();

        let (sink, receiver) = mpsc::unbounded_channel();
        let mut sub = Subscription { id: crate::events::SubscriptionId::next(), receiver };
        handle.subscribe(sub.id, sink, Some(0)).unwrap();

        let resync = next(&mut sub).await;
        assert_eq!(resync.change, ItemChange::Resync);
        assert_eq!(resync.revision, 1);
        assert_eq!(resync.record.name, "cue");
        handle.shutdown().unwrap();
    }

    #[tokio::test]
    async fn test_refresh_keeps_id() {
        let original = ItemRecord::new(ItemType::Clip);
        let handle = ItemActor::spawn(original.clone());

        handle
            .refresh(ItemRecord::new(ItemType::Gap).with_name("filler"))
            .unwrap();

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.record.id, original.id);
        assert_eq!(snapshot.record.item_type, ItemType::Gap);
        assert_eq!(snapshot.record.name, "filler");
        assert_eq!(snapshot.revision, 1);
        handle.shutdown().unwrap();
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_events() {
        let handle = ItemActor::spawn(ItemRecord::new(ItemType::Clip));
        let mut events = handle.subscribe_events().unwrap();

        handle.unsubscribe(events.id).unwrap();
        handle.set_name("after").unwrap();
        handle.snapshot().await.unwrap();

        assert!(events.recv().await.is_none());
        handle.shutdown().unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_closes_handle() {
        let handle = ItemActor::spawn(ItemRecord::new(ItemType::Stack));
        let mut events = handle.subscribe_events().unwrap();
        handle.shutdown().unwrap();

        assert!(events.recv().await.is_none());
        assert!(handle.snapshot().await.is_err());
        assert!(!handle.is_alive());
    }
}
