//! Publish/subscribe channel used by actors to broadcast changes.
//!
//! An [`EventChannel`] has one owner that publishes and any number of
//! subscribers, each holding the receiving end of an unbounded channel.
//! Publishing never waits: a subscriber that stopped reading cannot stall
//! the publisher, and one that dropped its receiver is pruned on the next
//! publish.
//!
//! ## Ordering
//!
//! Each subscriber sees events in publish order. No ordering is promised
//! between different subscribers.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;

/// Source of process-wide unique subscription ids.
static NEXT_SUBSCRIPTION: AtomicU64 = AtomicU64::new(1);

/// Identifies one subscription on an [`EventChannel`].
///
/// Ids are unique across the process, so a subscriber can allocate its id
/// up front and send it along with its sink to an actor it does not share
/// memory with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Allocates a fresh id.
    #[must_use]
    pub fn next() -> Self { Self(NEXT_SUBSCRIPTION.fetch_add(1, Ordering::Relaxed)) }

    /// Returns the raw id value.
    #[must_use]
    pub const fn get(self) -> u64 { self.0 }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "#{}", self.0) }
}

/// A live subscription: its id plus the receiving end.
#[derive(Debug)]
pub struct Subscription<T> {
    pub id: SubscriptionId,
    pub receiver: mpsc::UnboundedReceiver<T>,
}

impl<T> Subscription<T> {
    /// Waits for the next event.
    ///
    /// Returns `None` once the channel owner has dropped the subscription.
    pub async fn recv(&mut self) -> Option<T> { self.receiver.recv().await }

    /// Takes the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<T> { self.receiver.try_recv().ok() }
}

/// Broadcaster with many transient subscribers.
pub struct EventChannel<T> {
    subscribers: Vec<(SubscriptionId, mpsc::UnboundedSender<T>)>,
}

impl<T: Clone> EventChannel<T> {
    /// Creates a channel with no subscribers.
    #[must_use]
    pub const fn new() -> Self { Self { subscribers: Vec::new() } }

    /// Registers a new subscriber and returns its receiving end.
    pub fn subscribe(&mut self) -> Subscription<T> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = SubscriptionId::next();
        self.subscribers.push((id, sender));
        Subscription { id, receiver }
    }

    /// Registers an existing sink under a caller-chosen id.
    ///
    /// Re-attaching an id that is already present replaces its sink.
    pub fn attach(&mut self, id: SubscriptionId, sink: mpsc::UnboundedSender<T>) {
        if let Some(entry) = self.subscribers.iter_mut().find(|(existing, _)| *existing == id) {
            entry.1 = sink;
        } else {
            self.subscribers.push((id, sink));
        }
    }

    /// Removes a subscriber.
    ///
    /// Returns `false` if the id was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        self.subscribers.len() != before
    }

    /// Delivers `event` to every current subscriber.
    ///
    /// Subscribers whose receiver is gone are dropped. Returns how many
    /// subscribers received the event; zero subscribers is not an error.
    pub fn publish(&mut self, event: &T) -> usize {
        let mut delivered = 0;
        self.subscribers.retain(|(id, sender)| {
            if sender.send(event.clone()).is_ok() {
                delivered += 1;
                true
            } else {
                tracing::trace!("events: dropping closed subscription {id}");
                false
            }
        });
        delivered
    }

    /// Returns the number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize { self.subscribers.len() }

    /// Returns whether `id` is currently subscribed.
    #[must_use]
    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.subscribers.iter().any(|(existing, _)| *existing == id)
    }

    /// Drops every subscriber, closing their receivers.
    pub fn clear(&mut self) { self.subscribers.clear(); }
}

impl<T: Clone> Default for EventChannel<T> {
    fn default() -> Self { Self::new() }
}

impl<T> std::fmt::Debug for EventChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChannel")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
