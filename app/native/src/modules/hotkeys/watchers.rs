//! Context-scoped registry of weakly referenced watchers.
//!
//! Watchers are actors that asked to hear about something (a hotkey press,
//! for instance). The registry never keeps them alive: it stores a
//! [`WeakAddress`] per watcher and resolves it only when a notification is
//! delivered. A watcher that has gone away is removed at that moment.

use smallvec::SmallVec;

use crate::actor::{ActorId, WeakAddress};

/// Context value that matches every notification.
pub const ANY_CONTEXT: &str = "any";

/// One registered watcher.
pub struct WatcherEntry<P> {
    address: WeakAddress<P>,
    context: String,
}

impl<P> WatcherEntry<P> {
    #[must_use]
    pub const fn address(&self) -> &WeakAddress<P> { &self.address }

    #[must_use]
    pub fn context(&self) -> &str { &self.context }

    /// Returns whether a notification raised in `context` reaches this entry.
    #[must_use]
    pub fn matches(&self, context: &str) -> bool {
        self.context.is_empty() || self.context == ANY_CONTEXT || self.context == context
    }
}

impl<P> Clone for WatcherEntry<P> {
    fn clone(&self) -> Self {
        Self {
            address: self.address.clone(),
            context: self.context.clone(),
        }
    }
}

impl<P> std::fmt::Debug for WatcherEntry<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherEntry")
            .field("id", &self.address.id())
            .field("context", &self.context)
            .finish()
    }
}

/// Outcome of one delivery attempt.
enum Delivery {
    Delivered,
    Skipped,
    /// The watcher could not be resolved and must be pruned.
    DeadWatcher,
}

/// Mapping from watcher identity to the context it listens in.
///
/// Holds at most one entry per [`ActorId`]. Watcher counts are small, so
/// lookups are linear scans over an inline vector.
pub struct WatcherRegistry<P> {
    entries: SmallVec<[WatcherEntry<P>; 4]>,
}

impl<P: Clone> WatcherRegistry<P> {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self { Self { entries: SmallVec::new_const() } }

    /// Adds a watcher, or refreshes the context of an existing one.
    ///
    /// Returns `true` if a new entry was created.
    pub fn upsert(&mut self, address: WeakAddress<P>, context: impl Into<String>) -> bool {
        let context = context.into();
        if let Some(entry) = self.entries.iter_mut().find(|e| e.address.id() == address.id()) {
            entry.context = context;
            return false;
        }
        self.entries.push(WatcherEntry { address, context });
        true
    }

    /// Upserts every entry of `other` into this registry.
    pub fn merge(&mut self, other: &Self) {
        for entry in &other.entries {
            self.upsert(entry.address.clone(), entry.context.clone());
        }
    }

    /// Removes a watcher by identity.
    pub fn remove(&mut self, id: ActorId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.address.id() != id);
        self.entries.len() != before
    }

    /// Delivers `payload` to every live watcher whose context matches.
    ///
    /// Watchers that no longer resolve are removed. Delivery does not wait
    /// for the watcher to handle the payload. Returns the number of watchers
    /// the payload was delivered to.
    pub fn notify(&mut self, context: &str, payload: &P) -> usize {
        let mut delivered = 0;
        self.entries.retain(|entry| match Self::deliver(entry, context, payload) {
            Delivery::Delivered => {
                delivered += 1;
                true
            }
            Delivery::Skipped => true,
            Delivery::DeadWatcher => {
                tracing::debug!(
                    "hotkeys: pruning watcher {} (context '{}')",
                    entry.address.id(),
                    entry.context
                );
                false
            }
        });
        delivered
    }

    fn deliver(entry: &WatcherEntry<P>, context: &str, payload: &P) -> Delivery {
        let Some(sender) = entry.address.resolve() else {
            return Delivery::DeadWatcher;
        };
        if !entry.matches(context) {
            return Delivery::Skipped;
        }
        if sender.send(payload.clone()).is_err() {
            return Delivery::DeadWatcher;
        }
        Delivery::Delivered
    }

    /// Returns the context registered for a watcher.
    #[must_use]
    pub fn context_of(&self, id: ActorId) -> Option<&str> {
        self.entries.iter().find(|e| e.address.id() == id).map(WatcherEntry::context)
    }

    #[must_use]
    pub fn len(&self) -> usize { self.entries.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

impl<P: Clone> Default for WatcherRegistry<P> {
    fn default() -> Self { Self::new() }
}

impl<P> Clone for WatcherRegistry<P> {
    fn clone(&self) -> Self { Self { entries: self.entries.clone() } }
}

impl<P> std::fmt::Debug for WatcherRegistry<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}
