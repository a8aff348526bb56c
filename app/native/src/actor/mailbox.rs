//! Mailboxes with weakly referenced addresses.
//!
//! A [`Mailbox`] is owned by the task that consumes it. It keeps the only
//! strong sender for its own channel, so the [`WeakAddress`] values handed out
//! to other actors stop resolving as soon as the mailbox is dropped. This is
//! how a notifier finds out, lazily, that a watcher has gone away.

use tokio::sync::mpsc;

use super::ActorId;

/// Receiving end of an actor that can be addressed weakly.
pub struct Mailbox<M> {
    id: ActorId,
    /// Strong sender kept alive for as long as the mailbox exists.
    keepalive: mpsc::UnboundedSender<M>,
    receiver: mpsc::UnboundedReceiver<M>,
}

impl<M> Mailbox<M> {
    /// Creates an empty mailbox with a fresh identity.
    #[must_use]
    pub fn new() -> Self {
        let (keepalive, receiver) = mpsc::unbounded_channel();
        Self { id: ActorId::new(), keepalive, receiver }
    }

    /// Returns the mailbox identity.
    #[must_use]
    pub const fn id(&self) -> ActorId { self.id }

    /// Returns a weak address for this mailbox.
    #[must_use]
    pub fn address(&self) -> WeakAddress<M> {
        WeakAddress {
            id: self.id,
            sender: self.keepalive.downgrade(),
        }
    }

    /// Waits for the next message.
    ///
    /// Never returns `None` while the mailbox is alive, because the mailbox
    /// itself holds a sender.
    pub async fn recv(&mut self) -> Option<M> { self.receiver.recv().await }

    /// Takes the next message if one is already queued.
    pub fn try_recv(&mut self) -> Option<M> { self.receiver.try_recv().ok() }

    /// Drains every queued message without waiting.
    pub fn drain(&mut self) -> Vec<M> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.receiver.try_recv() {
            messages.push(msg);
        }
        messages
    }
}

impl<M> Default for Mailbox<M> {
    fn default() -> Self { Self::new() }
}

impl<M> std::fmt::Debug for Mailbox<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailbox")
            .field("id", &self.id)
            .field("queued", &self.receiver.len())
            .finish()
    }
}

/// Non-owning address of a [`Mailbox`].
///
/// Holding an address never keeps the target alive. [`WeakAddress::resolve`]
/// must be called at delivery time to find out whether it still exists.
pub struct WeakAddress<M> {
    id: ActorId,
    sender: mpsc::WeakUnboundedSender<M>,
}

impl<M> WeakAddress<M> {
    /// Returns the identity of the addressed mailbox.
    #[must_use]
    pub const fn id(&self) -> ActorId { self.id }

    /// Upgrades to a strong sender if the mailbox is still alive.
    #[must_use]
    pub fn resolve(&self) -> Option<mpsc::UnboundedSender<M>> {
        self.sender.upgrade().filter(|sender| !sender.is_closed())
    }

    /// Returns whether the mailbox is still alive.
    #[must_use]
    pub fn is_alive(&self) -> bool { self.resolve().is_some() }

    /// Resolves the address and sends `msg` without waiting.
    ///
    /// Returns `false` if the target has gone away.
    pub fn send(&self, msg: M) -> bool {
        self.resolve().is_some_and(|sender| sender.send(msg).is_ok())
    }
}

impl<M> Clone for WeakAddress<M> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            sender: self.sender.clone(),
        }
    }
}

impl<M> PartialEq for WeakAddress<M> {
    fn eq(&self, other: &Self) -> bool { self.id == other.id }
}

impl<M> Eq for WeakAddress<M> {}

impl<M> std::fmt::Debug for WeakAddress<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakAddress").field("id", &self.id).finish_non_exhaustive()
    }
}
