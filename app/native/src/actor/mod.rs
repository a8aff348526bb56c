//! Shared actor plumbing.
//!
//! Every addressable unit in Reel (timelines, items, the keypress monitor)
//! runs as its own tokio task that drains a channel one message at a time.
//! This module holds the pieces those actors have in common:
//!
//! - [`ActorError`] - failures talking to an actor through its handle
//! - [`ActorId`] - stable identity used to compare addresses
//! - [`Mailbox`] / [`WeakAddress`] - a receiver whose address does not keep
//!   the actor alive, used for watchers and playhead associations

mod mailbox;

use std::time::Duration;

pub use mailbox::{Mailbox, WeakAddress};
use uuid::Uuid;

/// Error types for actor communication.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActorError {
    /// Failed to send message to actor.
    #[error("Failed to send message to actor: channel closed")]
    SendFailed,

    /// Failed to receive response from actor.
    #[error("Failed to receive response from actor: channel closed")]
    ReceiveFailed,

    /// Request timed out.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

/// Identity of an actor address.
///
/// Two [`WeakAddress`] values refer to the same actor exactly when their ids
/// are equal. Ids are UUID v7, so they also sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActorId(Uuid);

impl ActorId {
    /// Generates a fresh id.
    #[must_use]
    pub fn new() -> Self { Self(Uuid::now_v7()) }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid { self.0 }
}

impl Default for ActorId {
    fn default() -> Self { Self::new() }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_ids_are_unique() {
        let a = ActorId::new();
        let b = ActorId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_actor_error_display() {
        assert!(ActorError::SendFailed.to_string().contains("channel closed"));
        let timeout = ActorError::Timeout(Duration::from_millis(250));
        assert!(timeout.to_string().contains("250ms"));
    }
}
