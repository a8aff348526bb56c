//! Handle for communicating with the keypress monitor.

use std::collections::BTreeSet;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::messages::{HotkeyInfo, MonitorMessage, MonitorQuery, MonitorResult};
use crate::actor::{ActorError, ActorId, WeakAddress};
use crate::modules::hotkeys::{Hotkey, HotkeyEvent};

/// Handle for communicating with the keypress monitor.
///
/// This handle is cheap to clone and can be shared across tasks.
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    sender: mpsc::Sender<MonitorMessage>,
}

impl MonitorHandle {
    pub(crate) const fn new(sender: mpsc::Sender<MonitorMessage>) -> Self { Self { sender } }

    // ========================================================================
    // Fire-and-forget sending
    // ========================================================================

    /// Send a message without waiting for delivery.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the monitor has stopped or its
    /// buffer is full.
    pub fn send(&self, msg: MonitorMessage) -> Result<(), ActorError> {
        self.sender.try_send(msg).map_err(|_| ActorError::SendFailed)
    }

    /// Send a message and wait for buffer space.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the monitor has stopped.
    pub async fn send_async(&self, msg: MonitorMessage) -> Result<(), ActorError> {
        self.sender.send(msg).await.map_err(|_| ActorError::SendFailed)
    }

    // ========================================================================
    // Key input
    // ========================================================================

    /// Report a key press.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the monitor has stopped.
    pub async fn key_down(
        &self,
        key: i32,
        context: impl Into<String>,
        auto_repeat: bool,
    ) -> Result<(), ActorError> {
        self.send_async(MonitorMessage::KeyDown {
            key,
            context: context.into(),
            auto_repeat,
        })
        .await
    }

    /// Report a key release.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the monitor has stopped.
    pub async fn key_up(&self, key: i32, context: impl Into<String>) -> Result<(), ActorError> {
        self.send_async(MonitorMessage::KeyUp { key, context: context.into() }).await
    }

    /// Report that every key was released.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the monitor has stopped.
    pub async fn all_keys_up(&self, context: impl Into<String>) -> Result<(), ActorError> {
        self.send_async(MonitorMessage::AllKeysUp { context: context.into() }).await
    }

    /// Replace the held keys with a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the monitor has stopped.
    pub async fn snapshot(
        &self,
        keys: BTreeSet<i32>,
        context: impl Into<String>,
        auto_repeat: bool,
    ) -> Result<(), ActorError> {
        self.send_async(MonitorMessage::Snapshot {
            keys,
            context: context.into(),
            auto_repeat,
        })
        .await
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register a hotkey and return its id.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the monitor fails.
    pub async fn register_hotkey(&self, hotkey: Hotkey) -> Result<Uuid, ActorError> {
        let (tx, rx) = oneshot::channel();
        self.send_async(MonitorMessage::RegisterHotkey {
            hotkey: Box::new(hotkey),
            respond_to: tx,
        })
        .await?;
        rx.await.map_err(|_| ActorError::ReceiveFailed)
    }

    /// Add a watcher to a hotkey.
    ///
    /// Returns `false` if no hotkey has that id.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the monitor fails.
    pub async fn watch_hotkey(
        &self,
        hotkey_id: Uuid,
        watcher: WeakAddress<HotkeyEvent>,
        context: Option<String>,
    ) -> Result<bool, ActorError> {
        let (tx, rx) = oneshot::channel();
        self.send_async(MonitorMessage::WatchHotkey {
            hotkey_id,
            watcher,
            context,
            respond_to: tx,
        })
        .await?;
        rx.await.map_err(|_| ActorError::ReceiveFailed)
    }

    /// Stop notifying `watcher` about a hotkey.
    ///
    /// Returns `false` if the hotkey or the watcher is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the monitor fails.
    pub async fn unwatch_hotkey(
        &self,
        hotkey_id: Uuid,
        watcher: ActorId,
    ) -> Result<bool, ActorError> {
        let (tx, rx) = oneshot::channel();
        self.send_async(MonitorMessage::UnwatchHotkey { hotkey_id, watcher, respond_to: tx })
            .await?;
        rx.await.map_err(|_| ActorError::ReceiveFailed)
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
    pub async fn query(&self, query: MonitorQuery) -> Result<MonitorResult, ActorError> {
        let (tx, rx) = oneshot::channel();
        self.send_async(MonitorMessage::Query { query, respond_to: tx }).await?;
        rx.await.map_err(|_| ActorError::ReceiveFailed)
    }

    /// Execute a query with a timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::Timeout`] if the query doesn't complete in time,
    /// or any error from [`Self::query`].
    pub async fn query_timeout(
        &self,
        query: MonitorQuery,
        timeout: Duration,
    ) -> Result<MonitorResult, ActorError> {
        tokio::time::timeout(timeout, self.query(query))
            .await
            .map_err(|_| ActorError::Timeout(timeout))?
    }

    /// Get every registered hotkey.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the monitor fails.
    pub async fn hotkeys(&self) -> Result<Vec<HotkeyInfo>, ActorError> {
        match self.query(MonitorQuery::GetHotkeys).await? {
            MonitorResult::Hotkeys(hotkeys) => Ok(hotkeys),
            _ => Err(ActorError::ReceiveFailed),
        }
    }

    /// Get a hotkey by id.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the monitor fails.
    pub async fn hotkey(&self, id: Uuid) -> Result<Option<HotkeyInfo>, ActorError> {
        match self.query(MonitorQuery::GetHotkey { id }).await? {
            MonitorResult::Hotkey(hotkey) => Ok(hotkey),
            _ => Err(ActorError::ReceiveFailed),
        }
    }

    /// Get the keys currently held down, in ascending code order.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the monitor fails.
    pub async fn pressed_keys(&self) -> Result<Vec<i32>, ActorError> {
        match self.query(MonitorQuery::GetPressedKeys).await? {
            MonitorResult::PressedKeys(keys) => Ok(keys),
            _ => Err(ActorError::ReceiveFailed),
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Check whether the monitor is still running.
    #[must_use]
    pub fn is_alive(&self) -> bool { !self.sender.is_closed() }

    /// Ask the monitor to stop.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the monitor has already stopped.
    pub fn shutdown(&self) -> Result<(), ActorError> { self.send(MonitorMessage::Shutdown) }
}
