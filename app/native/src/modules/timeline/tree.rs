//! Ordered collection of item actors owned by a timeline.
//!
//! The tree keeps, per item, the owning [`ItemHandle`], the subscription its
//! events arrive under, and a mirror of the item's last published record.
//! Every entry stays subscribed for as long as it is in the tree, and is
//! unsubscribed before its handle is released.
//!
//! Mutations that can fail are checked completely before anything changes,
//! so a failed call leaves the tree as it was.

use eyeball_im::{ObservableVector, VectorSubscriber};
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::item::{ItemActor, ItemEvent, ItemHandle, ItemSnapshot};
use super::{ItemRecord, TimelineError, structure};
use crate::events::SubscriptionId;

/// One item of the tree.
#[derive(Debug, Clone)]
pub struct TreeEntry {
    record: ItemRecord,
    revision: u64,
    handle: ItemHandle,
    subscription: SubscriptionId,
}

impl TreeEntry {
    /// Returns the last record the item published.
    #[must_use]
    pub const fn record(&self) -> &ItemRecord { &self.record }

    #[must_use]
    pub const fn revision(&self) -> u64 { self.revision }

    #[must_use]
    pub const fn handle(&self) -> &ItemHandle { &self.handle }

    #[must_use]
    pub const fn id(&self) -> Uuid { self.record.id }
}

/// Keyed, ordered items plus the inbox their events are routed to.
pub struct ItemTree {
    entries: ObservableVector<TreeEntry>,
    sink: mpsc::UnboundedSender<ItemEvent>,
}

impl ItemTree {
    /// Creates an empty tree whose items report to `sink`.
    #[must_use]
    pub fn new(sink: mpsc::UnboundedSender<ItemEvent>) -> Self {
        Self { entries: ObservableVector::new(), sink }
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    fn position(&self, id: Uuid) -> Option<usize> { self.entries.iter().position(|e| e.id() == id) }

    #[must_use]
    pub fn contains(&self, id: Uuid) -> bool { self.position(id).is_some() }

    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&TreeEntry> { self.entries.iter().find(|e| e.id() == id) }

    /// Returns item ids in tree order.
    #[must_use]
    pub fn ids(&self) -> Vec<Uuid> { self.entries.iter().map(TreeEntry::id).collect() }

    #[must_use]
    pub fn len(&self) -> usize { self.entries.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Observes structural changes (inserts, removals, mirror updates).
    #[must_use]
    pub fn subscribe(&self) -> VectorSubscriber<TreeEntry> { self.entries.subscribe() }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Appends an item and subscribes to its events.
    ///
    /// `snapshot` is the item's state as seen by the caller. If the item has
    /// moved on since, it resyncs the tree on subscription.
    ///
    /// # Errors
    ///
    /// [`TimelineError::DuplicateIdentifier`] if the id is already present,
    /// [`TimelineError::UnresolvableHandle`] if the handle is dead or does
    /// not match the snapshot.
    pub fn add(&mut self, snapshot: ItemSnapshot, handle: ItemHandle) -> Result<(), TimelineError> {
        let id = handle.id();
        if self.contains(id) {
            return Err(TimelineError::DuplicateIdentifier(id));
        }
        let entry = self.attach(snapshot, handle)?;
        self.entries.push_back(entry);
        Ok(())
    }

    /// Removes an item, unsubscribing before shutting it down.
    ///
    /// # Errors
    ///
    /// [`TimelineError::NotFound`] if the id is absent.
    pub fn remove(&mut self, id: Uuid) -> Result<ItemRecord, TimelineError> {
        let idx = self.position(id).ok_or(TimelineError::NotFound(id))?;
        let entry = self.entries.remove(idx);
        Self::release(&entry);
        Ok(entry.record)
    }

    /// Replaces the item with id `id`.
    ///
    /// In place, the existing actor is kept and refreshed with the snapshot's
    /// type, name and content; the given handle is left untouched. Otherwise
    /// the new item takes the old one's position and the old one is released.
    /// Handing back the actor already at `id` is always treated as in place,
    /// so it is never released while still in the tree. Returns the handle
    /// now in the tree.
    ///
    /// # Errors
    ///
    /// [`TimelineError::NotFound`] if `id` is absent,
    /// [`TimelineError::DuplicateIdentifier`] if the new item's id is used by
    /// another entry, [`TimelineError::UnresolvableHandle`] if the actor
    /// that should receive the content is dead.
    pub fn replace(
        &mut self,
        id: Uuid,
        snapshot: ItemSnapshot,
        handle: ItemHandle,
        in_place: bool,
    ) -> Result<ItemHandle, TimelineError> {
        let idx = self.position(id).ok_or(TimelineError::NotFound(id))?;

        if in_place || self.entries[idx].handle.actor() == handle.actor() {
            let mut entry = self.entries[idx].clone();
            entry
                .handle
                .refresh(snapshot.record.clone())
                .map_err(|_| TimelineError::UnresolvableHandle(id))?;
            entry.record = ItemRecord { id, ..snapshot.record };
            let existing = entry.handle.clone();
            self.entries.set(idx, entry);
            return Ok(existing);
        }

        let new_id = handle.id();
        if new_id != id && self.contains(new_id) {
            return Err(TimelineError::DuplicateIdentifier(new_id));
        }
        let entry = self.attach(snapshot, handle.clone())?;
        let old = self.entries.set(idx, entry);
        Self::release(&old);
        Ok(handle)
    }

    /// Folds an item event into the mirror.
    ///
    /// Returns `false` for events that no longer apply: the item left the
    /// tree, was replaced by another actor, or the event is older than the
    /// mirror.
    pub fn on_item_event(&mut self, event: &ItemEvent) -> bool {
        let Some(idx) = self.position(event.item_id) else {
            tracing::trace!("timeline: ignoring event from departed item {}", event.item_id);
            return false;
        };
        let entry = &self.entries[idx];
        if entry.handle.actor() != event.actor || event.revision < entry.revision {
            tracing::trace!(
                "timeline: ignoring stale event for {} (revision {})",
                event.item_id,
                event.revision
            );
            return false;
        }

        let mut updated = entry.clone();
        updated.record = event.record.clone();
        updated.revision = event.revision;
        self.entries.set(idx, updated);
        true
    }

    /// Records in tree order.
    #[must_use]
    pub fn serialize(&self) -> Vec<ItemRecord> {
        self.entries.iter().map(|e| e.record.clone()).collect()
    }

    /// Applies a structural description.
    ///
    /// Records with new ids are spawned and appended. For ids already in the
    /// tree, `replace` rebuilds the item with a fresh actor at the same
    /// position, otherwise the existing actor is refreshed in place. Returns
    /// the handles that were created or refreshed, in description order.
    ///
    /// # Errors
    ///
    /// [`TimelineError::MalformedStructure`] for an invalid description,
    /// [`TimelineError::UnresolvableHandle`] if an item to refresh is dead.
    /// Nothing is applied in either case.
    pub fn deserialize(
        &mut self,
        description: &Value,
        replace: bool,
    ) -> Result<Vec<ItemHandle>, TimelineError> {
        let records = structure::parse_description(description)?;

        if !replace
            && let Some(dead) = records
                .iter()
                .filter_map(|r| self.get(r.id))
                .find(|entry| !entry.handle.is_alive())
        {
            return Err(TimelineError::UnresolvableHandle(dead.id()));
        }

        let mut handles = Vec::with_capacity(records.len());
        for record in records {
            let id = record.id;
            let snapshot = ItemSnapshot { record: record.clone(), revision: 0 };

            let handle = match self.position(id) {
                Some(idx) if !replace => {
                    let existing = self.entries[idx].handle.clone();
                    self.replace(id, snapshot, existing, true)?
                }
                Some(_) => self.replace(id, snapshot, ItemActor::spawn(record), false)?,
                None => {
                    let handle = ItemActor::spawn(record);
                    self.add(snapshot, handle.clone())?;
                    handle
                }
            };
            handles.push(handle);
        }

        tracing::debug!(
            "timeline: applied description with {} item(s) (replace={replace})",
            handles.len()
        );
        Ok(handles)
    }

    /// Unsubscribes from and shuts down every item.
    pub fn teardown(&mut self) {
        for entry in self.entries.iter() {
            Self::release(entry);
        }
        self.entries.clear();
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn attach(&self, snapshot: ItemSnapshot, handle: ItemHandle) -> Result<TreeEntry, TimelineError> {
        let id = handle.id();
        if snapshot.record.id != id {
            return Err(TimelineError::UnresolvableHandle(id));
        }
        let subscription = SubscriptionId::next();
        handle
            .subscribe(subscription, self.sink.clone(), Some(snapshot.revision))
            .map_err(|_| TimelineError::UnresolvableHandle(id))?;
        Ok(TreeEntry {
            record: snapshot.record,
            revision: snapshot.revision,
            handle,
            subscription,
        })
    }

    fn release(entry: &TreeEntry) {
        let _ = entry.handle.unsubscribe(entry.subscription);
        let _ = entry.handle.shutdown();
    }
}

impl std::fmt::Debug for ItemTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemTree").field("items", &self.ids()).finish()
    }
}

impl Drop for ItemTree {
    fn drop(&mut self) {
        for entry in self.entries.iter() {
            Self::release(entry);
        }
    }
}
