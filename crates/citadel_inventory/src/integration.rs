//! # Collaborator Traits
//!
//! The inventory engine does not allocate ids or talk to a database itself.
//! The host implements these traits and hands them to
//! [`InventoryService`](crate::InventoryService).
//!
//! ```text
//! InventoryService ──next_id()──────────> IdAllocator
//!                  ──persist_dropped()──> DroppedItemPersister ──> storage
//!                  ──delete_dropped()───┘
//! ```

use citadel_core::{EntityId, WorldPosition};
use serde::{Deserialize, Serialize};

use crate::error::PersistError;
use crate::model::Container;

// ============================================================================
// Records handed to persistence
// ============================================================================

/// Everything needed to restore a dropped item after a restart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DroppedObjectRecord {
    /// World object id (equal to the item id for player drops).
    pub object_id: EntityId,
    /// Character that dropped the item.
    pub dropped_by: EntityId,
    /// Drop location.
    pub position: WorldPosition,
    /// Derived resource at drop time.
    pub resource: String,
    /// The dropped-item container, holding exactly one item.
    pub container: Container,
    /// The item's nested container, if it is a container item.
    pub nested: Option<Container>,
}

impl DroppedObjectRecord {
    /// JSON payload for storage backends that keep opaque blobs.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] if serialization fails.
    pub fn to_json(&self) -> Result<String, PersistError> {
        serde_json::to_string(self).map_err(|e| PersistError(e.to_string()))
    }
}

// ============================================================================
// Id allocation
// ============================================================================

/// Source of globally unique entity ids for new items and world objects.
pub trait IdAllocator: Send {
    /// Returns a fresh id. Never returns [`EntityId::NONE`].
    fn next_id(&mut self) -> EntityId;
}

/// Monotonic allocator starting at a fixed id.
#[derive(Clone, Debug)]
pub struct SequentialIdAllocator {
    next: u64,
}

impl SequentialIdAllocator {
    /// Creates an allocator whose first id is `start` (bumped to 1 if zero).
    #[must_use]
    pub const fn starting_at(start: u64) -> Self {
        Self {
            next: if start == 0 { 1 } else { start },
        }
    }
}

impl Default for SequentialIdAllocator {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl IdAllocator for SequentialIdAllocator {
    fn next_id(&mut self) -> EntityId {
        let id = self.next;
        self.next += 1;
        EntityId(id)
    }
}

// ============================================================================
// Dropped item persistence
// ============================================================================

/// Durable storage for dropped world objects.
///
/// Calls happen inside the tick; implementations should hand the record to a
/// background writer rather than block.
pub trait DroppedItemPersister: Send {
    /// Stores a newly dropped object.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when the record cannot be stored. The drop
    /// itself is not rolled back.
    fn persist_dropped(&mut self, record: &DroppedObjectRecord) -> Result<(), PersistError>;

    /// Deletes a picked-up object.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when the delete fails.
    fn delete_dropped(&mut self, object_id: EntityId) -> Result<(), PersistError>;
}

/// Persister that stores nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullPersister;

impl DroppedItemPersister for NullPersister {
    fn persist_dropped(&mut self, _record: &DroppedObjectRecord) -> Result<(), PersistError> {
        Ok(())
    }

    fn delete_dropped(&mut self, _object_id: EntityId) -> Result<(), PersistError> {
        Ok(())
    }
}

/// In-memory persister keeping JSON payloads, for tests and local runs.
#[derive(Clone, Debug, Default)]
pub struct RecordingPersister {
    /// Stored payloads by object id.
    pub stored: std::collections::BTreeMap<EntityId, String>,
    /// Ids passed to `delete_dropped`, in call order.
    pub deleted: Vec<EntityId>,
    /// When set, every call fails with this message.
    pub fail_with: Option<String>,
}

impl DroppedItemPersister for RecordingPersister {
    fn persist_dropped(&mut self, record: &DroppedObjectRecord) -> Result<(), PersistError> {
        if let Some(msg) = &self.fail_with {
            return Err(PersistError(msg.clone()));
        }
        self.stored.insert(record.object_id, record.to_json()?);
        Ok(())
    }

    fn delete_dropped(&mut self, object_id: EntityId) -> Result<(), PersistError> {
        if let Some(msg) = &self.fail_with {
            return Err(PersistError(msg.clone()));
        }
        self.stored.remove(&object_id);
        self.deleted.push(object_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ContainerKind;

    #[test]
    fn test_sequential_allocator() {
        let mut ids = SequentialIdAllocator::starting_at(0);
        assert_eq!(ids.next_id(), EntityId(1));
        assert_eq!(ids.next_id(), EntityId(2));
    }

    #[test]
    fn test_recording_persister_roundtrip() {
        let record = DroppedObjectRecord {
            object_id: EntityId(5),
            dropped_by: EntityId(1),
            position: WorldPosition::new(3.0, 4.0),
            resource: "stone".into(),
            container: Container::new(EntityId(5), ContainerKind::DroppedItem, 0, 0, 0),
            nested: None,
        };
        let mut persister = RecordingPersister::default();
        persister.persist_dropped(&record).unwrap();

        let stored = &persister.stored[&EntityId(5)];
        let decoded: DroppedObjectRecord = serde_json::from_str(stored).unwrap();
        assert_eq!(decoded, record);

        persister.delete_dropped(EntityId(5)).unwrap();
        assert!(persister.stored.is_empty());
        assert_eq!(persister.deleted, vec![EntityId(5)]);
    }

    #[test]
    fn test_recording_persister_failure() {
        let mut persister = RecordingPersister {
            fail_with: Some("disk full".into()),
            ..RecordingPersister::default()
        };
        assert_eq!(
            persister.delete_dropped(EntityId(1)),
            Err(PersistError("disk full".into()))
        );
    }
}
