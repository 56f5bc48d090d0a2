//! Dropping items into the world and picking them back up.
//!
//! A dropped item becomes a world object whose id equals the item id. The
//! object owns a single-item `DroppedItem` container; the item's nested
//! grid, if any, stays in the store untouched so its contents survive the
//! round trip.

use citadel_core::{EntityId, Handle, WorldPosition};

use crate::command::ExpectedVersion;
use crate::error::{InventoryError, InventoryResult};
use crate::integration::DroppedObjectRecord;
use crate::model::{Container, ContainerKind, ContainerRef, ItemInstance};
use crate::placement;
use crate::service::{InventoryService, OperationOutcome, UpdateSet};
use crate::store::WorldObject;
use crate::validation::Validator;

impl InventoryService {
    /// Drops an item at the character's position.
    ///
    /// Versions are checked only when `expected` is non-empty.
    ///
    /// # Errors
    ///
    /// [`InventoryError::NotFound`], [`InventoryError::Forbidden`] or
    /// [`InventoryError::VersionMismatch`]; the source is untouched on error.
    pub fn drop_to_world(
        &mut self,
        player: EntityId,
        src: &ContainerRef,
        item_id: EntityId,
        expected: &[ExpectedVersion],
    ) -> InventoryResult<OperationOutcome> {
        let src_h = self.validator.resolve(&self.store, player, src)?;
        let container = self
            .store
            .get(src_h)
            .ok_or_else(|| InventoryError::Internal("resolved container vanished".into()))?;
        let index = Validator::find_item(container, item_id)?;
        if !expected.is_empty() {
            Validator::validate_expected(&self.store, expected, &[src_h])?;
        }
        let position = self
            .store
            .character(player)
            .map(|ch| ch.position)
            .ok_or_else(|| InventoryError::NotFound(format!("character {player}")))?;

        let has_nested_items = self.store.nested_has_items(item_id);
        let resource = {
            let item = container
                .items
                .get(index)
                .ok_or_else(|| InventoryError::Internal("found item vanished".into()))?;
            self.items()
                .get(item.type_id)
                .map_or_else(|| item.resource.clone(), |d| d.resolve_resource(has_nested_items).to_string())
        };

        let src_c = self.container_mut(src_h)?;
        let mut item = src_c
            .take_item(index)
            .ok_or_else(|| InventoryError::Internal("found item vanished".into()))?;
        src_c.bump_version();
        self.store.unlink(player, &ContainerRef::nested(item_id));

        item.resource.clone_from(&resource);
        self.spawn_dropped(item_id, item, player, position);
        self.persist_dropped(item_id);

        tracing::debug!(
            "Character {} dropped item {} at ({}, {})",
            player,
            item_id,
            position.x,
            position.y
        );

        let mut updates = UpdateSet::default();
        updates.insert(src_h);
        let mut outcome = self.finish(player, updates);
        outcome.spawned_dropped = vec![item_id];
        Ok(outcome)
    }

    /// Picks a dropped item up into `dst`.
    ///
    /// # Errors
    ///
    /// * [`InventoryError::NotFound`] - no such object, or its container is empty
    /// * [`InventoryError::OutOfRange`] - object beyond the pickup radius
    /// * [`InventoryError::Unsupported`] - destination is not a grid or hand
    /// * [`InventoryError::InvalidPlacement`] - no room or not allowed
    pub fn pickup_from_world(
        &mut self,
        player: EntityId,
        dropped_id: EntityId,
        dst: &ContainerRef,
    ) -> InventoryResult<OperationOutcome> {
        let object = *self
            .store
            .world_object(dropped_id)
            .ok_or_else(|| InventoryError::NotFound(format!("world object {dropped_id}")))?;
        let position = self
            .store
            .character(player)
            .map(|ch| ch.position)
            .ok_or_else(|| InventoryError::NotFound(format!("character {player}")))?;
        if position.distance_sq(object.position) > self.config.pickup_radius_sq() {
            return Err(InventoryError::OutOfRange);
        }

        let mut item = self
            .store
            .get(object.container)
            .and_then(|c| c.items.first())
            .cloned()
            .ok_or_else(|| InventoryError::NotFound(format!("dropped item {dropped_id}")))?;

        let dst_h = self.validator.resolve(&self.store, player, dst)?;
        let dst_c = self
            .store
            .get(dst_h)
            .ok_or_else(|| InventoryError::Internal("resolved container vanished".into()))?;
        self.validator
            .validate_item_allowed(&self.store, player, &item, dst_c, None)?;

        let decision = match dst_c.kind {
            ContainerKind::Grid => {
                let (x, y) = placement::find_free_space(dst_c, item.width, item.height)
                    .ok_or_else(|| {
                        InventoryError::InvalidPlacement("no free space in destination".into())
                    })?;
                placement::check_grid(self.items(), dst_c, &item, x, y, false)
            }
            ContainerKind::Hand => placement::check_hand(self.items(), dst_c, &item, false),
            kind => {
                return Err(InventoryError::Unsupported(format!(
                    "cannot pick up into {kind} containers"
                )))
            }
        };
        let Some(placement::PlacementDecision::Place { x, y }) = decision else {
            return Err(InventoryError::InvalidPlacement(
                "cannot place item at destination".into(),
            ));
        };
        let def = self.items().get(item.type_id).cloned();

        let default_offset = self.default_hand_offset();
        let dst_c = self.container_mut(dst_h)?;
        item.x = x;
        item.y = y;
        item.equip_slot = None;
        dst_c.items.push(item.clone());
        if dst_c.kind == ContainerKind::Hand {
            dst_c.hand_offset = default_offset;
        }
        dst_c.bump_version();

        let nested = def.and_then(|d| self.ensure_nested_container(player, &item, &d));
        self.store.despawn_world_object(dropped_id);
        if let Err(e) = self.persister.delete_dropped(dropped_id) {
            tracing::error!("Failed to delete picked up object {}: {}", dropped_id, e);
        }

        tracing::debug!(
            "Character {} picked up item {} from object {}",
            player,
            item.item_id,
            dropped_id
        );

        let mut updates = UpdateSet::default();
        updates.insert(dst_h);
        if let Some(n) = nested {
            updates.insert(n);
        }
        let mut outcome = self.finish(player, updates);
        outcome.despawned_dropped = Some(dropped_id);
        Ok(outcome)
    }

    /// Creates a world object holding `item`. Returns the container handle.
    pub(crate) fn spawn_dropped(
        &mut self,
        object_id: EntityId,
        mut item: ItemInstance,
        dropped_by: EntityId,
        position: WorldPosition,
    ) -> Handle {
        item.x = 0;
        item.y = 0;
        item.equip_slot = None;
        let contained_item = item.item_id;
        let mut container = Container::new(object_id, ContainerKind::DroppedItem, 0, 0, 0);
        container.items.push(item);
        let handle = self.store.insert(container);
        self.store.add_world_object(
            object_id,
            WorldObject {
                position,
                dropped_by,
                contained_item,
                container: handle,
            },
        );
        handle
    }

    /// Hands the record of a freshly spawned world object to persistence.
    /// Failures are logged; the drop stands.
    pub(crate) fn persist_dropped(&mut self, object_id: EntityId) {
        let Some(record) = self.dropped_record(object_id) else {
            tracing::error!("Dropped object {} vanished before persisting", object_id);
            return;
        };
        if let Err(e) = self.persister.persist_dropped(&record) {
            tracing::error!("Failed to persist dropped object {}: {}", object_id, e);
        }
    }

    /// Builds the persistence record of a world object.
    #[must_use]
    pub fn dropped_record(&self, object_id: EntityId) -> Option<DroppedObjectRecord> {
        let object = self.store.world_object(object_id)?;
        let container = self.store.get(object.container)?.clone();
        let resource = container.items.first()?.resource.clone();
        let nested = self
            .store
            .get_by_ref(&ContainerRef::nested(object.contained_item))
            .cloned();
        Some(DroppedObjectRecord {
            object_id,
            dropped_by: object.dropped_by,
            position: object.position,
            resource,
            container,
            nested,
        })
    }
}
