//! Nested-container cascade.
//!
//! A container item's resource depends on whether its nested grid holds
//! anything (`bag_seed` vs `bag_seed_full`). After a commit, every touched
//! nested grid is checked and its parent item updated; the parent's
//! container joins the update set and is itself checked in turn.

use citadel_core::{EntityId, Handle};

use crate::model::ContainerKind;
use crate::service::{InventoryService, UpdateSet};

impl InventoryService {
    pub(crate) fn apply_cascade(&mut self, player: EntityId, updates: &mut UpdateSet) {
        let mut index = 0;
        while let Some(handle) = updates.get(index) {
            index += 1;
            if let Some(parent) = self.cascade_one(player, handle) {
                updates.insert(parent);
            }
        }
    }

    /// Updates the parent item of one nested grid. Returns the parent
    /// container when its version was bumped.
    fn cascade_one(&mut self, player: EntityId, handle: Handle) -> Option<Handle> {
        let nested = self.store.get(handle)?;
        if nested.kind != ContainerKind::Grid
            || nested.key != 0
            || self.store.is_entity_owner(nested.owner_id)
            || self.store.character(nested.owner_id).is_some()
        {
            return None;
        }
        let item_id = nested.owner_id;
        let has_items = !nested.items.is_empty();

        let Some(parent) = self.find_parent_holder(player, item_id) else {
            tracing::warn!("Cascade: no container holds parent item {}", item_id);
            return None;
        };

        let (index, type_id, current) = {
            let container = self.store.get(parent)?;
            let (index, item) = container.find_item(item_id)?;
            (index, item.type_id, item.resource.clone())
        };
        let Some(def) = self.items().get(type_id) else {
            tracing::warn!("Cascade: item {} has unknown type {}", item_id, type_id);
            return None;
        };
        let resolved = def.resolve_resource(has_items).to_string();
        if resolved == current {
            return None;
        }
        let container = self.store.get_mut(parent)?;
        container.items.get_mut(index)?.resource = resolved;
        container.bump_version();
        Some(parent)
    }

    /// Container holding `item_id`: the player's links first, then the whole
    /// store.
    pub(crate) fn find_parent_holder(&self, player: EntityId, item_id: EntityId) -> Option<Handle> {
        self.store
            .character(player)
            .and_then(|ch| {
                ch.links.iter().map(|l| l.handle).find(|&h| {
                    self.store
                        .get(h)
                        .is_some_and(|c| c.find_item(item_id).is_some())
                })
            })
            .or_else(|| self.store.find_item_holder(item_id))
    }
}
