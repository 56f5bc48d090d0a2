//! Nested containers of container items.
//!
//! A nested grid is owned by its item (`owner_id == item_id`) and outlives
//! any move or drop of that item. Only the character's link to it changes:
//! linked while the item sits in one of the character's containers,
//! detached otherwise.

use citadel_core::{EntityId, Handle};

use crate::defs::ItemDef;
use crate::model::{Container, ContainerKind, ContainerRef, ItemInstance};
use crate::service::InventoryService;

impl InventoryService {
    /// Finds or creates the nested grid of a container item and links it to
    /// `player`.
    ///
    /// Returns `None` when the definition has no nested container.
    pub(crate) fn ensure_nested_container(
        &mut self,
        player: EntityId,
        item: &ItemInstance,
        def: &ItemDef,
    ) -> Option<Handle> {
        let size = def.container.as_ref()?.size;
        let reference = ContainerRef::nested(item.item_id);
        let handle = match self.store.lookup(&reference) {
            Some(existing) => existing,
            None => self.store.insert(Container::new(
                item.item_id,
                ContainerKind::Grid,
                0,
                size.w,
                size.h,
            )),
        };
        self.store.link(player, handle);
        Some(handle)
    }

    /// Links or detaches an item's nested grid depending on where the item
    /// now lives.
    pub(crate) fn reconcile_nested_link(&mut self, player: EntityId, item_id: EntityId, holder: Handle) {
        let reference = ContainerRef::nested(item_id);
        let Some(nested) = self.store.lookup(&reference) else {
            return;
        };
        let owned = self
            .store
            .character(player)
            .is_some_and(|ch| ch.has_link_handle(holder));
        if owned {
            self.store.link(player, nested);
        } else {
            self.store.unlink(player, &reference);
        }
    }
}

/// Appends the item's nested grid to `closed` if it exists and is not
/// listed yet.
pub(crate) fn push_closed_ref(
    store: &crate::store::ContainerStore,
    closed: &mut Vec<ContainerRef>,
    item_id: EntityId,
) {
    let reference = ContainerRef::nested(item_id);
    if store.lookup(&reference).is_some() && !closed.contains(&reference) {
        closed.push(reference);
    }
}
