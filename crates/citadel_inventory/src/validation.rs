//! # Resolution & Validation
//!
//! Every precondition of an operation is checked here, before the executor
//! touches anything:
//!
//! 1. resolve each `(owner, kind, key)` through the store index
//! 2. authorize the caller
//! 3. compare declared versions against live ones
//! 4. check the item may enter the destination (definition and content rules)

use citadel_core::{EntityId, Handle};
use std::sync::Arc;

use crate::command::ExpectedVersion;
use crate::defs::{ItemDef, ItemRegistry};
use crate::error::{InventoryError, InventoryResult};
use crate::model::{Container, ContainerKind, ContainerRef, EquipSlot, ItemInstance};
use crate::store::ContainerStore;

/// Stateless checker over a shared item registry.
#[derive(Clone, Debug)]
pub struct Validator {
    items: Arc<ItemRegistry>,
}

impl Validator {
    /// Creates a validator.
    #[must_use]
    pub const fn new(items: Arc<ItemRegistry>) -> Self {
        Self { items }
    }

    /// Shared item registry.
    #[inline]
    #[must_use]
    pub fn items(&self) -> &ItemRegistry {
        &self.items
    }

    /// Definition for an instance, or [`InventoryError::InvalidPlacement`].
    ///
    /// # Errors
    ///
    /// Fails when the instance's `type_id` has no definition.
    pub fn def_of(&self, item: &ItemInstance) -> InventoryResult<&ItemDef> {
        self.items.get(item.type_id).ok_or_else(|| {
            InventoryError::InvalidPlacement(format!("unknown item type {}", item.type_id))
        })
    }

    /// Resolves a container reference on behalf of `player`.
    ///
    /// Access is granted to the player's own containers, to nested
    /// containers of items the player holds, and to containers the player
    /// has opened. An opened nested grid stays reachable only while its item
    /// still sits in the opened root, and another character's containers
    /// are never reachable this way.
    ///
    /// # Errors
    ///
    /// [`InventoryError::NotFound`] for an unknown reference or player,
    /// [`InventoryError::Forbidden`] when none of the access rules apply.
    pub fn resolve(
        &self,
        store: &ContainerStore,
        player: EntityId,
        reference: &ContainerRef,
    ) -> InventoryResult<Handle> {
        let handle = store
            .lookup(reference)
            .ok_or_else(|| InventoryError::NotFound(format!("container {reference}")))?;
        let character = store
            .character(player)
            .ok_or_else(|| InventoryError::NotFound(format!("character {player}")))?;

        if reference.owner_id == player
            || Self::is_nested_of_held_item(store, player, reference.owner_id)
        {
            return Ok(handle);
        }
        let opened = character.opened.contains(reference)
            && store.character(reference.owner_id).is_none()
            && Self::reachable_from_root(store, character.opened_root, reference);
        if opened {
            return Ok(handle);
        }
        Err(InventoryError::Forbidden)
    }

    fn reachable_from_root(
        store: &ContainerStore,
        root: Option<EntityId>,
        reference: &ContainerRef,
    ) -> bool {
        if reference.kind != ContainerKind::Grid || reference.key != 0 {
            return true;
        }
        match root {
            Some(root) if root != reference.owner_id => {
                Self::is_nested_under_root(store, root, reference.owner_id)
            }
            _ => true,
        }
    }

    /// Returns true if `item_id` sits in the root grid of `root_owner` and
    /// owns a live nested grid.
    #[must_use]
    pub fn is_nested_under_root(store: &ContainerStore, root_owner: EntityId, item_id: EntityId) -> bool {
        let in_root = store
            .get_by_ref(&ContainerRef::new(root_owner, ContainerKind::Grid, 0))
            .is_some_and(|root| root.items.iter().any(|i| i.item_id == item_id));
        in_root && store.lookup(&ContainerRef::nested(item_id)).is_some()
    }

    /// Returns true if `item_id` sits in one of the player's containers
    /// (other than its own nested container) and owns a live nested grid.
    #[must_use]
    pub fn is_nested_of_held_item(store: &ContainerStore, player: EntityId, item_id: EntityId) -> bool {
        let Some(character) = store.character(player) else {
            return false;
        };
        let nested = ContainerRef::nested(item_id);
        let held = character
            .links
            .iter()
            .filter(|link| link.reference != nested)
            .filter_map(|link| store.get(link.handle))
            .any(|c| c.items.iter().any(|i| i.item_id == item_id));
        held && store.lookup(&nested).is_some()
    }

    /// Checks declared versions against the containers resolved for this
    /// operation.
    ///
    /// # Errors
    ///
    /// [`InventoryError::NotFound`] when a declared reference is not among
    /// `resolved`, [`InventoryError::VersionMismatch`] on a stale version.
    pub fn validate_expected(
        store: &ContainerStore,
        expected: &[ExpectedVersion],
        resolved: &[Handle],
    ) -> InventoryResult<()> {
        for exp in expected {
            let container = resolved
                .iter()
                .filter_map(|&h| store.get(h))
                .find(|c| c.reference() == exp.reference)
                .ok_or_else(|| {
                    InventoryError::NotFound(format!(
                        "container {} for version check",
                        exp.reference
                    ))
                })?;
            if container.version != exp.version {
                return Err(InventoryError::VersionMismatch {
                    expected: exp.version,
                    actual: container.version,
                });
            }
        }
        Ok(())
    }

    /// Index of an item in a container.
    ///
    /// # Errors
    ///
    /// [`InventoryError::NotFound`] when the item is not there.
    pub fn find_item(container: &Container, item_id: EntityId) -> InventoryResult<usize> {
        container
            .find_item(item_id)
            .map(|(index, _)| index)
            .ok_or_else(|| {
                InventoryError::NotFound(format!("item {item_id} in {}", container.reference()))
            })
    }

    /// Checks that `item` may be placed into `dst`.
    ///
    /// # Errors
    ///
    /// [`InventoryError::InvalidPlacement`] when the definition is missing or
    /// forbids the destination.
    pub fn validate_item_allowed(
        &self,
        store: &ContainerStore,
        player: EntityId,
        item: &ItemInstance,
        dst: &Container,
        slot: Option<EquipSlot>,
    ) -> InventoryResult<()> {
        let def = self.def_of(item)?;
        match dst.kind {
            ContainerKind::Hand if !def.allowed.hand => Err(InventoryError::InvalidPlacement(
                format!("{} cannot be held in hand", def.key),
            )),
            ContainerKind::Grid => {
                if !def.allowed.grid {
                    return Err(InventoryError::InvalidPlacement(format!(
                        "{} cannot be placed in a grid",
                        def.key
                    )));
                }
                self.check_content_rules(store, player, def, dst.owner_id)
            }
            ContainerKind::Equipment => {
                let allowed = slot.is_some_and(|s| def.allowed.equipment_slots.contains(&s));
                if allowed {
                    Ok(())
                } else {
                    Err(InventoryError::InvalidPlacement(format!(
                        "{} cannot be equipped in {}",
                        def.key,
                        slot.map_or("no slot", EquipSlot::as_str)
                    )))
                }
            }
            _ => Ok(()),
        }
    }

    /// Applies the parent item's content rules when `owner_id` is an item.
    ///
    /// The parent is looked up in the player's containers first, then
    /// anywhere in the store.
    ///
    /// # Errors
    ///
    /// [`InventoryError::InvalidPlacement`] when the rules reject `def`.
    pub fn check_content_rules(
        &self,
        store: &ContainerStore,
        player: EntityId,
        def: &ItemDef,
        owner_id: EntityId,
    ) -> InventoryResult<()> {
        let Some(parent_type) = Self::find_item_type(store, player, owner_id) else {
            return Ok(());
        };
        let Some(rules) = self
            .items
            .get(parent_type)
            .and_then(|parent| parent.container.as_ref())
            .map(|c| &c.rules)
        else {
            return Ok(());
        };
        if rules.accepts(def) {
            Ok(())
        } else {
            Err(InventoryError::InvalidPlacement(format!(
                "{} is not allowed in this container",
                def.key
            )))
        }
    }

    fn find_item_type(store: &ContainerStore, player: EntityId, item_id: EntityId) -> Option<u32> {
        let type_in = |c: &Container| {
            c.items
                .iter()
                .find(|i| i.item_id == item_id)
                .map(|i| i.type_id)
        };
        store
            .character(player)
            .and_then(|ch| {
                ch.links
                    .iter()
                    .filter_map(|link| store.get(link.handle))
                    .find_map(type_in)
            })
            .or_else(|| {
                store
                    .find_item_holder(item_id)
                    .and_then(|h| store.get(h))
                    .and_then(type_in)
            })
    }
}
