//! # Inventory Service
//!
//! The single owner of container state. The simulation tick calls
//! [`InventoryService::execute`] once per admitted command; every operation
//! validates first, mutates second and returns the snapshots the caller
//! broadcasts and persists.
//!
//! ```text
//! execute(player, op)
//!   ├── resolve + authorize      (validation)
//!   ├── expected versions        (validation)
//!   ├── placement decision       (placement)
//!   ├── commit                   (executor / world / give / craft)
//!   └── nested cascade           (cascade)
//!         └── OperationOutcome { updated, closed, spawned, despawned }
//! ```

use citadel_core::{EntityId, Handle, WorldPosition};
use std::sync::Arc;

use crate::command::InventoryOp;
use crate::config::InventoryConfig;
use crate::defs::{ItemRegistry, RecipeRegistry};
use crate::error::{InventoryError, InventoryResult};
use crate::integration::{DroppedItemPersister, IdAllocator};
use crate::model::{Container, ContainerKind, ContainerRef, HandOffset, ItemInstance};
use crate::placement;
use crate::store::ContainerStore;
use crate::validation::Validator;

/// Ordered, duplicate-free set of touched containers.
///
/// Snapshots are taken only when the operation finishes, so a container
/// touched twice (for example by the cascade) is reported once with its
/// final state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct UpdateSet {
    handles: Vec<Handle>,
}

impl UpdateSet {
    pub(crate) fn insert(&mut self, handle: Handle) {
        if !self.handles.contains(&handle) {
            self.handles.push(handle);
        }
    }

    pub(crate) fn extend(&mut self, other: &Self) {
        for &handle in &other.handles {
            self.insert(handle);
        }
    }

    pub(crate) fn get(&self, index: usize) -> Option<Handle> {
        self.handles.get(index).copied()
    }
}

/// Grant summary attached to give and craft outcomes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GrantSummary {
    /// Units placed into containers.
    pub granted: u32,
    /// Units requested.
    pub requested: u32,
    /// Units spawned as dropped items.
    pub dropped: u32,
    /// At least one unit went into the hand.
    pub placed_in_hand: bool,
}

/// Result of a successful operation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OperationOutcome {
    /// Snapshots of every container that changed, source before destination.
    pub updated: Vec<Container>,
    /// Nested containers whose windows the client must close.
    pub closed: Vec<ContainerRef>,
    /// World objects spawned by this operation.
    pub spawned_dropped: Vec<EntityId>,
    /// World object removed by this operation.
    pub despawned_dropped: Option<EntityId>,
    /// Grant counts for give and craft.
    pub grant: Option<GrantSummary>,
    /// Human-readable status.
    pub message: Option<String>,
}

/// Authoritative inventory engine.
///
/// # Thread Safety
///
/// Not shared: the tick thread owns it and calls it with `&mut self`.
pub struct InventoryService {
    pub(crate) store: ContainerStore,
    pub(crate) validator: Validator,
    pub(crate) recipes: Arc<RecipeRegistry>,
    pub(crate) ids: Box<dyn IdAllocator>,
    pub(crate) persister: Box<dyn DroppedItemPersister>,
    pub(crate) config: InventoryConfig,
}

impl std::fmt::Debug for InventoryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryService")
            .field("containers", &self.store.container_count())
            .field("world_objects", &self.store.world_object_count())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl InventoryService {
    /// Creates a service with an empty store.
    ///
    /// # Arguments
    ///
    /// * `items` - Item definitions, shared read-only
    /// * `recipes` - Recipes, validated against `items`
    /// * `ids` - Allocator for new item and world-object ids
    /// * `persister` - Storage for dropped items
    /// * `config` - Engine tunables
    #[must_use]
    pub fn new(
        items: Arc<ItemRegistry>,
        recipes: Arc<RecipeRegistry>,
        ids: Box<dyn IdAllocator>,
        persister: Box<dyn DroppedItemPersister>,
        config: InventoryConfig,
    ) -> Self {
        Self {
            store: ContainerStore::new(),
            validator: Validator::new(items),
            recipes,
            ids,
            persister,
            config,
        }
    }

    /// Read access to the store.
    #[inline]
    #[must_use]
    pub const fn store(&self) -> &ContainerStore {
        &self.store
    }

    /// Item definitions.
    #[inline]
    #[must_use]
    pub fn items(&self) -> &ItemRegistry {
        self.validator.items()
    }

    /// Engine settings.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &InventoryConfig {
        &self.config
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Executes one operation for `player`.
    ///
    /// # Errors
    ///
    /// Any [`InventoryError`]; a failed operation leaves every container
    /// untouched.
    pub fn execute(
        &mut self,
        player: EntityId,
        op: &InventoryOp,
    ) -> InventoryResult<OperationOutcome> {
        if self.store.character(player).is_none() {
            return Err(InventoryError::NotFound(format!("character {player}")));
        }
        match op {
            InventoryOp::Move(spec) => self.move_item(player, spec),
            InventoryOp::DropToWorld {
                src,
                item_id,
                expected,
            } => self.drop_to_world(player, src, *item_id, expected),
            InventoryOp::PickupFromWorld { dropped_id, dst } => {
                self.pickup_from_world(player, *dropped_id, dst)
            }
            InventoryOp::GiveItem {
                item_key,
                count,
                quality,
            } => self.give_item(
                player,
                item_key,
                *count,
                *quality,
                crate::give::OverflowPolicy::DropToWorld,
            ),
            InventoryOp::Craft { recipe_key } => self.craft(player, recipe_key),
            InventoryOp::OpenContainer { reference } => self.open_container(player, reference),
            InventoryOp::CloseContainer { reference } => self.close_container(player, reference),
        }
    }

    /// Runs the cascade and snapshots every touched container.
    pub(crate) fn finish(&mut self, player: EntityId, mut updates: UpdateSet) -> OperationOutcome {
        self.apply_cascade(player, &mut updates);
        OperationOutcome {
            updated: updates
                .handles
                .iter()
                .filter_map(|&h| self.store.get(h).cloned())
                .collect(),
            ..OperationOutcome::default()
        }
    }

    /// Container behind a handle that was resolved earlier in the same
    /// operation.
    pub(crate) fn container_mut(&mut self, handle: Handle) -> InventoryResult<&mut Container> {
        self.store
            .get_mut(handle)
            .ok_or_else(|| InventoryError::Internal("resolved container vanished".into()))
    }

    pub(crate) fn default_hand_offset(&self) -> HandOffset {
        HandOffset {
            x: self.config.default_hand_offset,
            y: self.config.default_hand_offset,
        }
    }

    // ========================================================================
    // Characters
    // ========================================================================

    /// Registers a character with a backpack grid, a hand and an equipment
    /// container.
    ///
    /// # Arguments
    ///
    /// * `id` - Character entity id
    /// * `position` - Initial world position
    /// * `grid_width`, `grid_height` - Backpack size
    pub fn spawn_character(
        &mut self,
        id: EntityId,
        position: WorldPosition,
        grid_width: u8,
        grid_height: u8,
    ) {
        self.store.add_character(id, position);
        for (kind, w, h) in [
            (ContainerKind::Grid, grid_width, grid_height),
            (ContainerKind::Hand, 0, 0),
            (ContainerKind::Equipment, 0, 0),
        ] {
            let linked = self.store.add_root_container(id, kind, 0, w, h);
            debug_assert!(linked.is_some(), "character {id} was just registered");
        }
        tracing::debug!("Spawned character {} with {}x{} backpack", id, grid_width, grid_height);
    }

    /// Adds another root container to a character.
    ///
    /// # Errors
    ///
    /// [`InventoryError::NotFound`] if the character is unknown.
    pub fn add_root_container(
        &mut self,
        character: EntityId,
        kind: ContainerKind,
        key: u32,
        width: u8,
        height: u8,
    ) -> InventoryResult<ContainerRef> {
        self.store
            .add_root_container(character, kind, key, width, height)
            .map(|_| ContainerRef::new(character, kind, key))
            .ok_or_else(|| InventoryError::NotFound(format!("character {character}")))
    }

    /// Creates a standalone container (a chest or station) owned by a
    /// world entity.
    pub fn add_world_container(&mut self, container: Container) -> ContainerRef {
        let reference = container.reference();
        self.store.add_world_entity(reference.owner_id);
        self.store.insert(container);
        reference
    }

    /// Moves a character.
    ///
    /// # Errors
    ///
    /// [`InventoryError::NotFound`] if the character is unknown.
    pub fn set_position(&mut self, character: EntityId, position: WorldPosition) -> InventoryResult<()> {
        let ch = self
            .store
            .character_mut(character)
            .ok_or_else(|| InventoryError::NotFound(format!("character {character}")))?;
        ch.position = position;
        Ok(())
    }

    /// Loads an item into a container without bumping its version, as when
    /// restoring persisted state.
    ///
    /// Grid items must be in bounds and clear of other items; a hand takes
    /// one item. Container items get their nested grid, linked to the owning
    /// character when there is one.
    ///
    /// # Errors
    ///
    /// [`InventoryError::NotFound`] for an unknown container or definition,
    /// [`InventoryError::InvalidPlacement`] on a collision.
    pub fn insert_item(&mut self, reference: &ContainerRef, item: ItemInstance) -> InventoryResult<()> {
        let handle = self
            .store
            .lookup(reference)
            .ok_or_else(|| InventoryError::NotFound(format!("container {reference}")))?;
        let def = self
            .items()
            .get(item.type_id)
            .cloned()
            .ok_or_else(|| InventoryError::NotFound(format!("item type {}", item.type_id)))?;
        let container = self
            .store
            .get(handle)
            .ok_or_else(|| InventoryError::NotFound(format!("container {reference}")))?;
        let fits = match container.kind {
            ContainerKind::Grid => {
                placement::check_grid(self.items(), container, &item, item.x, item.y, false)
                    .is_some()
            }
            ContainerKind::Hand => container.items.is_empty(),
            ContainerKind::Equipment => {
                placement::check_equipment(container, &item, item.equip_slot, false).is_some()
            }
            ContainerKind::DroppedItem | ContainerKind::BuildSlot => true,
        };
        if !fits {
            return Err(InventoryError::InvalidPlacement(format!(
                "item {} does not fit in {reference}",
                item.item_id
            )));
        }
        let item_id = item.item_id;
        self.container_mut(handle)?.items.push(item);

        let holder = reference.owner_id;
        if self.store.character(holder).is_some() {
            if let Some(inserted) = self
                .store
                .get(handle)
                .and_then(|c| c.find_item(item_id))
                .map(|(_, i)| i.clone())
            {
                self.ensure_nested_container(holder, &inserted, &def);
            }
        }
        Ok(())
    }

    /// Snapshots of every container linked to a character.
    ///
    /// # Errors
    ///
    /// [`InventoryError::NotFound`] if the character is unknown.
    pub fn snapshot_character(&self, character: EntityId) -> InventoryResult<Vec<Container>> {
        let ch = self
            .store
            .character(character)
            .ok_or_else(|| InventoryError::NotFound(format!("character {character}")))?;
        Ok(ch
            .links
            .iter()
            .filter_map(|link| self.store.get(link.handle).cloned())
            .collect())
    }

    // ========================================================================
    // Open containers
    // ========================================================================

    /// Opens a container for `player` and returns its snapshot.
    ///
    /// The player's own containers and nested grids of items it holds open
    /// without being recorded. A world entity's root grid becomes the
    /// opened root, closing whatever root was open before. Nested grids of
    /// items lying in the opened root are recorded alongside it. Anything
    /// else, including every container of another character, is refused.
    ///
    /// # Errors
    ///
    /// [`InventoryError::NotFound`] for an unknown container,
    /// [`InventoryError::Forbidden`] when none of the rules above apply.
    pub fn open_container(
        &mut self,
        player: EntityId,
        reference: &ContainerRef,
    ) -> InventoryResult<OperationOutcome> {
        let snapshot = self
            .store
            .get_by_ref(reference)
            .cloned()
            .ok_or_else(|| InventoryError::NotFound(format!("container {reference}")))?;
        let opened_root = self
            .store
            .character(player)
            .ok_or_else(|| InventoryError::NotFound(format!("character {player}")))?
            .opened_root;

        let owner = reference.owner_id;
        let root_grid = reference.kind == ContainerKind::Grid && reference.key == 0;
        let personal = owner == player || Validator::is_nested_of_held_item(&self.store, player, owner);
        let new_root = !personal && root_grid && self.store.is_world_entity(owner);
        let under_root = !personal
            && !new_root
            && root_grid
            && opened_root.is_some_and(|root| Validator::is_nested_under_root(&self.store, root, owner));
        if !(personal || new_root || under_root) {
            return Err(InventoryError::Forbidden);
        }

        let mut closed = Vec::new();
        if let Some(ch) = self.store.character_mut(player) {
            if new_root && opened_root != Some(owner) {
                closed = ch.opened.drain().collect();
                ch.opened_root = Some(owner);
            }
            if !personal {
                ch.opened.insert(*reference);
            }
        }
        closed.sort_unstable();
        tracing::debug!("Character {} opened {}", player, reference);
        Ok(OperationOutcome {
            updated: vec![snapshot],
            closed,
            ..OperationOutcome::default()
        })
    }

    /// Closes an opened container. Closing the opened root closes every
    /// container opened through it.
    ///
    /// # Errors
    ///
    /// [`InventoryError::NotFound`] if the character is unknown.
    pub fn close_container(
        &mut self,
        player: EntityId,
        reference: &ContainerRef,
    ) -> InventoryResult<OperationOutcome> {
        let ch = self
            .store
            .character_mut(player)
            .ok_or_else(|| InventoryError::NotFound(format!("character {player}")))?;
        let closing_root = reference.kind == ContainerKind::Grid
            && reference.key == 0
            && ch.opened_root == Some(reference.owner_id);
        let mut closed = if closing_root {
            ch.opened_root = None;
            ch.opened.drain().collect()
        } else {
            ch.opened.remove(reference);
            Vec::new()
        };
        if !closed.contains(reference) {
            closed.push(*reference);
        }
        closed.sort_unstable();
        Ok(OperationOutcome {
            closed,
            ..OperationOutcome::default()
        })
    }

    /// Clears per-session state of a character. Its containers are kept.
    pub fn disconnect(&mut self, character: EntityId) {
        if let Some(ch) = self.store.character_mut(character) {
            ch.opened.clear();
            ch.opened_root = None;
        }
    }
}
