//! # Container Store
//!
//! Owns every live container in a generational [`Arena`], with an O(1)
//! index from [`ContainerRef`] to [`Handle`]. Characters carry an ordered
//! list of [`InventoryLink`]s naming the containers they can reach; dropped
//! items live as [`WorldObject`]s with a position.
//!
//! ```text
//!   ContainerRef ──index──> Handle ──arena──> Container
//!        ▲                                       │
//!        └──────── Character.links ◄─────────────┘
//! ```
//!
//! The store is owned by the simulation tick and is never shared across
//! threads, so nothing in here takes a lock.

use citadel_core::{Arena, EntityId, Handle, WorldPosition};
use std::collections::{HashMap, HashSet};

use crate::build::BuildSite;
use crate::model::{Container, ContainerKind, ContainerRef};

/// A container reachable by a character.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InventoryLink {
    /// Identity of the linked container.
    pub reference: ContainerRef,
    /// Live handle.
    pub handle: Handle,
}

/// Per-character inventory state.
#[derive(Clone, Debug, Default)]
pub struct Character {
    /// World position, used for drop location and pickup range.
    pub position: WorldPosition,
    /// Root containers first, nested containers appended as they are linked.
    pub links: Vec<InventoryLink>,
    /// Foreign containers this character has opened: the opened root and
    /// nested grids reached through it.
    pub opened: HashSet<ContainerRef>,
    /// World entity whose root grid is currently open.
    pub opened_root: Option<EntityId>,
}

impl Character {
    /// Returns true if `handle` is one of this character's linked containers.
    #[must_use]
    pub fn has_link_handle(&self, handle: Handle) -> bool {
        self.links.iter().any(|link| link.handle == handle)
    }

    /// Finds the link for a reference.
    #[must_use]
    pub fn link(&self, reference: &ContainerRef) -> Option<&InventoryLink> {
        self.links.iter().find(|link| link.reference == *reference)
    }
}

/// A dropped item lying in the world.
#[derive(Clone, Copy, Debug)]
pub struct WorldObject {
    /// Drop location.
    pub position: WorldPosition,
    /// Character that dropped it.
    pub dropped_by: EntityId,
    /// Item inside the dropped-item container.
    pub contained_item: EntityId,
    /// Handle of the dropped-item container.
    pub container: Handle,
}

/// Arena-backed container storage with the reference index.
#[derive(Debug, Default)]
pub struct ContainerStore {
    containers: Arena<Container>,
    index: HashMap<ContainerRef, Handle>,
    characters: HashMap<EntityId, Character>,
    world_objects: HashMap<EntityId, WorldObject>,
    /// Non-character entities owning root containers (chests, stations).
    world_entities: HashSet<EntityId>,
    build_sites: HashMap<EntityId, BuildSite>,
}

impl ContainerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Containers
    // ========================================================================

    /// Inserts a container and indexes it by its reference.
    ///
    /// An existing container with the same reference is removed first.
    pub fn insert(&mut self, container: Container) -> Handle {
        let reference = container.reference();
        if let Some(old) = self.index.remove(&reference) {
            self.containers.remove(old);
        }
        let handle = self.containers.insert(container);
        self.index.insert(reference, handle);
        handle
    }

    /// Removes a container and its index entry.
    pub fn remove(&mut self, reference: &ContainerRef) -> Option<Container> {
        let handle = self.index.remove(reference)?;
        self.containers.remove(handle)
    }

    /// O(1) lookup of a live handle.
    #[inline]
    #[must_use]
    pub fn lookup(&self, reference: &ContainerRef) -> Option<Handle> {
        self.index
            .get(reference)
            .copied()
            .filter(|&h| self.containers.contains(h))
    }

    /// Container behind a handle.
    #[inline]
    #[must_use]
    pub fn get(&self, handle: Handle) -> Option<&Container> {
        self.containers.get(handle)
    }

    /// Mutable container behind a handle.
    #[inline]
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut Container> {
        self.containers.get_mut(handle)
    }

    /// Container by reference.
    #[must_use]
    pub fn get_by_ref(&self, reference: &ContainerRef) -> Option<&Container> {
        self.lookup(reference).and_then(|h| self.get(h))
    }

    /// Number of live containers.
    #[must_use]
    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    /// Finds the container currently holding `item_id`, scanning every container.
    #[must_use]
    pub fn find_item_holder(&self, item_id: EntityId) -> Option<Handle> {
        if item_id.is_none() {
            return None;
        }
        self.containers
            .iter()
            .find(|(_, c)| c.items.iter().any(|i| i.item_id == item_id))
            .map(|(h, _)| h)
    }

    /// Returns true if the item's nested container exists and holds items.
    #[must_use]
    pub fn nested_has_items(&self, item_id: EntityId) -> bool {
        self.get_by_ref(&ContainerRef::nested(item_id))
            .is_some_and(|c| !c.items.is_empty())
    }

    // ========================================================================
    // Characters
    // ========================================================================

    /// Registers a character with no containers.
    pub fn add_character(&mut self, id: EntityId, position: WorldPosition) {
        self.characters.insert(
            id,
            Character {
                position,
                ..Character::default()
            },
        );
    }

    /// Creates a root container owned by `character` and links it.
    ///
    /// Returns `None` if the character is unknown.
    pub fn add_root_container(
        &mut self,
        character: EntityId,
        kind: ContainerKind,
        key: u32,
        width: u8,
        height: u8,
    ) -> Option<Handle> {
        if !self.characters.contains_key(&character) {
            return None;
        }
        let handle = self.insert(Container::new(character, kind, key, width, height));
        self.link(character, handle);
        Some(handle)
    }

    /// Character state.
    #[inline]
    #[must_use]
    pub fn character(&self, id: EntityId) -> Option<&Character> {
        self.characters.get(&id)
    }

    /// Mutable character state.
    #[inline]
    pub fn character_mut(&mut self, id: EntityId) -> Option<&mut Character> {
        self.characters.get_mut(&id)
    }

    /// Removes a character. Its containers stay in the store.
    pub fn remove_character(&mut self, id: EntityId) -> Option<Character> {
        self.characters.remove(&id)
    }

    /// Links a container to a character unless a link with that reference exists.
    pub fn link(&mut self, character: EntityId, handle: Handle) {
        let Some(reference) = self.get(handle).map(Container::reference) else {
            return;
        };
        if let Some(ch) = self.characters.get_mut(&character) {
            if ch.link(&reference).is_none() {
                ch.links.push(InventoryLink { reference, handle });
            }
        }
    }

    /// Removes a link by reference. The container itself stays alive.
    pub fn unlink(&mut self, character: EntityId, reference: &ContainerRef) {
        if let Some(ch) = self.characters.get_mut(&character) {
            ch.links.retain(|link| link.reference != *reference);
        }
    }

    /// Snapshot of a character's links.
    #[must_use]
    pub fn links(&self, character: EntityId) -> Vec<InventoryLink> {
        self.characters
            .get(&character)
            .map(|c| c.links.clone())
            .unwrap_or_default()
    }

    // ========================================================================
    // World objects
    // ========================================================================

    /// Registers a world object.
    pub fn add_world_object(&mut self, id: EntityId, object: WorldObject) {
        self.world_objects.insert(id, object);
    }

    /// World object by id.
    #[must_use]
    pub fn world_object(&self, id: EntityId) -> Option<&WorldObject> {
        self.world_objects.get(&id)
    }

    /// Removes a world object and its dropped-item container.
    pub fn despawn_world_object(&mut self, id: EntityId) -> Option<WorldObject> {
        let object = self.world_objects.remove(&id)?;
        self.remove(&ContainerRef::dropped(id));
        Some(object)
    }

    /// Registers a non-character entity that owns root containers.
    pub fn add_world_entity(&mut self, id: EntityId) {
        self.world_entities.insert(id);
    }

    /// Returns true if `id` is a registered world entity and not a character.
    #[must_use]
    pub fn is_world_entity(&self, id: EntityId) -> bool {
        self.world_entities.contains(&id) && !self.characters.contains_key(&id)
    }

    /// Returns true if `id` is a character or a registered world entity,
    /// i.e. its containers are roots rather than nested grids.
    #[must_use]
    pub fn is_entity_owner(&self, id: EntityId) -> bool {
        self.characters.contains_key(&id) || self.world_entities.contains(&id)
    }

    /// Number of world objects.
    #[must_use]
    pub fn world_object_count(&self) -> usize {
        self.world_objects.len()
    }

    // ========================================================================
    // Build sites
    // ========================================================================

    /// Registers or replaces a build site.
    pub fn add_build_site(&mut self, id: EntityId, site: BuildSite) {
        self.build_sites.insert(id, site);
    }

    /// Build site by id.
    #[must_use]
    pub fn build_site(&self, id: EntityId) -> Option<&BuildSite> {
        self.build_sites.get(&id)
    }

    /// Mutable build site by id.
    pub fn build_site_mut(&mut self, id: EntityId) -> Option<&mut BuildSite> {
        self.build_sites.get_mut(&id)
    }
}
