//! Granting new items to a character.
//!
//! Each unit becomes its own instance with quantity 1 and is placed into
//! the first container that takes it:
//!
//! ```text
//! root grids (link order) -> nested grids (content rules) -> empty hand
//!                                                              │
//!                                          nowhere fits ───────┴──> OverflowPolicy
//! ```

use citadel_core::{EntityId, Handle};

use crate::defs::ItemDef;
use crate::error::{InventoryError, InventoryResult};
use crate::model::{ContainerKind, ItemInstance};
use crate::placement;
use crate::service::{GrantSummary, InventoryService, OperationOutcome, UpdateSet};

/// What to do with units that fit nowhere.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Spawn them as dropped items at the character's feet.
    #[default]
    DropToWorld,
    /// Do not grant them.
    Discard,
}

/// Where a unit can go, decided before any id is allocated.
enum Slot {
    Grid { handle: Handle, x: u8, y: u8 },
    Hand { handle: Handle },
}

/// Per-call grant bookkeeping.
#[derive(Debug, Default)]
pub(crate) struct GrantResult {
    pub(crate) summary: GrantSummary,
    pub(crate) spawned: Vec<EntityId>,
    pub(crate) updates: UpdateSet,
}

impl InventoryService {
    /// Grants `count` units of `item_key` (0 counts as 1).
    ///
    /// # Errors
    ///
    /// [`InventoryError::NotFound`] for an unknown key or character,
    /// [`InventoryError::InvalidPlacement`] when not a single unit was
    /// granted or dropped.
    pub fn give_item(
        &mut self,
        player: EntityId,
        item_key: &str,
        count: u32,
        quality: u32,
        overflow: OverflowPolicy,
    ) -> InventoryResult<OperationOutcome> {
        let requested = count.max(1);
        let grant = self.grant_units(player, item_key, requested, quality, overflow)?;
        let summary = grant.summary;
        if summary.granted + summary.dropped == 0 {
            return Err(InventoryError::InvalidPlacement(format!(
                "no room for {item_key}"
            )));
        }
        tracing::info!(
            "Gave {}/{} {} to {} ({} dropped)",
            summary.granted,
            summary.requested,
            item_key,
            player,
            summary.dropped
        );
        let mut outcome = self.finish(player, grant.updates);
        outcome.spawned_dropped = grant.spawned;
        outcome.message = Some(format!("{}/{} granted", summary.granted, summary.requested));
        outcome.grant = Some(summary);
        Ok(outcome)
    }

    /// Places `count` fresh units without running the cascade.
    pub(crate) fn grant_units(
        &mut self,
        player: EntityId,
        item_key: &str,
        count: u32,
        quality: u32,
        overflow: OverflowPolicy,
    ) -> InventoryResult<GrantResult> {
        let def = self
            .items()
            .get_by_key(item_key)
            .cloned()
            .ok_or_else(|| InventoryError::NotFound(format!("item key {item_key}")))?;
        let position = self
            .store
            .character(player)
            .map(|ch| ch.position)
            .ok_or_else(|| InventoryError::NotFound(format!("character {player}")))?;

        let mut result = GrantResult {
            summary: GrantSummary {
                requested: count,
                ..GrantSummary::default()
            },
            ..GrantResult::default()
        };

        for _ in 0..count {
            match self.find_give_slot(player, &def) {
                Some(slot) => {
                    let id = self.ids.next_id();
                    let (handle, in_hand) = self.place_new_unit(&def, id, quality, slot);
                    result.updates.insert(handle);
                    result.summary.granted += 1;
                    result.summary.placed_in_hand |= in_hand;
                    if let Some(nested) = self.ensure_nested_for(player, handle, id, &def) {
                        result.updates.insert(nested);
                    }
                }
                None if overflow == OverflowPolicy::DropToWorld => {
                    let id = self.ids.next_id();
                    self.spawn_dropped(id, new_instance(&def, id, quality), player, position);
                    self.persist_dropped(id);
                    result.spawned.push(id);
                    result.summary.dropped += 1;
                }
                None => {}
            }
        }
        Ok(result)
    }

    fn find_give_slot(&self, player: EntityId, def: &ItemDef) -> Option<Slot> {
        let links = self.store.links(player);
        let grid_fit = |handle: Handle| {
            self.store
                .get(handle)
                .and_then(|c| placement::find_free_space(c, def.size.w, def.size.h))
                .map(|(x, y)| Slot::Grid { handle, x, y })
        };

        if def.allowed.grid {
            let root = links
                .iter()
                .filter(|l| l.reference.kind == ContainerKind::Grid && l.reference.owner_id == player)
                .find_map(|l| grid_fit(l.handle));
            if root.is_some() {
                return root;
            }
            let nested = links
                .iter()
                .filter(|l| l.reference.kind == ContainerKind::Grid && l.reference.owner_id != player)
                .filter(|l| {
                    self.validator
                        .check_content_rules(&self.store, player, def, l.reference.owner_id)
                        .is_ok()
                })
                .find_map(|l| grid_fit(l.handle));
            if nested.is_some() {
                return nested;
            }
        }

        if !def.allowed.hand {
            return None;
        }
        links
            .iter()
            .filter(|l| l.reference.kind == ContainerKind::Hand && l.reference.owner_id == player)
            .find(|l| self.store.get(l.handle).is_some_and(|c| c.items.is_empty()))
            .map(|l| Slot::Hand { handle: l.handle })
    }

    /// Inserts one unit and bumps its container. Returns the container and
    /// whether it is a hand.
    fn place_new_unit(&mut self, def: &ItemDef, id: EntityId, quality: u32, slot: Slot) -> (Handle, bool) {
        let mut item = new_instance(def, id, quality);
        let default_offset = self.default_hand_offset();
        let (handle, in_hand) = match slot {
            Slot::Grid { handle, x, y } => {
                item.x = x;
                item.y = y;
                (handle, false)
            }
            Slot::Hand { handle } => (handle, true),
        };
        if let Some(c) = self.store.get_mut(handle) {
            c.items.push(item);
            if in_hand {
                c.hand_offset = default_offset;
            }
            c.bump_version();
        }
        (handle, in_hand)
    }

    fn ensure_nested_for(
        &mut self,
        player: EntityId,
        holder: Handle,
        id: EntityId,
        def: &ItemDef,
    ) -> Option<Handle> {
        def.container.as_ref()?;
        let item = self.store.get(holder)?.find_item(id)?.1.clone();
        self.ensure_nested_container(player, &item, def)
    }
}

fn new_instance(def: &ItemDef, id: EntityId, quality: u32) -> ItemInstance {
    ItemInstance {
        item_id: id,
        type_id: def.def_id,
        resource: def.resolve_resource(false).to_string(),
        quality,
        quantity: 1,
        width: def.size.w,
        height: def.size.h,
        x: 0,
        y: 0,
        equip_slot: None,
    }
}
