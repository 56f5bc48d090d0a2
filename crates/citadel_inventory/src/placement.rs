//! # Placement Engine
//!
//! Pure functions deciding where an item may go. Nothing here mutates a
//! container; the executor applies the returned [`PlacementDecision`].
//!
//! ## Grid rules
//!
//! ```text
//! out of bounds           -> reject
//! 0 colliders             -> Place
//! 2+ colliders            -> reject
//! 1 collider, no flag     -> reject
//! 1 collider, stackable   -> Merge (same type, destination below max)
//! 1 collider, otherwise   -> Swap candidate (see validate_swap)
//! ```
//!
//! The moving item never collides with itself, so repositioning inside one
//! grid works without removing it first. The same holds for a hand or an
//! equipment slot the item already occupies: the result is a `Place`, never
//! a merge or swap with itself.

use crate::defs::ItemRegistry;
use crate::model::{Container, ContainerKind, EquipSlot, ItemInstance};

/// Outcome of a successful placement check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlacementDecision {
    /// Free spot.
    Place {
        /// Column.
        x: u8,
        /// Row.
        y: u8,
    },
    /// Stack into an item of the same type.
    Merge {
        /// Column of the target stack.
        x: u8,
        /// Row of the target stack.
        y: u8,
        /// Index of the target stack in the destination.
        target_index: usize,
        /// Units transferred.
        merged: u32,
        /// Units left in the source item.
        remaining_in_src: u32,
    },
    /// Exchange with the single occupant.
    Swap {
        /// Column of the moving item after the swap.
        x: u8,
        /// Row of the moving item after the swap.
        y: u8,
        /// Index of the occupant in the destination.
        swap_index: usize,
    },
}

#[inline]
fn in_bounds(container: &Container, x: u8, y: u8, w: u8, h: u8) -> bool {
    u16::from(x) + u16::from(w) <= u16::from(container.width)
        && u16::from(y) + u16::from(h) <= u16::from(container.height)
}

fn can_place_at(
    container: &Container,
    x: u8,
    y: u8,
    w: u8,
    h: u8,
    exclude: citadel_core::EntityId,
) -> bool {
    container
        .items
        .iter()
        .filter(|i| i.item_id != exclude)
        .all(|i| !i.overlaps(x, y, w, h))
}

fn try_merge(
    registry: &ItemRegistry,
    item: &ItemInstance,
    target: &ItemInstance,
    target_index: usize,
) -> Option<PlacementDecision> {
    if target.type_id != item.type_id {
        return None;
    }
    let def = registry.get(item.type_id)?;
    if !def.is_stackable() || target.quantity >= def.stack.max {
        return None;
    }
    let merged = item.quantity.min(def.stack.max - target.quantity);
    Some(PlacementDecision::Merge {
        x: target.x,
        y: target.y,
        target_index,
        merged,
        remaining_in_src: item.quantity - merged,
    })
}

/// Checks placing `item` at `(x, y)` in a grid.
#[must_use]
pub fn check_grid(
    registry: &ItemRegistry,
    container: &Container,
    item: &ItemInstance,
    x: u8,
    y: u8,
    allow_swap_or_merge: bool,
) -> Option<PlacementDecision> {
    if container.kind != ContainerKind::Grid
        || !in_bounds(container, x, y, item.width, item.height)
    {
        return None;
    }

    let mut colliders = container
        .items
        .iter()
        .enumerate()
        .filter(|(_, other)| other.item_id != item.item_id)
        .filter(|(_, other)| other.overlaps(x, y, item.width, item.height));

    let Some((index, occupant)) = colliders.next() else {
        return Some(PlacementDecision::Place { x, y });
    };
    if colliders.next().is_some() || !allow_swap_or_merge {
        return None;
    }

    try_merge(registry, item, occupant, index).or(Some(PlacementDecision::Swap {
        x,
        y,
        swap_index: index,
    }))
}

/// Checks placing `item` into a hand.
#[must_use]
pub fn check_hand(
    registry: &ItemRegistry,
    container: &Container,
    item: &ItemInstance,
    allow_swap_or_merge: bool,
) -> Option<PlacementDecision> {
    if container.kind != ContainerKind::Hand {
        return None;
    }
    let Some(held) = container
        .items
        .first()
        .filter(|held| held.item_id != item.item_id)
    else {
        return Some(PlacementDecision::Place { x: 0, y: 0 });
    };
    if !allow_swap_or_merge {
        return None;
    }
    try_merge(registry, item, held, 0).or(Some(PlacementDecision::Swap {
        x: 0,
        y: 0,
        swap_index: 0,
    }))
}

/// Checks placing `item` into an equipment slot.
#[must_use]
pub fn check_equipment(
    container: &Container,
    item: &ItemInstance,
    slot: Option<EquipSlot>,
    allow_swap_or_merge: bool,
) -> Option<PlacementDecision> {
    if container.kind != ContainerKind::Equipment {
        return None;
    }
    let occupant = container
        .items
        .iter()
        .position(|i| i.equip_slot == slot && i.item_id != item.item_id);
    match occupant {
        None => Some(PlacementDecision::Place { x: 0, y: 0 }),
        Some(_) if !allow_swap_or_merge => None,
        Some(swap_index) => Some(PlacementDecision::Swap {
            x: 0,
            y: 0,
            swap_index,
        }),
    }
}

/// First free cell for a `w x h` footprint, scanning rows top to bottom.
#[must_use]
pub fn find_free_space(container: &Container, w: u8, h: u8) -> Option<(u8, u8)> {
    if container.kind != ContainerKind::Grid || w > container.width || h > container.height {
        return None;
    }
    for y in 0..=container.height - h {
        for x in 0..=container.width - w {
            if can_place_at(container, x, y, w, h, citadel_core::EntityId::NONE) {
                return Some((x, y));
            }
        }
    }
    None
}

/// Checks that `swap_item` fits where `moving` currently sits in `src`.
///
/// Grid sources need the swap item in bounds and clear of every other
/// item. When the swap happens inside `src` itself, `moving_to` is the
/// moving item's new origin and the two new footprints must not overlap
/// either. Hands and equipment always accept; their item rules are checked
/// by the validator.
#[must_use]
pub fn validate_swap(
    src: &Container,
    moving: &ItemInstance,
    swap_item: &ItemInstance,
    moving_to: Option<(u8, u8)>,
) -> bool {
    match src.kind {
        ContainerKind::Grid => {
            let (sx, sy, sw, sh) = (moving.x, moving.y, swap_item.width, swap_item.height);
            if !in_bounds(src, sx, sy, sw, sh) {
                return false;
            }
            let clear = src
                .items
                .iter()
                .filter(|i| i.item_id != moving.item_id && i.item_id != swap_item.item_id)
                .all(|i| !i.overlaps(sx, sy, sw, sh));
            let apart = moving_to.map_or(true, |(x, y)| {
                !rects_overlap((x, y, moving.width, moving.height), (sx, sy, sw, sh))
            });
            clear && apart
        }
        ContainerKind::Hand | ContainerKind::Equipment => true,
        ContainerKind::DroppedItem | ContainerKind::BuildSlot => false,
    }
}

/// Axis-aligned overlap of two `(x, y, w, h)` rectangles.
fn rects_overlap(a: (u8, u8, u8, u8), b: (u8, u8, u8, u8)) -> bool {
    let (ax, ay, aw, ah) = (u16::from(a.0), u16::from(a.1), u16::from(a.2), u16::from(a.3));
    let (bx, by, bw, bh) = (u16::from(b.0), u16::from(b.1), u16::from(b.2), u16::from(b.3));
    ax < bx + bw && ax + aw > bx && ay < by + bh && ay + ah > by
}
