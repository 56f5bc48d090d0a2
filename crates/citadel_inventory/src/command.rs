//! Inventory operations as submitted by clients and server jobs.

use citadel_core::EntityId;
use serde::{Deserialize, Serialize};

use crate::model::{ContainerRef, EquipSlot};

/// Declared version of a container the client based its request on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedVersion {
    /// Container.
    pub reference: ContainerRef,
    /// Version the client saw.
    pub version: u64,
}

/// Grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPos {
    /// Column.
    pub x: u8,
    /// Row.
    pub y: u8,
}

/// Cursor offset reported when an item is taken into the hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandPos {
    /// Horizontal offset.
    pub mouse_offset_x: i16,
    /// Vertical offset.
    pub mouse_offset_y: i16,
}

/// A move between (or within) containers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveSpec {
    /// Source container.
    pub src: ContainerRef,
    /// Destination container.
    pub dst: ContainerRef,
    /// Item to move.
    pub item_id: EntityId,
    /// Target cell for grid destinations; first free cell when absent.
    #[serde(default)]
    pub dst_pos: Option<GridPos>,
    /// Target slot for equipment destinations.
    #[serde(default)]
    pub dst_equip_slot: Option<EquipSlot>,
    /// Cursor offset for hand destinations.
    #[serde(default)]
    pub hand_pos: Option<HandPos>,
    /// Permit merging into or swapping with an occupant.
    #[serde(default)]
    pub allow_swap_or_merge: bool,
    /// Optimistic-concurrency preconditions.
    #[serde(default)]
    pub expected: Vec<ExpectedVersion>,
}

/// Every operation the inventory engine executes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum InventoryOp {
    /// Move, merge or swap.
    Move(MoveSpec),
    /// Drop an item at the character's feet.
    DropToWorld {
        /// Source container.
        src: ContainerRef,
        /// Item to drop.
        item_id: EntityId,
        /// Optional preconditions.
        #[serde(default)]
        expected: Vec<ExpectedVersion>,
    },
    /// Pick up a dropped item.
    PickupFromWorld {
        /// World object id.
        dropped_id: EntityId,
        /// Destination container.
        dst: ContainerRef,
    },
    /// Grant new items (admin or server mechanic).
    GiveItem {
        /// Item key.
        item_key: String,
        /// Units to grant; 0 means 1.
        count: u32,
        /// Quality of every unit.
        quality: u32,
    },
    /// Run a recipe once.
    Craft {
        /// Recipe key.
        recipe_key: String,
    },
    /// Open a foreign container for interaction.
    OpenContainer {
        /// Container to open.
        reference: ContainerRef,
    },
    /// Close a previously opened container.
    CloseContainer {
        /// Container to close.
        reference: ContainerRef,
    },
}

impl InventoryOp {
    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Move(_) => "move",
            Self::DropToWorld { .. } => "drop_to_world",
            Self::PickupFromWorld { .. } => "pickup_from_world",
            Self::GiveItem { .. } => "give_item",
            Self::Craft { .. } => "craft",
            Self::OpenContainer { .. } => "open_container",
            Self::CloseContainer { .. } => "close_container",
        }
    }
}
