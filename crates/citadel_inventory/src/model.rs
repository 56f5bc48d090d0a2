//! # Container Model
//!
//! Containers, item instances and the `(owner, kind, key)` identity triple.
//!
//! ```text
//! character 42
//! ├── Grid  (42, Grid, 0)        backpack
//! │   └── item 900 "seed_bag"
//! │        └── Grid (900, Grid, 0)   nested, owned by the item
//! ├── Hand  (42, Hand, 0)
//! └── Equipment (42, Equipment, 0)
//! ```

use citadel_core::EntityId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ContainerKind {
    /// Two-dimensional grid with bounding-box collision.
    Grid = 0,
    /// Single item held in the hand.
    Hand = 1,
    /// One item per equipment slot.
    Equipment = 2,
    /// Holder of a single item lying in the world.
    DroppedItem = 3,
    /// Construction site input slot.
    BuildSlot = 4,
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Grid => "grid",
            Self::Hand => "hand",
            Self::Equipment => "equipment",
            Self::DroppedItem => "dropped_item",
            Self::BuildSlot => "build_slot",
        };
        f.write_str(name)
    }
}

/// Equipment slot identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlot {
    /// Helmet.
    Head,
    /// Body armour.
    Chest,
    /// Leg armour.
    Legs,
    /// Boots.
    Feet,
    /// Gloves.
    Hands,
    /// Off-hand tool or shield.
    LeftHand,
    /// Main-hand tool or weapon.
    RightHand,
    /// Cloak or backpack slot.
    Back,
    /// Amulet.
    Neck,
    /// First ring.
    #[serde(rename = "ring1")]
    Ring1,
    /// Second ring.
    #[serde(rename = "ring2")]
    Ring2,
}

impl EquipSlot {
    /// Name used by item definitions (`allowed.equipment_slots`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Chest => "chest",
            Self::Legs => "legs",
            Self::Feet => "feet",
            Self::Hands => "hands",
            Self::LeftHand => "left_hand",
            Self::RightHand => "right_hand",
            Self::Back => "back",
            Self::Neck => "neck",
            Self::Ring1 => "ring1",
            Self::Ring2 => "ring2",
        }
    }
}

/// Logical identity of a container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerRef {
    /// Character, item or world object that owns the container.
    pub owner_id: EntityId,
    /// Container kind.
    pub kind: ContainerKind,
    /// Discriminator among containers of the same owner and kind.
    pub key: u32,
}

impl ContainerRef {
    /// Creates a reference.
    #[inline]
    #[must_use]
    pub const fn new(owner_id: EntityId, kind: ContainerKind, key: u32) -> Self {
        Self {
            owner_id,
            kind,
            key,
        }
    }

    /// The grid owned by an item (`owner = item_id`, key 0).
    #[inline]
    #[must_use]
    pub const fn nested(item_id: EntityId) -> Self {
        Self::new(item_id, ContainerKind::Grid, 0)
    }

    /// The container of a dropped world object.
    #[inline]
    #[must_use]
    pub const fn dropped(object_id: EntityId) -> Self {
        Self::new(object_id, ContainerKind::DroppedItem, 0)
    }
}

impl fmt::Display for ContainerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.owner_id, self.kind, self.key)
    }
}

/// One item instance inside a container.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInstance {
    /// Globally unique instance id.
    pub item_id: EntityId,
    /// Definition id.
    pub type_id: u32,
    /// Derived visual resource (see the nested cascade).
    pub resource: String,
    /// Quality of the instance.
    pub quality: u32,
    /// Stack size.
    pub quantity: u32,
    /// Footprint width in cells.
    pub width: u8,
    /// Footprint height in cells.
    pub height: u8,
    /// Grid column (grid containers only).
    pub x: u8,
    /// Grid row (grid containers only).
    pub y: u8,
    /// Slot (equipment containers only).
    pub equip_slot: Option<EquipSlot>,
}

impl ItemInstance {
    /// Checks whether this item's footprint overlaps the rectangle.
    #[inline]
    #[must_use]
    pub const fn overlaps(&self, x: u8, y: u8, width: u8, height: u8) -> bool {
        // Widen to u16: x + width may exceed u8 at the grid edge.
        let (x, y, w, h) = (x as u16, y as u16, width as u16, height as u16);
        let (ix, iy, iw, ih) = (
            self.x as u16,
            self.y as u16,
            self.width as u16,
            self.height as u16,
        );
        x < ix + iw && x + w > ix && y < iy + ih && y + h > iy
    }
}

/// Cursor offset of an item held in the hand.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandOffset {
    /// Horizontal offset in pixels.
    pub x: i16,
    /// Vertical offset in pixels.
    pub y: i16,
}

/// A live container.
///
/// Cloning a container produces the snapshot handed back to transport and
/// persistence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Owning entity.
    pub owner_id: EntityId,
    /// Container kind.
    pub kind: ContainerKind,
    /// Discriminator.
    pub key: u32,
    /// Optimistic-concurrency token; bumped once per committed mutation.
    pub version: u64,
    /// Grid width (0 for non-grid containers).
    pub width: u8,
    /// Grid height (0 for non-grid containers).
    pub height: u8,
    /// Held items.
    pub items: Vec<ItemInstance>,
    /// Cursor offset (hand containers only).
    #[serde(default)]
    pub hand_offset: HandOffset,
}

impl Container {
    /// Creates an empty container at version 1.
    #[must_use]
    pub const fn new(owner_id: EntityId, kind: ContainerKind, key: u32, width: u8, height: u8) -> Self {
        Self {
            owner_id,
            kind,
            key,
            version: 1,
            width,
            height,
            items: Vec::new(),
            hand_offset: HandOffset { x: 0, y: 0 },
        }
    }

    /// Identity triple of this container.
    #[inline]
    #[must_use]
    pub const fn reference(&self) -> ContainerRef {
        ContainerRef::new(self.owner_id, self.kind, self.key)
    }

    /// Index and reference of an item by instance id.
    #[must_use]
    pub fn find_item(&self, item_id: EntityId) -> Option<(usize, &ItemInstance)> {
        self.items
            .iter()
            .enumerate()
            .find(|(_, item)| item.item_id == item_id)
    }

    /// Records one committed mutation.
    #[inline]
    pub fn bump_version(&mut self) {
        self.version += 1;
    }

    /// Removes the item at `index`, resetting the hand offset if a hand empties.
    ///
    /// Returns `None` and leaves the container untouched when `index` is out
    /// of range.
    pub(crate) fn take_item(&mut self, index: usize) -> Option<ItemInstance> {
        if index >= self.items.len() {
            return None;
        }
        let item = self.items.remove(index);
        if self.kind == ContainerKind::Hand && self.items.is_empty() {
            self.hand_offset = HandOffset::default();
        }
        Some(item)
    }
}
