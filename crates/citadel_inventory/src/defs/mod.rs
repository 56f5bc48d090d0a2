//! # Definitions
//!
//! Read-only item and recipe data, loaded from TOML once at startup and
//! shared as `Arc<ItemRegistry>` / `Arc<RecipeRegistry>`.
//!
//! ```toml
//! v = 1
//!
//! [[items]]
//! def_id = 7
//! key = "seed_bag"
//! tags = ["container"]
//! size = { w = 2, h = 2 }
//! container = { size = { w = 3, h = 3 }, rules = { allow_tags = ["seed"] } }
//! visual = { nested_inventory = { has_items = "bag_seed_full", empty = "bag_seed" } }
//! ```

mod item;
mod recipe;
mod registry;

pub use item::{
    Allowed, ContainerDef, ContentRules, ItemDef, NestedInventoryVisual, Size, StackDef, StackMode,
    Visual,
};
pub use recipe::{Recipe, RecipeInput, RecipeOutput, RecipeRegistry};
pub use registry::ItemRegistry;

/// Only supported schema version of definition files.
pub const DEFINITIONS_VERSION: u32 = 1;
