//! # Citadel Inventory
//!
//! Authoritative, versioned container state for the simulation tick.
//!
//! ## Guarantees
//!
//! 1. **Validate, then mutate** - every precondition (authorization,
//!    expected versions, item rules, collisions) is checked before the first
//!    write
//! 2. **One bump per touched container** - `version` is the optimistic
//!    concurrency token clients echo back
//! 3. **No overlap** - grid items never intersect; a hand holds one item;
//!    equipment holds one item per slot
//! 4. **Nested containers survive** - a container item's grid follows it
//!    through moves, drops and pickups
//! 5. **Own containers only** - a player reaches its own containers, nested
//!    grids of items it holds, and the world container it opened
//!
//! ## Pipeline
//!
//! ```text
//! InventoryOp ──> Validator ──> placement ──> executor ──> cascade
//!                  │ resolve      │ Place       │ commit     │ parent resource
//!                  │ authorize    │ Merge       │            │ + version
//!                  │ versions     │ Swap        │            ▼
//!                  ▼              ▼             ▼       OperationOutcome
//!              InventoryError (nothing written)
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use citadel_inventory::{InventoryService, InventoryOp, MoveSpec};
//!
//! let mut inventory = InventoryService::new(items, recipes, ids, persister, config);
//! inventory.spawn_character(player, position, 5, 5);
//!
//! let outcome = inventory.execute(player, &InventoryOp::Move(spec))?;
//! for container in &outcome.updated {
//!     broadcast(container);
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod build;
mod cascade;
pub mod command;
pub mod config;
mod craft;
pub mod defs;
pub mod error;
mod executor;
pub mod give;
pub mod integration;
pub mod model;
mod nested;
pub mod placement;
pub mod service;
pub mod store;
pub mod validation;
mod world;

pub use build::{BuildRequirement, BuildSite, PutStack};
pub use command::{ExpectedVersion, GridPos, HandPos, InventoryOp, MoveSpec};
pub use config::InventoryConfig;
pub use defs::{ItemDef, ItemRegistry, Recipe, RecipeRegistry};
pub use error::{DefinitionError, ErrorCode, InventoryError, InventoryResult, PersistError};
pub use give::OverflowPolicy;
pub use integration::{
    DroppedItemPersister, DroppedObjectRecord, IdAllocator, NullPersister, RecordingPersister,
    SequentialIdAllocator,
};
pub use model::{Container, ContainerKind, ContainerRef, EquipSlot, HandOffset, ItemInstance};
pub use placement::PlacementDecision;
pub use service::{GrantSummary, InventoryService, OperationOutcome};
pub use store::ContainerStore;
pub use validation::Validator;
