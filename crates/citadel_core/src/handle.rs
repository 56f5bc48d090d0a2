//! # Identifiers
//!
//! Two kinds of identity live side by side:
//! - [`EntityId`]: stable, externally visible id (characters, items, world objects)
//! - [`Handle`]: internal slot reference with a generation counter for safe reuse

use serde::{Deserialize, Serialize};
use std::fmt;

/// Externally visible identifier of a simulation entity.
///
/// Item instances, characters and dropped world objects share this id space.
/// Zero is reserved as "no entity".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct EntityId(pub u64);

impl EntityId {
    /// The reserved "no entity" id.
    pub const NONE: Self = Self(0);

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Checks whether this is the reserved "no entity" id.
    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Reference to a live slot inside an [`Arena`](crate::Arena).
///
/// The ID is split into two parts:
/// - Lower 32 bits: slot index
/// - Upper 32 bits: generation counter for detecting stale references
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Handle(u64);

impl Handle {
    /// Creates a handle from index and generation.
    ///
    /// # Arguments
    ///
    /// * `index` - Slot index (0 to 2^32-1)
    /// * `generation` - Generation of the slot at allocation time
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Returns the slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Returns the generation.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Invalid handle, never issued by an arena.
    pub const INVALID: Self = Self(u64::MAX);

    /// Checks if this handle is the invalid sentinel.
    #[inline]
    #[must_use]
    pub const fn is_invalid(self) -> bool {
        self.0 == u64::MAX
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::INVALID
    }
}
