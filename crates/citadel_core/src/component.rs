//! # World Components
//!
//! Plain-data components attached to characters and world objects.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Position of an entity on the world plane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
#[repr(C)]
pub struct WorldPosition {
    /// X coordinate in world units.
    pub x: f32,
    /// Y coordinate in world units.
    pub y: f32,
}

impl WorldPosition {
    /// Creates a new position.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Squared distance to another position.
    ///
    /// Range checks compare squared values to avoid the square root.
    #[inline]
    #[must_use]
    pub fn distance_sq(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}
