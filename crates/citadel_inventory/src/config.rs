//! Inventory engine tunables.

use serde::Deserialize;

/// Default cursor offset applied when an item enters the hand without one.
pub const DEFAULT_HAND_OFFSET: i16 = 15;

/// Default pickup radius in world units.
pub const DEFAULT_PICKUP_RADIUS: f32 = 64.0;

/// Inventory engine settings (`[inventory]` section of the server config).
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InventoryConfig {
    /// Maximum distance between a character and a dropped item it picks up
    /// or a build site it feeds.
    pub pickup_radius: f32,
    /// Hand cursor offset used when the request carries none.
    pub default_hand_offset: i16,
}

impl InventoryConfig {
    /// Squared pickup radius, compared against squared distances.
    #[inline]
    #[must_use]
    pub fn pickup_radius_sq(&self) -> f32 {
        self.pickup_radius * self.pickup_radius
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            pickup_radius: DEFAULT_PICKUP_RADIUS,
            default_hand_offset: DEFAULT_HAND_OFFSET,
        }
    }
}
