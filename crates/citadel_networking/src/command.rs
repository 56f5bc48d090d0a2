//! Commands and jobs carried by the inboxes.

use std::fmt;
use std::time::Instant;

use citadel_core::EntityId;
use citadel_inventory::InventoryOp;

/// Identifier of one client connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client#{}", self.0)
    }
}

/// A client's intent, immutable once admitted.
#[derive(Clone, Debug)]
pub struct PlayerCommand {
    /// Connection that sent the command.
    pub client_id: ClientId,
    /// Character the command acts for.
    pub character_id: EntityId,
    /// Monotonic per connection; used for dedup.
    pub command_id: u64,
    /// What to do.
    pub payload: InventoryOp,
    /// Arrival time; the rate guard counts this instant.
    pub received_at: Instant,
}

impl PlayerCommand {
    /// Creates a command stamped with the current time.
    #[must_use]
    pub fn new(
        client_id: ClientId,
        character_id: EntityId,
        command_id: u64,
        payload: InventoryOp,
    ) -> Self {
        Self {
            client_id,
            character_id,
            command_id,
            payload,
            received_at: Instant::now(),
        }
    }

    /// Overrides the arrival time.
    #[must_use]
    pub fn with_received_at(mut self, at: Instant) -> Self {
        self.received_at = at;
        self
    }
}

/// Work the server schedules for itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerJob {
    /// Send every container linked to a character, e.g. after login.
    SendInventorySnapshot {
        /// Recipient.
        client_id: ClientId,
        /// Character whose containers are sent.
        character_id: EntityId,
    },
    /// Grant items outside of any client request (quests, admin tools).
    GrantItem {
        /// Recipient character.
        character_id: EntityId,
        /// Item definition key.
        item_key: String,
        /// Units to grant.
        count: u32,
        /// Quality of every unit.
        quality: u32,
    },
}

impl ServerJob {
    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SendInventorySnapshot { .. } => "send_inventory_snapshot",
            Self::GrantItem { .. } => "grant_item",
        }
    }
}
