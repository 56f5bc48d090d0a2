//! # Citadel Networking - Command Admission
//!
//! The boundary between untrusted network threads and the simulation tick.
//!
//! ## Architecture
//!
//! - **Guard**: per-client sliding-window rate limit and command-id dedup
//! - **Inbox**: bounded double buffer; producers append, the tick swaps
//! - **Fairness**: at most N commands per client per tick, the rest carried
//!   over in order
//! - **Server**: drains once per tick and drives the inventory engine
//!
//! ## Trust Model
//!
//! ```text
//! CLIENT                              SERVER
//!   |                                    |
//!   |--- cmd#41 "move item 7 to hand" -->| guard: rate? dup?
//!   |                                    | inbox: room?
//!   |                                    | tick: validate, place, commit
//!   |<-- update: grid v8, hand v3 -------|
//! ```
//!
//! Network threads never block on simulation state: an enqueue costs one
//! short lock around a `Vec::push`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use citadel_networking::{CitadelConfig, CommandServer, PlayerCommand};
//!
//! let config = CitadelConfig::load("citadel.toml")?;
//! let mut server = CommandServer::from_config(&config)?;
//! let inbox = server.commands();
//!
//! // network thread
//! inbox.enqueue(PlayerCommand::new(client, character, 1, op))?;
//!
//! // tick thread
//! server.tick();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod command;
pub mod config;
pub mod error;
pub mod guard;
pub mod inbox;
pub mod jobs;
pub mod server;

pub use command::{ClientId, PlayerCommand, ServerJob};
pub use config::{CitadelConfig, DataConfig, QueueConfig, ServerConfig};
pub use error::{AdmissionError, AdmissionResult, ConfigError, ServerError};
pub use guard::RateGuard;
pub use inbox::{PlayerCommandInbox, QueueStats};
pub use jobs::ServerJobInbox;
pub use server::{CommandFailure, CommandServer, InventoryUpdate, Outbound, TickLoop, TickReport};

/// Default command tick rate (ticks per second).
pub const DEFAULT_TICK_RATE: u32 = 20;
