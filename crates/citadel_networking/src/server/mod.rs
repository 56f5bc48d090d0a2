//! # Command Server
//!
//! Owns the inventory engine and applies admitted work once per tick.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        COMMAND SERVER                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  network threads         tick thread           consumers     │
//! │  ┌──────────────┐   ┌──────────────────┐   ┌──────────────┐  │
//! │  │ Arc<Inbox>   │──▶│ drain + fairness │──▶│ Receiver<    │  │
//! │  │  .enqueue()  │   │ InventoryService │   │  Outbound>   │  │
//! │  └──────────────┘   │ mark_processed   │   └──────────────┘  │
//! │  ┌──────────────┐   │ drain jobs       │                     │
//! │  │ Arc<Jobs>    │──▶│                  │                     │
//! │  └──────────────┘   └──────────────────┘                     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Per tick: drain commands, dispatch each, mark it processed whatever the
//! result, emit an update or a failure, then drain jobs.

mod tick;

pub use tick::{TickLoop, TickStats};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use citadel_core::EntityId;
use citadel_inventory::{
    Container, ErrorCode, InventoryService, ItemRegistry, NullPersister, OperationOutcome,
    OverflowPolicy, RecipeRegistry, SequentialIdAllocator,
};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::command::{ClientId, PlayerCommand, ServerJob};
use crate::config::CitadelConfig;
use crate::error::ServerError;
use crate::inbox::PlayerCommandInbox;
use crate::jobs::ServerJobInbox;

/// Result of one successful command or job.
#[derive(Clone, Debug, PartialEq)]
pub struct InventoryUpdate {
    /// Requesting client; `None` for server-initiated grants.
    pub client_id: Option<ClientId>,
    /// Character acted on.
    pub character_id: EntityId,
    /// Command that produced the update, if any.
    pub command_id: Option<u64>,
    /// Containers to broadcast, closed windows, world changes.
    pub outcome: OperationOutcome,
}

/// A command that was processed but rejected by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandFailure {
    /// Requesting client.
    pub client_id: ClientId,
    /// Character the command acted for.
    pub character_id: EntityId,
    /// Rejected command.
    pub command_id: u64,
    /// Protocol error code.
    pub code: ErrorCode,
    /// Human-readable reason.
    pub message: String,
}

/// Everything the tick hands to the broadcast side.
#[derive(Clone, Debug, PartialEq)]
pub enum Outbound {
    /// State changed.
    Update(InventoryUpdate),
    /// A command failed; nothing changed.
    Failure(CommandFailure),
    /// Full container set of a character.
    Snapshot {
        /// Recipient.
        client_id: ClientId,
        /// Character the containers belong to.
        character_id: EntityId,
        /// Linked containers.
        containers: Vec<Container>,
    },
}

/// Per-tick counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Commands dispatched.
    pub commands: usize,
    /// Commands the engine rejected.
    pub failed: usize,
    /// Jobs run.
    pub jobs: usize,
}

/// The tick-side owner of inventory state.
pub struct CommandServer {
    inventory: InventoryService,
    commands: Arc<PlayerCommandInbox>,
    jobs: Arc<ServerJobInbox>,
    outbound_tx: Sender<Outbound>,
    outbound_rx: Receiver<Outbound>,
    command_read: Vec<PlayerCommand>,
    job_read: Vec<ServerJob>,
    tick: u64,
    outbound_dropped: AtomicU64,
}

impl std::fmt::Debug for CommandServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandServer")
            .field("tick", &self.tick)
            .field("inventory", &self.inventory)
            .field("commands", &self.commands.stats())
            .field("jobs", &self.jobs.stats())
            .finish_non_exhaustive()
    }
}

impl CommandServer {
    /// Creates a server around an existing inventory engine.
    #[must_use]
    pub fn new(config: &CitadelConfig, inventory: InventoryService) -> Self {
        let (outbound_tx, outbound_rx) = bounded(config.server.outbound_capacity);
        let queue_size = config.queue.max_queue_size;
        Self {
            inventory,
            commands: Arc::new(PlayerCommandInbox::new(&config.queue)),
            jobs: Arc::new(ServerJobInbox::new(queue_size)),
            outbound_tx,
            outbound_rx,
            command_read: Vec::with_capacity(queue_size),
            job_read: Vec::with_capacity(queue_size),
            tick: 0,
            outbound_dropped: AtomicU64::new(0),
        }
    }

    /// Loads definitions from `config.data` and builds a server with an
    /// in-memory persister.
    ///
    /// # Errors
    ///
    /// [`ServerError::Definitions`] when a definition file fails to load.
    pub fn from_config(config: &CitadelConfig) -> Result<Self, ServerError> {
        let items = ItemRegistry::load(&config.data.items)?;
        let recipes = RecipeRegistry::load(&config.data.recipes, &items)?;
        let inventory = InventoryService::new(
            Arc::new(items),
            Arc::new(recipes),
            Box::new(SequentialIdAllocator::default()),
            Box::new(NullPersister),
            config.inventory.clone(),
        );
        Ok(Self::new(config, inventory))
    }

    /// Producer handle for network threads.
    #[must_use]
    pub fn commands(&self) -> Arc<PlayerCommandInbox> {
        Arc::clone(&self.commands)
    }

    /// Producer handle for internal jobs.
    #[must_use]
    pub fn jobs(&self) -> Arc<ServerJobInbox> {
        Arc::clone(&self.jobs)
    }

    /// Consumer side of the outbound channel.
    #[must_use]
    pub fn outbound(&self) -> Receiver<Outbound> {
        self.outbound_rx.clone()
    }

    /// The inventory engine.
    #[must_use]
    pub const fn inventory(&self) -> &InventoryService {
        &self.inventory
    }

    /// Mutable access for setup between ticks (spawning characters, loading
    /// containers).
    pub fn inventory_mut(&mut self) -> &mut InventoryService {
        &mut self.inventory
    }

    /// Ticks run so far.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Outbound messages lost to a full channel.
    #[must_use]
    pub fn outbound_dropped(&self) -> u64 {
        self.outbound_dropped.load(Ordering::Relaxed)
    }

    /// Forgets a client's admission state and its opened containers.
    /// Commands already queued still run.
    pub fn disconnect(&mut self, client_id: ClientId, character_id: EntityId) {
        self.commands.remove_client(client_id);
        self.inventory.disconnect(character_id);
        tracing::info!("{} disconnected (character {})", client_id, character_id);
    }

    /// Runs one tick.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        self.commands.drain_into(&mut self.command_read);
        let mut commands = std::mem::take(&mut self.command_read);
        for command in commands.drain(..) {
            report.commands += 1;
            if !self.dispatch(command) {
                report.failed += 1;
            }
        }
        self.command_read = commands;

        self.jobs.drain_into(&mut self.job_read);
        let mut jobs = std::mem::take(&mut self.job_read);
        for job in jobs.drain(..) {
            report.jobs += 1;
            self.run_job(job);
        }
        self.job_read = jobs;

        self.tick += 1;
        report
    }

    /// Applies one command. Returns false if the engine rejected it.
    fn dispatch(&mut self, command: PlayerCommand) -> bool {
        let result = self.inventory.execute(command.character_id, &command.payload);
        self.commands
            .mark_processed(command.client_id, command.command_id);

        match result {
            Ok(outcome) => {
                self.emit(Outbound::Update(InventoryUpdate {
                    client_id: Some(command.client_id),
                    character_id: command.character_id,
                    command_id: Some(command.command_id),
                    outcome,
                }));
                true
            }
            Err(e) => {
                tracing::warn!(
                    "Command {} ({}) from {} failed: {}",
                    command.command_id,
                    command.payload.name(),
                    command.client_id,
                    e
                );
                self.emit(Outbound::Failure(CommandFailure {
                    client_id: command.client_id,
                    character_id: command.character_id,
                    command_id: command.command_id,
                    code: e.code(),
                    message: e.to_string(),
                }));
                false
            }
        }
    }

    fn run_job(&mut self, job: ServerJob) {
        match job {
            ServerJob::SendInventorySnapshot {
                client_id,
                character_id,
            } => match self.inventory.snapshot_character(character_id) {
                Ok(containers) => self.emit(Outbound::Snapshot {
                    client_id,
                    character_id,
                    containers,
                }),
                Err(e) => tracing::warn!("Snapshot for {} failed: {}", character_id, e),
            },
            ServerJob::GrantItem {
                character_id,
                item_key,
                count,
                quality,
            } => match self.inventory.give_item(
                character_id,
                &item_key,
                count,
                quality,
                OverflowPolicy::DropToWorld,
            ) {
                Ok(outcome) => self.emit(Outbound::Update(InventoryUpdate {
                    client_id: None,
                    character_id,
                    command_id: None,
                    outcome,
                })),
                Err(e) => tracing::warn!("Grant of {} to {} failed: {}", item_key, character_id, e),
            },
        }
    }

    fn emit(&self, message: Outbound) {
        match self.outbound_tx.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.outbound_dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Outbound channel full, update dropped");
            }
            // the receiver half lives in `self`, so the channel never disconnects
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use citadel_inventory::{ContainerKind, ContainerRef, InventoryConfig, InventoryOp};

    fn server() -> CommandServer {
        let items = ItemRegistry::from_toml_str(
            "v = 1\n[[items]]\ndef_id = 1\nkey = \"stone\"\n",
        )
        .unwrap();
        let inventory = InventoryService::new(
            Arc::new(items),
            Arc::new(RecipeRegistry::default()),
            Box::new(SequentialIdAllocator::default()),
            Box::new(NullPersister),
            InventoryConfig::default(),
        );
        CommandServer::new(&CitadelConfig::default(), inventory)
    }

    #[test]
    fn test_empty_tick() {
        let mut server = server();
        assert_eq!(server.tick(), TickReport::default());
        assert_eq!(server.current_tick(), 1);
    }

    #[test]
    fn test_failure_is_processed_and_reported() {
        let mut server = server();
        let inbox = server.commands();
        let player = EntityId(7);
        let op = InventoryOp::OpenContainer {
            reference: ContainerRef::new(EntityId(99), ContainerKind::Grid, 0),
        };
        inbox
            .enqueue(PlayerCommand::new(ClientId(1), player, 1, op))
            .unwrap();

        let report = server.tick();
        assert_eq!(report.failed, 1);
        assert_eq!(inbox.stats().processed, 1);
        match server.outbound().try_recv().unwrap() {
            Outbound::Failure(f) => assert_eq!(f.code, ErrorCode::EntityNotFound),
            other => panic!("unexpected {other:?}"),
        }
    }
}
