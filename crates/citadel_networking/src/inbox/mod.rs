//! # Player Command Inbox
//!
//! ## Flow
//!
//! ```text
//! network thread                               tick thread
//! ──────────────                               ───────────
//! enqueue(cmd)                                 drain_into(&mut read)
//!   │ RateGuard::check  (no queue lock)          │ swap buffers      (O(1))
//!   │ SwapBuffer::try_push (short lock)          │ apply_fairness    (no lock)
//!   │   full -> Overflow, dropped += 1           │ excess -> front of write side
//!   │ RateGuard::record                          ▼
//!   ▼                                          dispatch, then mark_processed
//! Ok, received += 1
//! ```
//!
//! Admitted commands are never cancelled. Disconnecting a client only
//! forgets its guard state; commands already queued still run.

mod fairness;

pub use fairness::apply_fairness;

use std::sync::atomic::{AtomicU64, Ordering};

use citadel_core::SwapBuffer;

use crate::command::{ClientId, PlayerCommand};
use crate::config::QueueConfig;
use crate::error::{AdmissionError, AdmissionResult};
use crate::guard::RateGuard;

/// Snapshot of queue counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Entries admitted.
    pub received: u64,
    /// Entries rejected for overflow.
    pub dropped: u64,
    /// Entries processed.
    pub processed: u64,
}

/// Atomic counters readable from any thread.
#[derive(Debug, Default)]
pub(crate) struct QueueCounters {
    received: AtomicU64,
    dropped: AtomicU64,
    processed: AtomicU64,
}

impl QueueCounters {
    pub(crate) fn received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn processed(&self, n: u64) {
        self.processed.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> QueueStats {
        QueueStats {
            received: self.received.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
        }
    }
}

/// Bounded multi-producer queue of player commands with rate limiting,
/// dedup and per-tick fairness.
#[derive(Debug)]
pub struct PlayerCommandInbox {
    buffer: SwapBuffer<PlayerCommand>,
    guard: RateGuard,
    max_queue_size: usize,
    per_client_per_tick: usize,
    counters: QueueCounters,
}

impl PlayerCommandInbox {
    /// Creates an inbox with the given limits.
    #[must_use]
    pub fn new(config: &QueueConfig) -> Self {
        Self {
            buffer: SwapBuffer::with_capacity(config.max_queue_size),
            guard: RateGuard::new(config.max_packets_per_second),
            max_queue_size: config.max_queue_size,
            per_client_per_tick: config.max_commands_per_tick_per_client,
            counters: QueueCounters::default(),
        }
    }

    /// Admits a command. The rate window is evaluated at the command's
    /// `received_at`.
    ///
    /// # Errors
    ///
    /// [`AdmissionError::RateLimited`], [`AdmissionError::Duplicate`] or
    /// [`AdmissionError::Overflow`]. A rejected command leaves no state
    /// behind apart from the `dropped` counter on overflow.
    pub fn enqueue(&self, command: PlayerCommand) -> AdmissionResult<()> {
        let client = command.client_id;
        let command_id = command.command_id;
        let at = command.received_at;

        if let Err(e) = self.guard.check_at(client, command_id, at) {
            tracing::debug!("Rejected command {} from {}: {}", command_id, client, e);
            return Err(e);
        }
        if self.buffer.try_push(command, self.max_queue_size).is_err() {
            self.counters.dropped();
            tracing::debug!("Rejected command {} from {}: queue full", command_id, client);
            return Err(AdmissionError::Overflow);
        }
        self.counters.received();
        self.guard.record_at(client, at);
        Ok(())
    }

    /// Swaps buffers and leaves this tick's commands in `read`.
    ///
    /// `read` is cleared first and its allocation becomes the next write
    /// buffer. Commands over the per-client cap go back to the front of the
    /// write side, ahead of anything enqueued since the swap.
    pub fn drain_into(&self, read: &mut Vec<PlayerCommand>) {
        self.buffer.swap_into(read);
        if read.is_empty() {
            return;
        }
        let deferred = apply_fairness(read, self.per_client_per_tick, |c| c.client_id);
        if !deferred.is_empty() {
            tracing::debug!("Deferred {} commands to the next tick", deferred.len());
        }
        self.buffer.push_front_batch(deferred);
    }

    /// Allocating form of [`PlayerCommandInbox::drain_into`].
    #[must_use]
    pub fn drain(&self) -> Vec<PlayerCommand> {
        let mut read = Vec::with_capacity(self.max_queue_size);
        self.drain_into(&mut read);
        read
    }

    /// Records that a command ran, successfully or not.
    pub fn mark_processed(&self, client: ClientId, command_id: u64) {
        self.guard.mark_processed(client, command_id);
        self.counters.processed(1);
    }

    /// Forgets a client's rate and dedup state.
    pub fn remove_client(&self, client: ClientId) {
        self.guard.remove_client(client);
    }

    /// Commands waiting for the next drain.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffer.pending()
    }

    /// Counter snapshot.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        self.counters.snapshot()
    }

    /// The per-client guard.
    #[must_use]
    pub const fn guard(&self) -> &RateGuard {
        &self.guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use citadel_core::EntityId;
    use citadel_inventory::{ContainerKind, ContainerRef, InventoryOp};
    use std::time::{Duration, Instant};

    fn config(max_queue_size: usize, rate: usize, cap: usize) -> QueueConfig {
        QueueConfig {
            max_queue_size,
            max_packets_per_second: rate,
            max_commands_per_tick_per_client: cap,
        }
    }

    fn cmd(client: u64, id: u64, at: Instant) -> PlayerCommand {
        PlayerCommand::new(
            ClientId(client),
            EntityId(client),
            id,
            InventoryOp::CloseContainer {
                reference: ContainerRef::new(EntityId(client), ContainerKind::Grid, 0),
            },
        )
        .with_received_at(at)
    }

    #[test]
    fn test_enqueue_and_drain() {
        let inbox = PlayerCommandInbox::new(&config(10, 40, 20));
        let now = Instant::now();
        inbox.enqueue(cmd(1, 1, now)).unwrap();
        inbox.enqueue(cmd(1, 2, now)).unwrap();

        let batch = inbox.drain();
        assert_eq!(batch.iter().map(|c| c.command_id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(inbox.stats().received, 2);
        assert!(inbox.drain().is_empty());
    }

    #[test]
    fn test_overflow_counts_drop() {
        let inbox = PlayerCommandInbox::new(&config(2, 40, 20));
        let now = Instant::now();
        inbox.enqueue(cmd(1, 1, now)).unwrap();
        inbox.enqueue(cmd(2, 1, now)).unwrap();
        assert_eq!(inbox.enqueue(cmd(3, 1, now)), Err(AdmissionError::Overflow));
        assert_eq!(
            inbox.stats(),
            QueueStats {
                received: 2,
                dropped: 1,
                processed: 0
            }
        );
        // no state was created for the rejected client
        assert_eq!(inbox.guard().tracked_clients(), 2);
    }

    #[test]
    fn test_rate_limit_has_no_side_effects() {
        let inbox = PlayerCommandInbox::new(&config(100, 2, 20));
        let t0 = Instant::now();
        inbox.enqueue(cmd(1, 1, t0)).unwrap();
        inbox.enqueue(cmd(1, 2, t0)).unwrap();
        assert_eq!(inbox.enqueue(cmd(1, 3, t0)), Err(AdmissionError::RateLimited));
        assert_eq!(inbox.pending(), 2);
        assert_eq!(inbox.stats().dropped, 0);

        inbox
            .enqueue(cmd(1, 3, t0 + Duration::from_millis(1001)))
            .unwrap();
    }

    #[test]
    fn test_duplicate_after_processing() {
        let inbox = PlayerCommandInbox::new(&config(10, 40, 20));
        let now = Instant::now();
        inbox.enqueue(cmd(1, 5, now)).unwrap();
        for c in inbox.drain() {
            inbox.mark_processed(c.client_id, c.command_id);
        }
        assert_eq!(inbox.enqueue(cmd(1, 5, now)), Err(AdmissionError::Duplicate));
        assert_eq!(inbox.enqueue(cmd(1, 4, now)), Err(AdmissionError::Duplicate));
        inbox.enqueue(cmd(1, 6, now)).unwrap();
        assert_eq!(inbox.stats().processed, 1);
    }

    #[test]
    fn test_fairness_carries_over_ahead_of_new() {
        let inbox = PlayerCommandInbox::new(&config(100, 100, 2));
        let now = Instant::now();
        for id in 1..=4 {
            inbox.enqueue(cmd(1, id, now)).unwrap();
        }
        inbox.enqueue(cmd(2, 1, now)).unwrap();

        let first = inbox.drain();
        let ids: Vec<_> = first.iter().map(|c| (c.client_id.0, c.command_id)).collect();
        assert_eq!(ids, vec![(1, 1), (1, 2), (2, 1)]);

        inbox.enqueue(cmd(2, 2, now)).unwrap();
        let second = inbox.drain();
        let ids: Vec<_> = second.iter().map(|c| (c.client_id.0, c.command_id)).collect();
        assert_eq!(ids, vec![(1, 3), (1, 4), (2, 2)]);
    }

    #[test]
    fn test_remove_client_keeps_queued() {
        let inbox = PlayerCommandInbox::new(&config(10, 1, 20));
        let now = Instant::now();
        inbox.enqueue(cmd(1, 1, now)).unwrap();
        assert_eq!(inbox.enqueue(cmd(1, 2, now)), Err(AdmissionError::RateLimited));

        inbox.remove_client(ClientId(1));
        inbox.enqueue(cmd(1, 2, now)).unwrap();
        assert_eq!(inbox.drain().len(), 2);
    }
}
