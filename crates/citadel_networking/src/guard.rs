//! # Rate & Duplicate Guard
//!
//! Per-client admission state, consulted before any queue lock is taken.
//!
//! ```text
//! client ring (capacity = max_packets_per_second)
//! ┌────┬────┬────┬────┐
//! │ t3 │ t4 │ t1 │ t2 │   count stamps newer than now - 1s
//! └────┴────┴────┴────┘   >= ceiling -> RateLimited
//!        ▲ next
//! ```
//!
//! A client without state is never limited and never a duplicate. State
//! appears on the first admission or the first processed command and lives
//! until [`RateGuard::remove_client`].

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::command::ClientId;
use crate::error::{AdmissionError, AdmissionResult};

/// Length of the rate window.
pub const RATE_WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct ClientWindow {
    stamps: Vec<Option<Instant>>,
    next: usize,
    last_processed: u64,
}

impl ClientWindow {
    fn new(capacity: usize) -> Self {
        Self {
            stamps: vec![None; capacity.max(1)],
            next: 0,
            last_processed: 0,
        }
    }

    fn recent(&self, now: Instant) -> usize {
        self.stamps
            .iter()
            .flatten()
            .filter(|&&t| now.saturating_duration_since(t) < RATE_WINDOW)
            .count()
    }

    fn record(&mut self, at: Instant) {
        self.stamps[self.next] = Some(at);
        self.next = (self.next + 1) % self.stamps.len();
    }
}

/// Sliding-window rate limiter and command-id watermark, keyed by client.
#[derive(Debug)]
pub struct RateGuard {
    ceiling: usize,
    clients: RwLock<HashMap<ClientId, ClientWindow>>,
}

impl RateGuard {
    /// Creates a guard admitting `max_packets_per_second` per client.
    #[must_use]
    pub fn new(max_packets_per_second: usize) -> Self {
        Self {
            ceiling: max_packets_per_second,
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Runs both checks against the current time.
    ///
    /// # Errors
    ///
    /// See [`RateGuard::check_at`].
    pub fn check(&self, client: ClientId, command_id: u64) -> AdmissionResult<()> {
        self.check_at(client, command_id, Instant::now())
    }

    /// Runs the rate check, then the duplicate check, as of `now`.
    ///
    /// # Errors
    ///
    /// [`AdmissionError::RateLimited`] when the window is full,
    /// [`AdmissionError::Duplicate`] when `command_id` is at or below the
    /// watermark.
    pub fn check_at(&self, client: ClientId, command_id: u64, now: Instant) -> AdmissionResult<()> {
        let clients = self.clients.read();
        let Some(window) = clients.get(&client) else {
            return Ok(());
        };
        if window.recent(now) >= self.ceiling {
            return Err(AdmissionError::RateLimited);
        }
        if command_id <= window.last_processed {
            return Err(AdmissionError::Duplicate);
        }
        Ok(())
    }

    /// Records an admitted command at `at`.
    pub fn record_at(&self, client: ClientId, at: Instant) {
        self.clients
            .write()
            .entry(client)
            .or_insert_with(|| ClientWindow::new(self.ceiling))
            .record(at);
    }

    /// Raises the watermark to `command_id` if it is higher.
    pub fn mark_processed(&self, client: ClientId, command_id: u64) {
        let mut clients = self.clients.write();
        let window = clients
            .entry(client)
            .or_insert_with(|| ClientWindow::new(self.ceiling));
        window.last_processed = window.last_processed.max(command_id);
    }

    /// Current watermark, if the client has state.
    #[must_use]
    pub fn last_processed(&self, client: ClientId) -> Option<u64> {
        self.clients.read().get(&client).map(|w| w.last_processed)
    }

    /// Forgets a client.
    pub fn remove_client(&self, client: ClientId) {
        self.clients.write().remove(&client);
    }

    /// Number of clients with state.
    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.clients.read().len()
    }
}
