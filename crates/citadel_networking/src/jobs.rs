//! Internal job inbox: same double-buffer discipline as player commands,
//! without rate limiting, dedup or fairness.

use citadel_core::SwapBuffer;

use crate::command::ServerJob;
use crate::error::{AdmissionError, AdmissionResult};
use crate::inbox::{QueueCounters, QueueStats};

/// Bounded queue of [`ServerJob`]s.
#[derive(Debug)]
pub struct ServerJobInbox {
    buffer: SwapBuffer<ServerJob>,
    max_queue_size: usize,
    counters: QueueCounters,
}

impl ServerJobInbox {
    /// Creates an inbox holding at most `max_queue_size` pending jobs.
    #[must_use]
    pub fn new(max_queue_size: usize) -> Self {
        Self {
            buffer: SwapBuffer::with_capacity(max_queue_size),
            max_queue_size,
            counters: QueueCounters::default(),
        }
    }

    /// Queues a job.
    ///
    /// # Errors
    ///
    /// [`AdmissionError::Overflow`] when the write side is full.
    pub fn enqueue(&self, job: ServerJob) -> AdmissionResult<()> {
        let name = job.name();
        if self.buffer.try_push(job, self.max_queue_size).is_err() {
            self.counters.dropped();
            tracing::warn!("Job inbox full, dropped {}", name);
            return Err(AdmissionError::Overflow);
        }
        self.counters.received();
        Ok(())
    }

    /// Swaps buffers and leaves every pending job in `read`; counts them as
    /// processed.
    pub fn drain_into(&self, read: &mut Vec<ServerJob>) {
        self.buffer.swap_into(read);
        self.counters.processed(read.len() as u64);
    }

    /// Counter snapshot.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        self.counters.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ClientId;
    use citadel_core::EntityId;

    fn snapshot_job(n: u64) -> ServerJob {
        ServerJob::SendInventorySnapshot {
            client_id: ClientId(n),
            character_id: EntityId(n),
        }
    }

    #[test]
    fn test_drain_counts_processed() {
        let jobs = ServerJobInbox::new(2);
        jobs.enqueue(snapshot_job(1)).unwrap();
        jobs.enqueue(snapshot_job(2)).unwrap();
        assert_eq!(jobs.enqueue(snapshot_job(3)), Err(AdmissionError::Overflow));

        let mut read = Vec::new();
        jobs.drain_into(&mut read);
        assert_eq!(read, vec![snapshot_job(1), snapshot_job(2)]);
        assert_eq!(
            jobs.stats(),
            QueueStats {
                received: 2,
                dropped: 1,
                processed: 2
            }
        );
    }
}
