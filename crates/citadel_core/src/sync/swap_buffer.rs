//! # Double-Buffered Inbox Storage
//!
//! ## Architecture
//!
//! ```text
//!        producers (any thread)                 consumer (tick thread)
//!   ┌──────────────────────────────┐        ┌────────────────────────┐
//!   │ try_push / push_front_batch  │        │ swap_into(&mut read)   │
//!   └──────────────┬───────────────┘        └───────────┬────────────┘
//!                  ▼                                    ▼
//!          ┌───────────────┐  mem::swap (O(1))  ┌───────────────┐
//!          │ write: Vec<T> │ ◀────────────────▶ │ read: Vec<T>  │
//!          └───────────────┘                    └───────────────┘
//! ```
//!
//! The consumer owns the read side. After the swap it iterates without any
//! synchronization, and the emptied read vector becomes the next write buffer
//! so its capacity is reused.

use parking_lot::Mutex;

/// Write side of a double-buffered queue.
///
/// ## Usage
///
/// ```rust,ignore
/// let buffer = SwapBuffer::with_capacity(500);
/// let mut read = Vec::with_capacity(500);
///
/// // network thread
/// buffer.try_push(cmd, 500)?;
///
/// // tick thread
/// buffer.swap_into(&mut read);
/// for cmd in read.drain(..) { /* ... */ }
/// ```
#[derive(Debug)]
pub struct SwapBuffer<T> {
    write: Mutex<Vec<T>>,
}

impl<T> SwapBuffer<T> {
    /// Creates a buffer whose write side is pre-allocated.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            write: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    /// Appends a value unless the write side already holds `limit` values.
    ///
    /// # Errors
    ///
    /// Returns the value back if the buffer is full.
    pub fn try_push(&self, value: T, limit: usize) -> Result<(), T> {
        let mut write = self.write.lock();
        if write.len() >= limit {
            return Err(value);
        }
        write.push(value);
        Ok(())
    }

    /// Exchanges the write side with `read`.
    ///
    /// `read` is cleared first, so its allocation becomes the next write buffer.
    /// After the call `read` holds everything appended since the previous swap,
    /// in append order.
    pub fn swap_into(&self, read: &mut Vec<T>) {
        read.clear();
        let mut write = self.write.lock();
        std::mem::swap(&mut *write, read);
    }

    /// Inserts a batch at the front of the write side, preserving its order.
    ///
    /// Used to carry deferred work into the next drain ahead of anything
    /// appended since the last swap. No capacity limit is applied: deferred
    /// values were already admitted once.
    pub fn push_front_batch(&self, batch: Vec<T>) {
        if batch.is_empty() {
            return;
        }
        let mut write = self.write.lock();
        write.splice(0..0, batch);
    }

    /// Returns the number of values waiting on the write side.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.write.lock().len()
    }
}

impl<T> Default for SwapBuffer<T> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_push_and_swap() {
        let buffer = SwapBuffer::with_capacity(4);
        buffer.try_push(1, 4).unwrap();
        buffer.try_push(2, 4).unwrap();

        let mut read = Vec::new();
        buffer.swap_into(&mut read);
        assert_eq!(read, vec![1, 2]);
        assert_eq!(buffer.pending(), 0);
    }

    #[test]
    fn test_limit_rejects() {
        let buffer = SwapBuffer::with_capacity(2);
        buffer.try_push('a', 2).unwrap();
        buffer.try_push('b', 2).unwrap();
        assert_eq!(buffer.try_push('c', 2), Err('c'));
    }

    #[test]
    fn test_swap_clears_previous_read() {
        let buffer = SwapBuffer::with_capacity(4);
        let mut read = vec![99, 98];
        buffer.try_push(1, 4).unwrap();
        buffer.swap_into(&mut read);
        assert_eq!(read, vec![1]);

        buffer.swap_into(&mut read);
        assert!(read.is_empty());
    }

    #[test]
    fn test_push_front_batch_keeps_order() {
        let buffer = SwapBuffer::with_capacity(8);
        buffer.try_push(10, 8).unwrap();
        buffer.push_front_batch(vec![1, 2, 3]);

        let mut read = Vec::new();
        buffer.swap_into(&mut read);
        assert_eq!(read, vec![1, 2, 3, 10]);
    }

    #[test]
    fn test_concurrent_producers() {
        let buffer = Arc::new(SwapBuffer::with_capacity(1000));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let buffer = Arc::clone(&buffer);
                thread::spawn(move || {
                    for i in 0..100 {
                        buffer.try_push(t * 1000 + i, 1000).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let mut read = Vec::new();
        buffer.swap_into(&mut read);
        assert_eq!(read.len(), 400);

        // Per-producer order survives interleaving.
        for t in 0..4 {
            let mine: Vec<_> = read.iter().copied().filter(|v| v / 1000 == t).collect();
            let mut sorted = mine.clone();
            sorted.sort_unstable();
            assert_eq!(mine, sorted);
        }
    }
}
