//! # Fixed-Rate Tick Loop
//!
//! Paces the command tick. Commands are applied only at tick boundaries, so
//! the rate bounds how long an admitted command waits.

use std::time::{Duration, Instant};

/// Fixed-timestep tick controller.
#[derive(Debug)]
pub struct TickLoop {
    /// Target tick duration.
    tick_duration: Duration,
    /// Time of the last accumulator update.
    last_tick: Instant,
    /// Time owed to pending ticks.
    accumulator: Duration,
    /// Ticks started.
    tick_count: u64,
    stats: TickStats,
}

/// Tick timing statistics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickStats {
    /// Shortest tick observed.
    pub min_tick_us: u64,
    /// Longest tick observed.
    pub max_tick_us: u64,
    /// Rolling average tick time.
    pub avg_tick_us: u64,
    /// Ticks that overran their budget.
    pub late_ticks: u64,
    /// Ticks measured.
    pub total_ticks: u64,
}

impl TickStats {
    fn fresh(tick_duration: Duration) -> Self {
        Self {
            min_tick_us: u64::MAX,
            max_tick_us: 0,
            avg_tick_us: micros(tick_duration),
            late_ticks: 0,
            total_ticks: 0,
        }
    }
}

fn micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

impl TickLoop {
    /// Creates a loop running `tick_rate` times per second (at least once).
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        let tick_duration = Duration::from_micros(1_000_000 / u64::from(tick_rate.max(1)));
        Self {
            tick_duration,
            last_tick: Instant::now(),
            accumulator: Duration::ZERO,
            tick_count: 0,
            stats: TickStats::fresh(tick_duration),
        }
    }

    /// Returns true if a tick is due. Call until it returns false.
    #[must_use]
    pub fn should_tick(&mut self) -> bool {
        let now = Instant::now();
        self.accumulator += now.duration_since(self.last_tick);
        self.last_tick = now;
        self.accumulator >= self.tick_duration
    }

    /// Marks the start of a tick and returns its start time.
    #[must_use]
    pub fn begin_tick(&mut self) -> Instant {
        self.accumulator = self.accumulator.saturating_sub(self.tick_duration);
        self.tick_count += 1;
        Instant::now()
    }

    /// Records the duration of the tick started at `start`.
    pub fn end_tick(&mut self, start: Instant) {
        let duration = start.elapsed();
        let duration_us = micros(duration);

        self.stats.total_ticks += 1;
        self.stats.min_tick_us = self.stats.min_tick_us.min(duration_us);
        self.stats.max_tick_us = self.stats.max_tick_us.max(duration_us);
        self.stats.avg_tick_us = (self.stats.avg_tick_us * 15 + duration_us) / 16;
        if duration > self.tick_duration {
            self.stats.late_ticks += 1;
        }
    }

    /// Sleeps until the next tick is due.
    pub fn wait_for_next_tick(&self) {
        let elapsed = self.last_tick.elapsed() + self.accumulator;
        if elapsed < self.tick_duration {
            std::thread::sleep(self.tick_duration - elapsed);
        }
    }

    /// Ticks started so far.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Timing statistics.
    #[must_use]
    pub const fn stats(&self) -> &TickStats {
        &self.stats
    }

    /// Target tick duration.
    #[must_use]
    pub const fn tick_duration(&self) -> Duration {
        self.tick_duration
    }
}
