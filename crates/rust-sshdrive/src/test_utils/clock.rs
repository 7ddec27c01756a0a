//! Virtual clock scheduler.

use std::sync::{Arc, Mutex};

use crate::scheduler::Scheduler;

#[derive(Debug, Default)]
struct ClockState {
    now_ms: u64,
    yields: Vec<u64>,
}

/// A [`Scheduler`] whose clock only moves when yielded.
///
/// Each `yield_ms` call advances virtual time by its duration and is
/// recorded. Clones share the same clock, so a test can keep one handle
/// while the driver owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    state: Arc<Mutex<ClockState>>,
}

impl ManualScheduler {
    /// Create a clock at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock at `now_ms`.
    #[must_use]
    pub fn starting_at(now_ms: u64) -> Self {
        let clock = Self::new();
        clock.lock().now_ms = now_ms;
        clock
    }

    /// Move the clock forward without recording a yield.
    pub fn advance(&self, ms: u64) {
        self.lock().now_ms += ms;
    }

    /// Number of yields so far.
    #[must_use]
    pub fn yield_count(&self) -> usize {
        self.lock().yields.len()
    }

    /// Durations of all yields so far.
    #[must_use]
    pub fn yields(&self) -> Vec<u64> {
        self.lock().yields.clone()
    }

    /// Forget recorded yields, keeping the current time.
    pub fn clear(&self) {
        self.lock().yields.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ClockState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Scheduler for ManualScheduler {
    fn yield_ms(&self, duration_ms: u64) {
        let mut state = self.lock();
        state.now_ms += duration_ms;
        state.yields.push(duration_ms);
    }

    fn now_ms(&self) -> u64 {
        self.lock().now_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yield_advances_clock() {
        let clock = ManualScheduler::starting_at(100);
        clock.yield_ms(10);
        clock.yield_ms(5);

        assert_eq!(clock.now_ms(), 115);
        assert_eq!(clock.yields(), vec![10, 5]);
    }

    #[test]
    fn clones_share_state() {
        let clock = ManualScheduler::new();
        let handle = clock.clone();
        clock.yield_ms(10);
        handle.advance(3);

        assert_eq!(handle.yield_count(), 1);
        assert_eq!(clock.now_ms(), 13);

        handle.clear();
        assert_eq!(clock.yield_count(), 0);
        assert_eq!(clock.now_ms(), 13);
    }
}
