//! Retry limits for the would-block loop.

use std::time::Duration;

/// Upper bounds on how long a primitive may keep returning would-block.
///
/// Both bounds are optional. The default has neither, so the driver
/// retries until the primitive completes or fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryLimit {
    /// Maximum number of primitive invocations.
    pub max_attempts: Option<u32>,
    /// Maximum time spent retrying.
    pub max_wait: Option<Duration>,
}

impl RetryLimit {
    /// No limit.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            max_attempts: None,
            max_wait: None,
        }
    }

    /// Limit the number of invocations.
    #[must_use]
    pub const fn attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            max_wait: None,
        }
    }

    /// Limit the time spent retrying.
    #[must_use]
    pub const fn wait(max_wait: Duration) -> Self {
        Self {
            max_attempts: None,
            max_wait: Some(max_wait),
        }
    }

    /// Set the invocation limit.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Set the time limit.
    #[must_use]
    pub const fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    /// Check whether neither bound is set.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.max_attempts.is_none() && self.max_wait.is_none()
    }

    /// This limit with the invocation count capped at `cap`.
    #[must_use]
    pub fn capped(self, cap: u32) -> Self {
        Self {
            max_attempts: Some(self.max_attempts.map_or(cap, |n| n.min(cap))),
            max_wait: self.max_wait,
        }
    }
}

/// Retry state tracker.
#[derive(Debug)]
pub(crate) struct RetryState {
    limit: RetryLimit,
    attempts: u32,
    started_ms: u64,
}

impl RetryState {
    pub(crate) const fn new(limit: RetryLimit, now_ms: u64) -> Self {
        Self {
            limit,
            attempts: 0,
            started_ms: now_ms,
        }
    }

    pub(crate) const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Record an invocation.
    pub(crate) const fn record_attempt(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
    }

    pub(crate) const fn elapsed(&self, now_ms: u64) -> Duration {
        Duration::from_millis(now_ms.saturating_sub(self.started_ms))
    }

    /// Check whether another retry is allowed after the last invocation
    /// returned would-block.
    pub(crate) fn should_retry(&self, now_ms: u64) -> bool {
        let attempts_left = self.limit.max_attempts.is_none_or(|max| self.attempts < max);
        let time_left = self
            .limit
            .max_wait
            .is_none_or(|max_wait| self.elapsed(now_ms) < max_wait);
        attempts_left && time_left
    }

    /// Restart counting, used when a read made progress.
    pub(crate) const fn reset(&mut self, now_ms: u64) {
        self.attempts = 0;
        self.started_ms = now_ms;
    }
}
