//! Timeout policy applied when a socket is created.
//!
//! This module provides [`TimeoutPolicy`], the pair of durations bounding
//! every blocking transport operation: the connect ceiling and the
//! symmetric send/receive timeout.

use std::time::Duration;

/// Default connect timeout in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 30_000;

/// Default send/receive timeout in milliseconds.
pub const DEFAULT_IO_TIMEOUT_MS: u64 = 10_000;

/// Connect and I/O timeouts for a socket.
///
/// Both values are always positive: a zero duration is replaced by the
/// corresponding default when the policy is built.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use rust_netsock::TimeoutPolicy;
///
/// let policy = TimeoutPolicy::default().with_io(Duration::from_secs(5));
/// assert_eq!(policy.connect(), Duration::from_secs(30));
/// assert_eq!(policy.io(), Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    connect: Duration,
    io: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self::from_millis(DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_IO_TIMEOUT_MS)
    }
}

impl TimeoutPolicy {
    /// Create a policy from explicit durations.
    #[must_use]
    pub const fn new(connect: Duration, io: Duration) -> Self {
        Self {
            connect: or_default(connect, DEFAULT_CONNECT_TIMEOUT_MS),
            io: or_default(io, DEFAULT_IO_TIMEOUT_MS),
        }
    }

    /// Create a policy from millisecond values.
    #[must_use]
    pub const fn from_millis(connect_ms: u64, io_ms: u64) -> Self {
        Self::new(
            Duration::from_millis(connect_ms),
            Duration::from_millis(io_ms),
        )
    }

    /// The ceiling for establishing a connection.
    #[must_use]
    pub const fn connect(&self) -> Duration {
        self.connect
    }

    /// The timeout applied to both send and receive.
    #[must_use]
    pub const fn io(&self) -> Duration {
        self.io
    }

    /// Set the connect timeout.
    #[must_use]
    pub const fn with_connect(mut self, timeout: Duration) -> Self {
        self.connect = or_default(timeout, DEFAULT_CONNECT_TIMEOUT_MS);
        self
    }

    /// Set the send/receive timeout.
    #[must_use]
    pub const fn with_io(mut self, timeout: Duration) -> Self {
        self.io = or_default(timeout, DEFAULT_IO_TIMEOUT_MS);
        self
    }
}

const fn or_default(value: Duration, default_ms: u64) -> Duration {
    if value.is_zero() {
        Duration::from_millis(default_ms)
    } else {
        value
    }
}
