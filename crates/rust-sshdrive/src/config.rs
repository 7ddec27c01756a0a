//! Configuration types for rust-sshdrive.
//!
//! [`ClientConfig`] gathers everything a [`Client`](crate::session::Client)
//! needs: where to connect, how to authenticate, the socket timeouts, and
//! the driver's polling behaviour. It can be built in code, read from
//! `SSHDRIVE_*` environment variables ([`env`]), or loaded from a TOML
//! file ([`file`]).

pub mod env;
pub mod file;

use std::fmt;
use std::time::Duration;

use rust_netsock::TimeoutPolicy;

use crate::driver::DEFAULT_POLL_INTERVAL;
use crate::error::{DriveError, Result};
use crate::retry::RetryLimit;
use crate::scheduler::SchedulerKind;

/// Default SSH port.
pub const DEFAULT_PORT: u16 = 22;

/// Default size of the channel read buffer.
pub const DEFAULT_READ_BUFFER: usize = 1024;

/// Default cap on disconnect notification attempts during teardown.
pub const DEFAULT_DISCONNECT_ATTEMPTS: u32 = 50;

/// Longest accepted poll interval.
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Password credentials.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

impl Credentials {
    /// Create credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Configuration for a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Host to connect to.
    pub host: String,

    /// Port (default 22).
    pub port: u16,

    /// Password credentials.
    pub credentials: Credentials,

    /// Socket connect and I/O timeouts.
    pub timeouts: TimeoutPolicy,

    /// Delay between retries of a blocked primitive.
    pub poll_interval: Duration,

    /// Bound on retries of a blocked primitive.
    pub retry: RetryLimit,

    /// Size of the channel read buffer.
    pub read_buffer: usize,

    /// Cap on disconnect notification attempts during teardown.
    pub disconnect_attempts: u32,

    /// Scheduler substrate.
    pub scheduler: SchedulerKind,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            credentials: Credentials::default(),
            timeouts: TimeoutPolicy::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry: RetryLimit::unbounded(),
            read_buffer: DEFAULT_READ_BUFFER,
            disconnect_attempts: DEFAULT_DISCONNECT_ATTEMPTS,
            scheduler: SchedulerKind::from_build(),
        }
    }
}

impl ClientConfig {
    /// Create a config for `host`.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    /// Set the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the credentials.
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set the timeout policy.
    #[must_use]
    pub const fn timeouts(mut self, timeouts: TimeoutPolicy) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Set the poll interval.
    #[must_use]
    pub const fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the retry limit.
    #[must_use]
    pub const fn retry(mut self, retry: RetryLimit) -> Self {
        self.retry = retry;
        self
    }

    /// Set the read buffer size.
    #[must_use]
    pub const fn read_buffer(mut self, size: usize) -> Self {
        self.read_buffer = size;
        self
    }

    /// Set the disconnect attempt cap.
    #[must_use]
    pub const fn disconnect_attempts(mut self, attempts: u32) -> Self {
        self.disconnect_attempts = attempts;
        self
    }

    /// Set the scheduler substrate.
    #[must_use]
    pub const fn scheduler(mut self, scheduler: SchedulerKind) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Get the address string.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check the values for consistency.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(DriveError::config("host is empty"));
        }
        if self.port == 0 {
            return Err(DriveError::config("port must be positive"));
        }
        if self.read_buffer == 0 {
            return Err(DriveError::config("read buffer must not be empty"));
        }
        if self.disconnect_attempts == 0 {
            return Err(DriveError::config("disconnect attempts must be positive"));
        }
        if self.poll_interval.is_zero() {
            return Err(DriveError::config("poll interval must be positive"));
        }
        if self.poll_interval > MAX_POLL_INTERVAL {
            return Err(DriveError::config("poll interval exceeds 60 seconds"));
        }
        Ok(())
    }
}
