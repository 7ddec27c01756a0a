//! Error types for the rust-netsock crate.
//!
//! This module provides [`ConnectError`], the single error type returned by
//! the connection bootstrap. Every variant is surfaced immediately; the
//! bootstrap never retries on its own.

use std::io;

/// The error type for connection bootstrap.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// The caller passed an empty hostname or an out-of-range port.
    #[error("invalid argument: {reason} (hostname={hostname:?}, port={port})")]
    InvalidArgument {
        /// The hostname as given.
        hostname: String,
        /// The port as given.
        port: i32,
        /// What is wrong with the arguments.
        reason: &'static str,
    },

    /// The operating system refused to create a socket.
    #[error("failed to create socket: {0}")]
    ResourceExhausted(#[source] io::Error),

    /// The resolver returned no IPv4 record for the hostname.
    #[error("failed to resolve hostname: {hostname}")]
    NameResolutionFailed {
        /// The hostname that could not be resolved.
        hostname: String,
    },

    /// The connect was refused, timed out, or the host was unreachable.
    #[error("failed to connect to {hostname}:{port} (os error {code})")]
    ConnectFailed {
        /// The hostname that was being connected to.
        hostname: String,
        /// The port that was being connected to.
        port: u16,
        /// The underlying OS error code.
        code: i32,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// A specialized Result type for bootstrap operations.
pub type Result<T> = std::result::Result<T, ConnectError>;

impl ConnectError {
    /// Create an invalid argument error.
    #[must_use]
    pub fn invalid_argument(hostname: &str, port: i32, reason: &'static str) -> Self {
        Self::InvalidArgument {
            hostname: hostname.to_string(),
            port,
            reason,
        }
    }

    /// Create a connect failure from an OS error.
    #[must_use]
    pub fn connect_failed(hostname: &str, port: u16, source: io::Error) -> Self {
        Self::ConnectFailed {
            hostname: hostname.to_string(),
            port,
            code: source.raw_os_error().unwrap_or(-1),
            source,
        }
    }

    /// The OS error code carried by this error, if any.
    #[must_use]
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::ResourceExhausted(source) => source.raw_os_error(),
            Self::ConnectFailed { code, .. } => Some(*code),
            Self::InvalidArgument { .. } | Self::NameResolutionFailed { .. } => None,
        }
    }

    /// Check if this error was caused by the caller.
    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }
}

#[cfg(unix)]
impl From<rustix::io::Errno> for ConnectError {
    fn from(errno: rustix::io::Errno) -> Self {
        Self::ResourceExhausted(io::Error::from_raw_os_error(errno.raw_os_error()))
    }
}
