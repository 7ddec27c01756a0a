//! Error types for rust-sshdrive.
//!
//! [`DriveError`] is the single error type of the driver and the session
//! orchestrator. The would-block sentinel never appears here: the driver
//! consumes it internally.

use std::io;
use std::time::Duration;

use rust_netsock::ConnectError;
use thiserror::Error;

use crate::engine::EngineCode;
use crate::types::{SessionState, Step};

/// The main error type for rust-sshdrive operations.
#[derive(Debug, Error)]
pub enum DriveError {
    /// The connection bootstrap failed.
    #[error("connection failed: {0}")]
    Connect(#[from] ConnectError),

    /// A protocol primitive returned a non-retryable code.
    #[error("{step} failed: {code}")]
    Terminal {
        /// The step that failed.
        step: Step,
        /// The engine's error code.
        code: EngineCode,
    },

    /// The retry limit was reached while the primitive kept blocking.
    #[error("{step} timed out after {elapsed:?} ({attempts} attempts)")]
    Timeout {
        /// The step that timed out.
        step: Step,
        /// Time spent retrying.
        elapsed: Duration,
        /// Number of primitive invocations.
        attempts: u32,
    },

    /// The retry loop was cancelled through a [`CancelToken`](crate::driver::CancelToken).
    #[error("{step} cancelled")]
    Cancelled {
        /// The step that was cancelled.
        step: Step,
    },

    /// The engine library has not been initialised.
    #[error("engine library is not initialised")]
    NotInitialized,

    /// The engine's global initialiser failed.
    #[error("engine initialisation failed: {code}")]
    Init {
        /// The engine's error code.
        code: EngineCode,
    },

    /// A channel is already open on this session.
    #[error("a channel is already open on this session")]
    ChannelBusy,

    /// The operation is not valid in the current session state.
    #[error("cannot {operation} while session is {state}")]
    InvalidState {
        /// The attempted operation.
        operation: &'static str,
        /// The state the session was in.
        state: SessionState,
    },

    /// The transport could not be prepared for the session.
    #[error("transport error: {0}")]
    Transport(#[source] io::Error),

    /// Writing command output to the caller's sink failed.
    #[error("output sink error: {0}")]
    Output(#[source] io::Error),

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },
}

/// Result type for rust-sshdrive operations.
pub type Result<T> = std::result::Result<T, DriveError>;

impl DriveError {
    /// Create a terminal error.
    #[must_use]
    pub const fn terminal(step: Step, code: EngineCode) -> Self {
        Self::Terminal { step, code }
    }

    /// Create an invalid state error.
    #[must_use]
    pub const fn invalid_state(operation: &'static str, state: SessionState) -> Self {
        Self::InvalidState { operation, state }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Check if this is a terminal engine error.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal { .. })
    }

    /// Check if this is a retry timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// The protocol step this error belongs to, if any.
    #[must_use]
    pub const fn step(&self) -> Option<Step> {
        match self {
            Self::Terminal { step, .. } | Self::Timeout { step, .. } | Self::Cancelled { step } => {
                Some(*step)
            }
            _ => None,
        }
    }

    /// The engine code carried by this error, if any.
    #[must_use]
    pub const fn engine_code(&self) -> Option<EngineCode> {
        match self {
            Self::Terminal { code, .. } | Self::Init { code } => Some(*code),
            _ => None,
        }
    }
}
