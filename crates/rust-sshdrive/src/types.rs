//! Common types used throughout rust-sshdrive.

use std::fmt;

/// A protocol step driven to completion by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Creating the engine session.
    SessionInit,
    /// Key exchange over the socket.
    Handshake,
    /// Password authentication.
    Authenticate,
    /// Opening a session channel.
    ChannelOpen,
    /// Starting a command on the channel.
    Exec,
    /// Reading command output.
    Read,
    /// Closing the channel.
    ChannelClose,
    /// Sending the disconnect notification.
    Disconnect,
}

impl Step {
    /// Short lowercase name, used in logs and error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SessionInit => "session-init",
            Self::Handshake => "handshake",
            Self::Authenticate => "authenticate",
            Self::ChannelOpen => "channel-open",
            Self::Exec => "exec",
            Self::Read => "read",
            Self::ChannelClose => "channel-close",
            Self::Disconnect => "disconnect",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The lifecycle state of a session.
///
/// ```text
/// Disconnected -> SocketEstablished -> Handshaking -> Authenticating -> Ready
///     -> (ChannelOpening -> Executing -> Draining -> ChannelClosed)*
///     -> Disconnecting -> Freed
/// ```
///
/// Any step may move to `Failed` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No socket yet.
    Disconnected,
    /// Socket handed over, engine session created.
    SocketEstablished,
    /// Key exchange in progress.
    Handshaking,
    /// Authentication in progress.
    Authenticating,
    /// Authenticated, no channel open.
    Ready,
    /// A channel has been opened and no command issued on it yet.
    ChannelOpening,
    /// A command is being started on the open channel.
    Executing,
    /// Command output is being read.
    Draining,
    /// The last channel was closed and freed.
    ChannelClosed,
    /// Disconnect notification in progress.
    Disconnecting,
    /// All resources released.
    Freed,
    /// Establishment failed and resources were released.
    Failed,
}

impl SessionState {
    /// Check whether a new channel may be opened.
    #[must_use]
    pub const fn accepts_channel(&self) -> bool {
        matches!(self, Self::Ready | Self::ChannelClosed)
    }

    /// Check whether authentication has completed.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(
            self,
            Self::Ready
                | Self::ChannelOpening
                | Self::Executing
                | Self::Draining
                | Self::ChannelClosed
        )
    }

    /// Check whether a channel may be held in this state.
    #[must_use]
    pub const fn has_channel(&self) -> bool {
        matches!(self, Self::ChannelOpening | Self::Executing | Self::Draining)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::SocketEstablished => "socket-established",
            Self::Handshaking => "handshaking",
            Self::Authenticating => "authenticating",
            Self::Ready => "ready",
            Self::ChannelOpening => "channel-opening",
            Self::Executing => "executing",
            Self::Draining => "draining",
            Self::ChannelClosed => "channel-closed",
            Self::Disconnecting => "disconnecting",
            Self::Freed => "freed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Result of one command cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Number of output bytes forwarded to the sink.
    pub bytes: u64,
}
