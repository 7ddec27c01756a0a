//! The SSH engine seam.
//!
//! The wire protocol is provided by an external engine exposing
//! non-blocking primitives. Each primitive either completes, fails with an
//! [`EngineCode`], or returns [`EngineCode::WOULD_BLOCK`] meaning "no
//! progress yet, call again unchanged". Engines never block on their own.
//!
//! - [`SshEngine`]: the primitives the orchestrator drives
//! - [`Transport`]: the socket the session runs over

use std::fmt;
use std::io;
use std::os::fd::{AsRawFd, RawFd};

/// A status code returned by an engine primitive.
///
/// Values follow the libssh2 numbering so engines wrapping that library
/// can pass codes through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineCode(pub i32);

impl EngineCode {
    /// Generic socket failure.
    pub const SOCKET_NONE: Self = Self(-1);
    /// Allocation or global initialisation failure.
    pub const ALLOC: Self = Self(-6);
    /// Key exchange failed.
    pub const KEX_FAILURE: Self = Self(-5);
    /// The peer closed the connection.
    pub const SOCKET_DISCONNECT: Self = Self(-13);
    /// The server rejected the credentials.
    pub const AUTHENTICATION_FAILED: Self = Self(-18);
    /// The channel could not be opened.
    pub const CHANNEL_FAILURE: Self = Self(-21);
    /// The server denied a channel request.
    pub const CHANNEL_REQUEST_DENIED: Self = Self(-22);
    /// The channel was already closed.
    pub const CHANNEL_CLOSED: Self = Self(-26);
    /// No progress possible yet; retry unchanged.
    pub const WOULD_BLOCK: Self = Self(-37);
    /// A primitive was called out of order.
    pub const BAD_USE: Self = Self(-39);

    /// The raw code.
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Check for the would-block sentinel.
    #[must_use]
    pub const fn is_would_block(self) -> bool {
        self.0 == Self::WOULD_BLOCK.0
    }

    const fn describe(self) -> Option<&'static str> {
        Some(match self.0 {
            -1 => "socket error",
            -5 => "key exchange failed",
            -6 => "allocation failed",
            -13 => "socket disconnected",
            -18 => "authentication failed",
            -21 => "channel failure",
            -22 => "channel request denied",
            -26 => "channel closed",
            -37 => "would block",
            -39 => "bad use",
            _ => return None,
        })
    }
}

impl fmt::Display for EngineCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.describe() {
            Some(name) => write!(f, "{name} ({})", self.0),
            None => write!(f, "engine error {}", self.0),
        }
    }
}

/// Non-blocking SSH protocol engine.
///
/// Handles are owned by the caller. `channel_free` and `session_free`
/// consume them, so each handle is released exactly once.
pub trait SshEngine {
    /// Engine session state.
    type Session;
    /// Engine channel state.
    type Channel;

    /// Global initialisation, run once per process by
    /// [`LibraryState`](crate::library::LibraryState).
    fn init(&mut self) -> Result<(), EngineCode>;

    /// Global teardown.
    fn exit(&mut self);

    /// Create a session in non-blocking mode.
    fn session_new(&mut self) -> Result<Self::Session, EngineCode>;

    /// Perform the key exchange over `fd`.
    fn handshake(&mut self, session: &mut Self::Session, fd: RawFd) -> Result<(), EngineCode>;

    /// Authenticate with a password.
    fn authenticate(
        &mut self,
        session: &mut Self::Session,
        username: &str,
        password: &str,
    ) -> Result<(), EngineCode>;

    /// Open a session channel.
    fn channel_open(&mut self, session: &mut Self::Session) -> Result<Self::Channel, EngineCode>;

    /// Start `command` on the channel.
    fn channel_exec(&mut self, channel: &mut Self::Channel, command: &str)
    -> Result<(), EngineCode>;

    /// Read command output into `buf`. `Ok(0)` means end of stream.
    fn channel_read(
        &mut self,
        channel: &mut Self::Channel,
        buf: &mut [u8],
    ) -> Result<usize, EngineCode>;

    /// Close the channel.
    fn channel_close(&mut self, channel: &mut Self::Channel) -> Result<(), EngineCode>;

    /// Release the channel.
    fn channel_free(&mut self, channel: Self::Channel);

    /// Send the protocol-level disconnect notification.
    fn session_disconnect(
        &mut self,
        session: &mut Self::Session,
        reason: &str,
    ) -> Result<(), EngineCode>;

    /// Release the session.
    fn session_free(&mut self, session: Self::Session);
}

/// The connected socket a session runs over.
///
/// The session takes ownership on establishment and closes it exactly once
/// on teardown.
pub trait Transport {
    /// The descriptor handed to the engine's handshake.
    fn descriptor(&self) -> RawFd;

    /// Switch between blocking and non-blocking mode.
    fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()>;

    /// Close the transport.
    fn close(self);
}

impl Transport for rust_netsock::Socket {
    fn descriptor(&self) -> RawFd {
        self.as_raw_fd()
    }

    fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        Self::set_nonblocking(self, nonblocking)
    }

    fn close(self) {
        rust_netsock::close_socket(self);
    }
}
