//! Owned socket descriptor.

use std::io;
use std::net::SocketAddrV4;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::time::Duration;

use rustix::fs::{OFlags, fcntl_getfl, fcntl_setfl};
use rustix::net::sockopt::{self, Timeout};

/// A connected IPv4 stream socket.
///
/// The descriptor has exactly one owner. It is closed exactly once, either
/// by [`Socket::close`] or when the value is dropped.
pub struct Socket {
    fd: OwnedFd,
    remote: SocketAddrV4,
}

impl std::fmt::Debug for Socket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Socket")
            .field("fd", &self.fd.as_raw_fd())
            .field("remote", &self.remote)
            .finish()
    }
}

impl Socket {
    pub(crate) const fn new(fd: OwnedFd, remote: SocketAddrV4) -> Self {
        Self { fd, remote }
    }

    /// The address this socket is connected to.
    #[must_use]
    pub const fn remote_addr(&self) -> SocketAddrV4 {
        self.remote
    }

    /// Switch the descriptor between blocking and non-blocking mode.
    pub fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        set_fd_nonblocking(self.fd.as_fd(), nonblocking).map_err(io::Error::from)
    }

    /// Check whether the descriptor is in non-blocking mode.
    pub fn is_nonblocking(&self) -> io::Result<bool> {
        let flags = fcntl_getfl(&self.fd)?;
        Ok(flags.contains(OFlags::NONBLOCK))
    }

    /// The receive and send timeouts currently set on the descriptor.
    pub fn io_timeouts(&self) -> io::Result<(Option<Duration>, Option<Duration>)> {
        let recv = sockopt::socket_timeout(&self.fd, Timeout::Recv)?;
        let send = sockopt::socket_timeout(&self.fd, Timeout::Send)?;
        Ok((recv, send))
    }

    /// Close the socket.
    pub fn close(self) {
        tracing::debug!(fd = self.fd.as_raw_fd(), remote = %self.remote, "Closing socket");
        drop(self.fd);
    }

    /// Give up ownership of the descriptor.
    #[must_use]
    pub fn into_owned_fd(self) -> OwnedFd {
        self.fd
    }
}

impl AsFd for Socket {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl AsRawFd for Socket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

pub(crate) fn set_fd_nonblocking(fd: BorrowedFd<'_>, nonblocking: bool) -> rustix::io::Result<()> {
    let mut flags = fcntl_getfl(fd)?;
    flags.set(OFlags::NONBLOCK, nonblocking);
    fcntl_setfl(fd, flags)
}
