//! Socket creation and bounded connect.

use std::io;
use std::net::SocketAddrV4;
use std::os::fd::{AsFd, AsRawFd, OwnedFd};
use std::time::{Duration, Instant};

use rustix::event::{PollFd, PollFlags, Timespec, poll};
use rustix::io::Errno;
use rustix::net::sockopt::{self, Timeout};
#[cfg(not(target_vendor = "apple"))]
use rustix::net::SocketFlags;
use rustix::net::{AddressFamily, SocketType};

use super::socket::{Socket, set_fd_nonblocking};
use crate::config::TimeoutPolicy;
use crate::error::{ConnectError, Result};
use crate::resolve::SystemResolver;
use crate::traits::Resolver;

/// Creates connected sockets under a [`TimeoutPolicy`].
///
/// # Example
///
/// ```no_run
/// use rust_netsock::{Connector, TimeoutPolicy};
///
/// let connector = Connector::new().with_policy(TimeoutPolicy::from_millis(5_000, 2_000));
/// let socket = connector.connect("test.rebex.net", 22)?;
/// socket.close();
/// # Ok::<(), rust_netsock::ConnectError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Connector<R = SystemResolver> {
    policy: TimeoutPolicy,
    resolver: R,
}

impl Connector {
    /// Create a connector with the default policy and the system resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R: Resolver> Connector<R> {
    /// Set the timeout policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the resolver.
    #[must_use]
    pub fn with_resolver<R2: Resolver>(self, resolver: R2) -> Connector<R2> {
        Connector {
            policy: self.policy,
            resolver,
        }
    }

    /// The timeout policy applied to new sockets.
    #[must_use]
    pub const fn policy(&self) -> TimeoutPolicy {
        self.policy
    }

    /// Open a connected stream socket to `hostname:port`.
    ///
    /// The returned socket is in blocking mode. On any failure no
    /// descriptor is left open.
    pub fn connect(&self, hostname: &str, port: i32) -> Result<Socket> {
        let port = validate(hostname, port)?;
        tracing::info!(host = %hostname, port, "Connecting");

        let fd = stream_socket().map_err(|e| {
            tracing::error!(errno = e.raw_os_error(), "Failed to create socket");
            ConnectError::from(e)
        })?;

        self.apply_io_timeout(&fd);

        let addr = match self.resolver.resolve_ipv4(hostname) {
            Ok(addrs) if !addrs.is_empty() => SocketAddrV4::new(addrs[0], port),
            Ok(_) | Err(_) => {
                tracing::error!(host = %hostname, "Failed to resolve hostname");
                drop(fd);
                return Err(ConnectError::NameResolutionFailed {
                    hostname: hostname.to_string(),
                });
            }
        };

        if let Err(errno) = connect_within(&fd, addr, self.policy.connect()) {
            tracing::error!(
                host = %hostname,
                port,
                errno = errno.raw_os_error(),
                "Failed to connect"
            );
            drop(fd);
            return Err(ConnectError::connect_failed(
                hostname,
                port,
                io::Error::from(errno),
            ));
        }

        tracing::info!(
            host = %hostname,
            port,
            fd = fd.as_raw_fd(),
            "Connected"
        );
        Ok(Socket::new(fd, addr))
    }

    fn apply_io_timeout(&self, fd: &OwnedFd) {
        let io = Some(self.policy.io());
        if let Err(e) = sockopt::set_socket_timeout(fd, Timeout::Recv, io) {
            tracing::warn!(errno = e.raw_os_error(), "Failed to set receive timeout");
        }
        if let Err(e) = sockopt::set_socket_timeout(fd, Timeout::Send, io) {
            tracing::warn!(errno = e.raw_os_error(), "Failed to set send timeout");
        }
    }
}

/// A close-on-exec IPv4 stream socket.
#[cfg(not(target_vendor = "apple"))]
fn stream_socket() -> rustix::io::Result<OwnedFd> {
    rustix::net::socket_with(
        AddressFamily::INET,
        SocketType::STREAM,
        SocketFlags::CLOEXEC,
        None,
    )
}

/// A close-on-exec IPv4 stream socket.
#[cfg(target_vendor = "apple")]
fn stream_socket() -> rustix::io::Result<OwnedFd> {
    let fd = rustix::net::socket(AddressFamily::INET, SocketType::STREAM, None)?;
    rustix::io::fcntl_setfd(&fd, rustix::io::FdFlags::CLOEXEC)?;
    Ok(fd)
}

/// Open a connected socket with the default policy and system resolver.
pub fn connect(hostname: &str, port: i32) -> Result<Socket> {
    Connector::new().connect(hostname, port)
}

/// Close a socket returned by [`connect`].
pub fn close_socket(socket: Socket) {
    socket.close();
}

fn validate(hostname: &str, port: i32) -> Result<u16> {
    if hostname.is_empty() {
        return Err(ConnectError::invalid_argument(
            hostname,
            port,
            "hostname is empty",
        ));
    }
    if port <= 0 {
        return Err(ConnectError::invalid_argument(
            hostname,
            port,
            "port must be positive",
        ));
    }
    u16::try_from(port)
        .map_err(|_| ConnectError::invalid_argument(hostname, port, "port exceeds 65535"))
}

/// Connect with `ceiling` as the upper bound, leaving the descriptor in
/// blocking mode afterwards.
fn connect_within(fd: &OwnedFd, addr: SocketAddrV4, ceiling: Duration) -> rustix::io::Result<()> {
    set_fd_nonblocking(fd.as_fd(), true)?;
    let result = match rustix::net::connect(fd, &addr) {
        Ok(()) => Ok(()),
        Err(e) if e == Errno::INPROGRESS => wait_writable(fd, ceiling),
        Err(e) => Err(e),
    };
    set_fd_nonblocking(fd.as_fd(), false)?;
    result
}

fn wait_writable(fd: &OwnedFd, ceiling: Duration) -> rustix::io::Result<()> {
    let deadline = Instant::now() + ceiling;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(Errno::TIMEDOUT);
        }
        let timeout = Timespec {
            tv_sec: remaining.as_secs() as _,
            tv_nsec: remaining.subsec_nanos() as _,
        };
        let mut fds = [PollFd::new(fd, PollFlags::OUT)];
        match poll(&mut fds, Some(&timeout)) {
            Ok(0) => return Err(Errno::TIMEDOUT),
            Ok(_) => return sockopt::socket_error(fd)?,
            Err(e) if e == Errno::INTR => {}
            Err(e) => return Err(e),
        }
    }
}
