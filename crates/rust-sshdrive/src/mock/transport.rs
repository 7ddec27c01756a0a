//! Mock transport.

use std::io;
use std::os::fd::RawFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::engine::Transport;

#[derive(Debug, Default)]
struct TransportState {
    closes: AtomicUsize,
    nonblocking: AtomicBool,
}

/// A [`Transport`] that records what the session does with it.
///
/// The descriptor is never a real socket; only the engine sees it.
#[derive(Debug)]
pub struct MockTransport {
    fd: RawFd,
    fail_nonblocking: bool,
    state: Arc<TransportState>,
}

/// Observer for a [`MockTransport`] that stays usable after the transport
/// has been moved into a session.
#[derive(Debug, Clone)]
pub struct TransportProbe {
    state: Arc<TransportState>,
}

impl MockTransport {
    /// Create a transport reporting `fd` as its descriptor.
    #[must_use]
    pub fn new(fd: RawFd) -> Self {
        Self {
            fd,
            fail_nonblocking: false,
            state: Arc::default(),
        }
    }

    /// Make switching to non-blocking mode fail.
    #[must_use]
    pub const fn failing_nonblocking(mut self) -> Self {
        self.fail_nonblocking = true;
        self
    }

    /// Get an observer.
    #[must_use]
    pub fn probe(&self) -> TransportProbe {
        TransportProbe {
            state: Arc::clone(&self.state),
        }
    }
}

impl Transport for MockTransport {
    fn descriptor(&self) -> RawFd {
        self.fd
    }

    fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        if self.fail_nonblocking {
            return Err(io::Error::new(io::ErrorKind::Unsupported, "mock transport"));
        }
        self.state.nonblocking.store(nonblocking, Ordering::SeqCst);
        Ok(())
    }

    fn close(self) {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
    }
}

impl TransportProbe {
    /// Number of times the transport was closed.
    #[must_use]
    pub fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    /// Check whether the transport was switched to non-blocking mode.
    #[must_use]
    pub fn is_nonblocking(&self) -> bool {
        self.state.nonblocking.load(Ordering::SeqCst)
    }
}
