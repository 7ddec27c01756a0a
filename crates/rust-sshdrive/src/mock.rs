//! Mock engine support for testing.
//!
//! This module provides a scripted engine and transport for exercising the
//! driver and session lifecycle without a network:
//!
//! - [`MockEngine`]: primitives follow a per-primitive script, every call
//!   is logged
//! - [`MockTransport`]: records non-blocking switches and closes
//! - Built-in scenarios for common cases
//!
//! # Example
//!
//! ```rust
//! use rust_sshdrive::mock::{MockEngine, MockTransport, Primitive};
//!
//! let engine = MockEngine::new()
//!     .would_block(Primitive::Handshake, 2)
//!     .read_data("hi\n")
//!     .read_eof();
//! let transport = MockTransport::new(3);
//! let probe = transport.probe();
//! assert_eq!(probe.closes(), 0);
//! ```

pub mod engine;
pub mod event;
pub mod transport;

pub use engine::{CallLog, MockChannel, MockEngine, MockSession};
pub use event::{Primitive, ReadEvent, ReadScript};
pub use transport::{MockTransport, TransportProbe};

/// Engine that runs `echo hi`: the handshake blocks twice, then the
/// command prints `hi\n` and the stream ends.
#[must_use]
pub fn echo_hi() -> MockEngine {
    MockEngine::new()
        .would_block(Primitive::Handshake, 2)
        .read_data("hi\n")
        .read_eof()
}

/// Engine whose server rejects every password.
#[must_use]
pub fn rejecting_auth() -> MockEngine {
    MockEngine::new().fail(Primitive::Authenticate, crate::engine::EngineCode::AUTHENTICATION_FAILED)
}

/// Engine that answers each command with its own output, each followed by
/// end of stream.
#[must_use]
pub fn with_outputs<I, B>(outputs: I) -> MockEngine
where
    I: IntoIterator<Item = B>,
    B: Into<Vec<u8>>,
{
    outputs
        .into_iter()
        .fold(MockEngine::new(), |engine, out| engine.read_data(out).read_eof())
}
