//! Scripted results for mock primitives.

use std::collections::VecDeque;

use crate::engine::EngineCode;

/// A scriptable engine primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// `SshEngine::init`.
    Init,
    /// `SshEngine::session_new`.
    SessionNew,
    /// `SshEngine::handshake`.
    Handshake,
    /// `SshEngine::authenticate`.
    Authenticate,
    /// `SshEngine::channel_open`.
    ChannelOpen,
    /// `SshEngine::channel_exec`.
    ChannelExec,
    /// `SshEngine::channel_close`.
    ChannelClose,
    /// `SshEngine::session_disconnect`.
    Disconnect,
}

/// One result of `channel_read`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadEvent {
    /// Bytes become readable. Longer than the caller's buffer means the
    /// rest is returned by the following reads.
    Data(Vec<u8>),
    /// Nothing to read yet.
    WouldBlock,
    /// End of stream.
    Eof,
    /// A read error code.
    Code(EngineCode),
}

impl ReadEvent {
    /// Create a data event.
    pub fn data(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Data(bytes.into())
    }

    /// Check if this is a data event.
    #[must_use]
    pub const fn is_data(&self) -> bool {
        matches!(self, Self::Data(_))
    }
}

/// Ordered read events. Once empty, every read reports end of stream.
#[derive(Debug, Clone, Default)]
pub struct ReadScript {
    events: VecDeque<ReadEvent>,
}

impl ReadScript {
    /// Create an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn push(&mut self, event: ReadEvent) {
        self.events.push_back(event);
    }

    /// Number of events left.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.events.len()
    }

    /// Serve one read into `buf`.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, EngineCode> {
        match self.events.pop_front() {
            None | Some(ReadEvent::Eof) => Ok(0),
            Some(ReadEvent::WouldBlock) => Err(EngineCode::WOULD_BLOCK),
            Some(ReadEvent::Code(code)) => Err(code),
            Some(ReadEvent::Data(mut bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                if n < bytes.len() {
                    self.events.push_front(ReadEvent::Data(bytes.split_off(n)));
                }
                Ok(n)
            }
        }
    }
}
