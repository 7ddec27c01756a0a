//! Scripted SSH engine.

use std::collections::{HashMap, VecDeque};
use std::os::fd::RawFd;

use super::event::{Primitive, ReadEvent, ReadScript};
use crate::engine::{EngineCode, SshEngine};

/// Session handle issued by [`MockEngine`].
#[derive(Debug, PartialEq, Eq)]
pub struct MockSession {
    id: u64,
}

impl MockSession {
    /// Handle id.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }
}

/// Channel handle issued by [`MockEngine`].
#[derive(Debug, PartialEq, Eq)]
pub struct MockChannel {
    id: u64,
    session: u64,
}

impl MockChannel {
    /// Handle id.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Id of the session that opened this channel.
    #[must_use]
    pub const fn session(&self) -> u64 {
        self.session
    }
}

/// Everything the engine was asked to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallLog {
    /// `init` calls.
    pub init: usize,
    /// `exit` calls.
    pub exit: usize,
    /// `session_new` calls.
    pub session_new: usize,
    /// `handshake` calls.
    pub handshake: usize,
    /// `authenticate` calls.
    pub authenticate: usize,
    /// `channel_open` calls.
    pub channel_open: usize,
    /// `channel_exec` calls.
    pub channel_exec: usize,
    /// `channel_read` calls.
    pub channel_read: usize,
    /// `channel_close` calls.
    pub channel_close: usize,
    /// `channel_free` calls.
    pub channel_free: usize,
    /// `session_disconnect` calls.
    pub session_disconnect: usize,
    /// `session_free` calls.
    pub session_free: usize,
    /// Highest number of channels open at once.
    pub max_open_channels: usize,
    /// Descriptors passed to `handshake`.
    pub handshake_fds: Vec<RawFd>,
    /// Commands passed to `channel_exec`.
    pub commands: Vec<String>,
    /// Reasons passed to `session_disconnect`.
    pub disconnect_reasons: Vec<String>,
}

/// An [`SshEngine`] whose primitives follow a script.
///
/// Each primitive pops its next scripted result; an empty script means
/// success. Reads follow a separate [`ReadScript`]. Every call is logged.
///
/// # Example
///
/// ```
/// use rust_sshdrive::engine::EngineCode;
/// use rust_sshdrive::mock::{MockEngine, Primitive};
///
/// let engine = MockEngine::new()
///     .would_block(Primitive::Handshake, 2)
///     .fail(Primitive::ChannelExec, EngineCode::CHANNEL_REQUEST_DENIED)
///     .read_data("hi\n");
/// assert_eq!(engine.calls().handshake, 0);
/// ```
#[derive(Debug, Default)]
pub struct MockEngine {
    script: HashMap<Primitive, VecDeque<Result<(), EngineCode>>>,
    reads: ReadScript,
    credentials: Option<(String, String)>,
    calls: CallLog,
    next_id: u64,
    live_sessions: usize,
    open_channels: usize,
}

impl MockEngine {
    /// Create an engine on which every primitive succeeds immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one result for `primitive`.
    #[must_use]
    pub fn respond(mut self, primitive: Primitive, result: Result<(), EngineCode>) -> Self {
        self.script.entry(primitive).or_default().push_back(result);
        self
    }

    /// Queue `times` would-block results for `primitive`.
    #[must_use]
    pub fn would_block(mut self, primitive: Primitive, times: usize) -> Self {
        let queue = self.script.entry(primitive).or_default();
        queue.extend(std::iter::repeat_n(Err(EngineCode::WOULD_BLOCK), times));
        self
    }

    /// Queue a failure for `primitive`.
    #[must_use]
    pub fn fail(self, primitive: Primitive, code: EngineCode) -> Self {
        self.respond(primitive, Err(code))
    }

    /// Make global initialisation fail.
    #[must_use]
    pub fn fail_init(self, code: EngineCode) -> Self {
        self.fail(Primitive::Init, code)
    }

    /// Only accept these credentials.
    #[must_use]
    pub fn expect_password(mut self, username: &str, password: &str) -> Self {
        self.credentials = Some((username.to_string(), password.to_string()));
        self
    }

    /// Queue a read event.
    #[must_use]
    pub fn read(mut self, event: ReadEvent) -> Self {
        self.reads.push(event);
        self
    }

    /// Queue readable bytes.
    #[must_use]
    pub fn read_data(self, bytes: impl Into<Vec<u8>>) -> Self {
        self.read(ReadEvent::Data(bytes.into()))
    }

    /// Queue `times` would-block reads.
    #[must_use]
    pub fn read_would_block(mut self, times: usize) -> Self {
        for _ in 0..times {
            self.reads.push(ReadEvent::WouldBlock);
        }
        self
    }

    /// Queue an end of stream.
    #[must_use]
    pub fn read_eof(self) -> Self {
        self.read(ReadEvent::Eof)
    }

    /// The call log.
    #[must_use]
    pub const fn calls(&self) -> &CallLog {
        &self.calls
    }

    /// Sessions created and not yet freed.
    #[must_use]
    pub const fn live_sessions(&self) -> usize {
        self.live_sessions
    }

    /// Channels opened and not yet freed.
    #[must_use]
    pub const fn open_channels(&self) -> usize {
        self.open_channels
    }

    fn next(&mut self, primitive: Primitive) -> Result<(), EngineCode> {
        self.script
            .get_mut(&primitive)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(()))
    }

    const fn issue_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl SshEngine for MockEngine {
    type Session = MockSession;
    type Channel = MockChannel;

    fn init(&mut self) -> Result<(), EngineCode> {
        self.calls.init += 1;
        self.next(Primitive::Init)
    }

    fn exit(&mut self) {
        self.calls.exit += 1;
    }

    fn session_new(&mut self) -> Result<MockSession, EngineCode> {
        self.calls.session_new += 1;
        self.next(Primitive::SessionNew)?;
        self.live_sessions += 1;
        Ok(MockSession {
            id: self.issue_id(),
        })
    }

    fn handshake(&mut self, _session: &mut MockSession, fd: RawFd) -> Result<(), EngineCode> {
        self.calls.handshake += 1;
        self.calls.handshake_fds.push(fd);
        self.next(Primitive::Handshake)
    }

    fn authenticate(
        &mut self,
        _session: &mut MockSession,
        username: &str,
        password: &str,
    ) -> Result<(), EngineCode> {
        self.calls.authenticate += 1;
        self.next(Primitive::Authenticate)?;
        match &self.credentials {
            Some((user, pass)) if user != username || pass != password => {
                Err(EngineCode::AUTHENTICATION_FAILED)
            }
            _ => Ok(()),
        }
    }

    fn channel_open(&mut self, session: &mut MockSession) -> Result<MockChannel, EngineCode> {
        self.calls.channel_open += 1;
        self.next(Primitive::ChannelOpen)?;
        self.open_channels += 1;
        self.calls.max_open_channels = self.calls.max_open_channels.max(self.open_channels);
        Ok(MockChannel {
            id: self.issue_id(),
            session: session.id,
        })
    }

    fn channel_exec(&mut self, _channel: &mut MockChannel, command: &str) -> Result<(), EngineCode> {
        self.calls.channel_exec += 1;
        let result = self.next(Primitive::ChannelExec);
        if result.is_ok() {
            self.calls.commands.push(command.to_string());
        }
        result
    }

    fn channel_read(&mut self, _channel: &mut MockChannel, buf: &mut [u8]) -> Result<usize, EngineCode> {
        self.calls.channel_read += 1;
        self.reads.read(buf)
    }

    fn channel_close(&mut self, _channel: &mut MockChannel) -> Result<(), EngineCode> {
        self.calls.channel_close += 1;
        self.next(Primitive::ChannelClose)
    }

    fn channel_free(&mut self, _channel: MockChannel) {
        self.calls.channel_free += 1;
        self.open_channels = self.open_channels.saturating_sub(1);
    }

    fn session_disconnect(&mut self, _session: &mut MockSession, reason: &str) -> Result<(), EngineCode> {
        self.calls.session_disconnect += 1;
        let result = self.next(Primitive::Disconnect);
        if result.is_ok() {
            self.calls.disconnect_reasons.push(reason.to_string());
        }
        result
    }

    fn session_free(&mut self, _session: MockSession) {
        self.calls.session_free += 1;
        self.live_sessions = self.live_sessions.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unscripted_primitives_succeed() {
        let mut engine = MockEngine::new();
        let mut session = engine.session_new().unwrap();

        assert_eq!(engine.handshake(&mut session, 5), Ok(()));
        assert_eq!(engine.authenticate(&mut session, "u", "p"), Ok(()));
        let channel = engine.channel_open(&mut session).unwrap();
        assert_eq!(channel.session(), session.id());

        engine.channel_free(channel);
        engine.session_free(session);
        assert_eq!(engine.live_sessions(), 0);
        assert_eq!(engine.open_channels(), 0);
        assert_eq!(engine.calls().handshake_fds, vec![5]);
    }

    #[test]
    fn script_is_consumed_in_order() {
        let mut engine = MockEngine::new()
            .would_block(Primitive::Handshake, 2)
            .fail(Primitive::Handshake, EngineCode::KEX_FAILURE);
        let mut session = engine.session_new().unwrap();

        assert_eq!(engine.handshake(&mut session, 3), Err(EngineCode::WOULD_BLOCK));
        assert_eq!(engine.handshake(&mut session, 3), Err(EngineCode::WOULD_BLOCK));
        assert_eq!(engine.handshake(&mut session, 3), Err(EngineCode::KEX_FAILURE));
        assert_eq!(engine.handshake(&mut session, 3), Ok(()));
        assert_eq!(engine.calls().handshake, 4);
    }

    #[test]
    fn wrong_password_rejected() {
        let mut engine = MockEngine::new().expect_password("demo", "password");
        let mut session = engine.session_new().unwrap();

        assert_eq!(
            engine.authenticate(&mut session, "demo", "wrong"),
            Err(EngineCode::AUTHENTICATION_FAILED)
        );
        assert_eq!(engine.authenticate(&mut session, "demo", "password"), Ok(()));
    }

    #[test]
    fn tracks_peak_open_channels() {
        let mut engine = MockEngine::new();
        let mut session = engine.session_new().unwrap();

        let a = engine.channel_open(&mut session).unwrap();
        let b = engine.channel_open(&mut session).unwrap();
        assert_ne!(a.id(), b.id());
        engine.channel_free(a);
        engine.channel_free(b);

        assert_eq!(engine.calls().max_open_channels, 2);
        assert_eq!(engine.open_channels(), 0);
    }

    #[test]
    fn exec_records_commands() {
        let mut engine = MockEngine::new().fail(Primitive::ChannelExec, EngineCode::CHANNEL_FAILURE);
        let mut session = engine.session_new().unwrap();
        let mut channel = engine.channel_open(&mut session).unwrap();

        assert!(engine.channel_exec(&mut channel, "false").is_err());
        assert!(engine.channel_exec(&mut channel, "true").is_ok());
        assert_eq!(engine.calls().commands, vec!["true".to_string()]);
    }
}
