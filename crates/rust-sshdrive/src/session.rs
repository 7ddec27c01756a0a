//! Session and channel lifecycle.
//!
//! [`Client`] owns an engine and a driver. [`Client::establish`] takes a
//! connected transport through handshake and authentication and returns a
//! [`Session`], which runs commands one channel at a time:
//!
//! ```text
//! open channel -> exec -> drain output -> close channel
//! ```
//!
//! Resources are released in reverse acquisition order on every path:
//! channel, then session (after a best-effort disconnect notification),
//! then transport. Each is released exactly once; dropping a `Session`
//! without calling [`Session::shutdown`] performs the same teardown.
//!
//! # Example
//!
//! ```ignore
//! use rust_sshdrive::prelude::*;
//!
//! let library = LibraryState::new();
//! let mut client = Client::new(engine, Driver::new(Cooperative::new()), &library);
//! client.init()?;
//!
//! let mut session = client.connect("test.rebex.net", 22, &Credentials::new("demo", "password"))?;
//! session.run("echo hello", &mut std::io::stdout())?;
//! session.shutdown();
//! ```

use std::fmt;
use std::io::Write;

use rust_netsock::{Connector, Socket, TimeoutPolicy};

use crate::config::{
    ClientConfig, Credentials, DEFAULT_DISCONNECT_ATTEMPTS, DEFAULT_READ_BUFFER,
};
use crate::driver::Driver;
use crate::engine::{SshEngine, Transport};
use crate::error::{DriveError, Result};
use crate::library::LibraryState;
use crate::scheduler::{Scheduler, Substrate};
use crate::types::{CommandOutput, SessionState, Step};

/// Disconnect reason sent on a regular shutdown.
pub const NORMAL_SHUTDOWN: &str = "Normal shutdown";

/// Disconnect reason sent after the server rejected the credentials.
pub const AUTHENTICATION_FAILED: &str = "Authentication failed";

/// An engine, a driver, and the library state guarding the engine.
pub struct Client<'l, E: SshEngine, S: Scheduler> {
    engine: E,
    driver: Driver<S>,
    library: &'l LibraryState,
    timeouts: TimeoutPolicy,
    read_buffer: usize,
    disconnect_attempts: u32,
}

impl<E: SshEngine, S: Scheduler> fmt::Debug for Client<'_, E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("poll_interval", &self.driver.poll_interval())
            .field("limit", &self.driver.limit())
            .field("timeouts", &self.timeouts)
            .field("read_buffer", &self.read_buffer)
            .finish()
    }
}

impl<'l, E: SshEngine> Client<'l, E, Substrate> {
    /// Create a client from a config.
    #[must_use]
    pub fn from_config(engine: E, config: &ClientConfig, library: &'l LibraryState) -> Self {
        let driver = Driver::new(Substrate::from_kind(config.scheduler))
            .with_poll_interval(config.poll_interval)
            .with_limit(config.retry);
        Client::new(engine, driver, library)
            .with_timeouts(config.timeouts)
            .with_read_buffer(config.read_buffer)
            .with_disconnect_attempts(config.disconnect_attempts)
    }
}

impl<'l, E: SshEngine, S: Scheduler> Client<'l, E, S> {
    /// Create a client.
    #[must_use]
    pub fn new(engine: E, driver: Driver<S>, library: &'l LibraryState) -> Self {
        Self {
            engine,
            driver,
            library,
            timeouts: TimeoutPolicy::default(),
            read_buffer: DEFAULT_READ_BUFFER,
            disconnect_attempts: DEFAULT_DISCONNECT_ATTEMPTS,
        }
    }

    /// Set the timeouts used by [`connect`](Self::connect).
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: TimeoutPolicy) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Set the channel read buffer size.
    #[must_use]
    pub const fn with_read_buffer(mut self, size: usize) -> Self {
        self.read_buffer = size;
        self
    }

    /// Set the cap on disconnect notification attempts.
    #[must_use]
    pub const fn with_disconnect_attempts(mut self, attempts: u32) -> Self {
        self.disconnect_attempts = attempts;
        self
    }

    /// The engine.
    #[must_use]
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    /// The engine, mutably.
    pub const fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// The driver.
    #[must_use]
    pub const fn driver(&self) -> &Driver<S> {
        &self.driver
    }

    /// Give the engine back.
    #[must_use]
    pub fn into_engine(self) -> E {
        self.engine
    }

    /// Initialise the engine library (idempotent).
    pub fn init(&mut self) -> Result<()> {
        self.library.init(&mut self.engine)
    }

    /// Tear the engine library down (idempotent).
    pub fn cleanup(&mut self) {
        self.library.cleanup(&mut self.engine);
    }

    /// Connect to `host:port` and establish a session over the new socket.
    pub fn connect(
        &mut self,
        host: &str,
        port: i32,
        credentials: &Credentials,
    ) -> Result<Session<'_, 'l, E, S, Socket>> {
        let socket = Connector::new()
            .with_policy(self.timeouts)
            .connect(host, port)?;
        self.establish(socket, credentials)
    }

    /// Take `transport` through handshake and authentication.
    ///
    /// The transport is owned by the session from here on. On failure
    /// everything acquired so far is released, the transport included.
    pub fn establish<T: Transport>(
        &mut self,
        transport: T,
        credentials: &Credentials,
    ) -> Result<Session<'_, 'l, E, S, T>> {
        if !self.library.is_initialized() {
            tracing::error!("Engine library is not initialised");
            transport.close();
            return Err(DriveError::NotInitialized);
        }

        let Self { engine, driver, .. } = &mut *self;
        let handle = match driver.drive(Step::SessionInit, || engine.session_new()) {
            Ok(handle) => handle,
            Err(err) => {
                tracing::error!(error = %err, "Failed to create session");
                transport.close();
                return Err(err);
            }
        };

        let mut session = Session {
            client: self,
            transport: Some(transport),
            session: Some(handle),
            channel: None,
            state: SessionState::SocketEstablished,
        };

        if let Err(err) = session.handshake() {
            tracing::error!(error = %err, "Handshake failed");
            session.fail(None);
            return Err(err);
        }
        if let Err(err) = session.authenticate(credentials) {
            tracing::error!(user = %credentials.username, error = %err, "Authentication failed");
            session.fail(Some(AUTHENTICATION_FAILED));
            return Err(err);
        }

        session.state = SessionState::Ready;
        tracing::info!(user = %credentials.username, "Session ready");
        Ok(session)
    }

    /// Connect, run `commands` in order, and shut down.
    ///
    /// Output of every command goes to `sink`. The first failing command
    /// aborts the sequence; the session is still shut down cleanly.
    pub fn run_commands<I, W>(
        &mut self,
        host: &str,
        port: i32,
        credentials: &Credentials,
        commands: I,
        sink: &mut W,
    ) -> Result<Vec<CommandOutput>>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        W: Write + ?Sized,
    {
        let socket = Connector::new()
            .with_policy(self.timeouts)
            .connect(host, port)?;
        self.run_commands_over(socket, credentials, commands, sink)
    }

    /// Like [`run_commands`](Self::run_commands) over an existing transport.
    pub fn run_commands_over<T, I, W>(
        &mut self,
        transport: T,
        credentials: &Credentials,
        commands: I,
        sink: &mut W,
    ) -> Result<Vec<CommandOutput>>
    where
        T: Transport,
        I: IntoIterator,
        I::Item: AsRef<str>,
        W: Write + ?Sized,
    {
        let mut session = self.establish(transport, credentials)?;
        let mut outputs = Vec::new();

        for command in commands {
            let command = command.as_ref();
            match session.run(command, sink) {
                Ok(output) => outputs.push(output),
                Err(err) => {
                    tracing::error!(command = %command, error = %err, "Command failed, aborting");
                    session.shutdown();
                    return Err(err);
                }
            }
        }

        session.shutdown();
        Ok(outputs)
    }
}

/// An authenticated session over a transport.
///
/// At most one channel is open at a time.
pub struct Session<'c, 'l, E, S, T>
where
    E: SshEngine,
    S: Scheduler,
    T: Transport,
{
    client: &'c mut Client<'l, E, S>,
    transport: Option<T>,
    session: Option<E::Session>,
    channel: Option<E::Channel>,
    state: SessionState,
}

impl<E, S, T> fmt::Debug for Session<'_, '_, E, S, T>
where
    E: SshEngine,
    S: Scheduler,
    T: Transport,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("channel_open", &self.channel.is_some())
            .finish()
    }
}

impl<E, S, T> Session<'_, '_, E, S, T>
where
    E: SshEngine,
    S: Scheduler,
    T: Transport,
{
    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Check whether a channel is open.
    #[must_use]
    pub const fn has_channel(&self) -> bool {
        self.channel.is_some()
    }

    /// Open a session channel.
    ///
    /// Fails with [`DriveError::ChannelBusy`] while another channel is
    /// open.
    pub fn open_channel(&mut self) -> Result<()> {
        if self.channel.is_some() {
            return Err(DriveError::ChannelBusy);
        }
        if !self.state.accepts_channel() {
            return Err(DriveError::invalid_state("open a channel", self.state));
        }

        self.state = SessionState::ChannelOpening;
        let (engine, driver, session) = self.session_parts("open a channel")?;
        match driver.drive(Step::ChannelOpen, || engine.channel_open(session)) {
            Ok(channel) => {
                self.channel = Some(channel);
                tracing::debug!("Channel opened");
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to open channel");
                self.state = SessionState::Ready;
                Err(err)
            }
        }
    }

    /// Start `command` on the open channel.
    pub fn exec(&mut self, command: &str) -> Result<()> {
        if self.state != SessionState::ChannelOpening {
            return Err(DriveError::invalid_state("exec", self.state));
        }

        self.state = SessionState::Executing;
        let (engine, driver, channel) = self.channel_parts("exec")?;
        let result = driver.drive(Step::Exec, || engine.channel_exec(channel, command));
        if let Err(err) = result {
            tracing::error!(command = %command, error = %err, "Failed to execute command");
            self.abandon_channel();
            return Err(err);
        }
        tracing::debug!(command = %command, "Command started");
        Ok(())
    }

    /// Forward the command's output to `sink` until end of stream.
    ///
    /// Returns the number of bytes forwarded.
    pub fn drain_output<W: Write + ?Sized>(&mut self, sink: &mut W) -> Result<u64> {
        if self.state != SessionState::Executing {
            return Err(DriveError::invalid_state("read output", self.state));
        }

        self.state = SessionState::Draining;
        let read_buffer = self.client.read_buffer;
        let (engine, driver, channel) = self.channel_parts("read output")?;
        let result = driver.drain(
            Step::Read,
            |buf| engine.channel_read(channel, buf),
            read_buffer,
            sink,
        );
        match result {
            Ok(bytes) => Ok(bytes),
            Err(err) => {
                tracing::error!(error = %err, "Failed to read output");
                self.abandon_channel();
                Err(err)
            }
        }
    }

    /// Close and free the open channel.
    ///
    /// The channel is freed even when the close request fails.
    pub fn close_channel(&mut self) -> Result<()> {
        let (engine, driver, channel) = self.channel_parts("close the channel")?;
        let result = driver.drive(Step::ChannelClose, || engine.channel_close(channel));

        if let Some(channel) = self.channel.take() {
            self.client.engine.channel_free(channel);
        }
        match result {
            Ok(()) => {
                self.state = SessionState::ChannelClosed;
                tracing::debug!("Channel closed");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "Channel close failed, channel freed");
                self.state = SessionState::Ready;
                Err(err)
            }
        }
    }

    /// Run one command through a full channel cycle.
    pub fn run<W: Write + ?Sized>(&mut self, command: &str, sink: &mut W) -> Result<CommandOutput> {
        tracing::info!(command = %command, "Executing command");
        self.open_channel()?;
        self.exec(command)?;
        let bytes = self.drain_output(sink)?;
        self.close_channel()?;
        Ok(CommandOutput { bytes })
    }

    /// Disconnect, free the session, and close the transport.
    pub fn shutdown(mut self) {
        self.teardown(Some(NORMAL_SHUTDOWN));
        tracing::info!("Session closed");
    }

    fn handshake(&mut self) -> Result<()> {
        let transport = self
            .transport
            .as_ref()
            .ok_or(DriveError::invalid_state("handshake", self.state))?;
        transport
            .set_nonblocking(true)
            .map_err(DriveError::Transport)?;
        let fd = transport.descriptor();

        self.state = SessionState::Handshaking;
        tracing::debug!(fd, "Starting handshake");
        let (engine, driver, session) = self.session_parts("handshake")?;
        driver.drive(Step::Handshake, || engine.handshake(session, fd))?;
        tracing::info!("Handshake complete");
        Ok(())
    }

    fn authenticate(&mut self, credentials: &Credentials) -> Result<()> {
        self.state = SessionState::Authenticating;
        tracing::debug!(user = %credentials.username, "Authenticating");
        let (engine, driver, session) = self.session_parts("authenticate")?;
        driver.drive(Step::Authenticate, || {
            engine.authenticate(session, &credentials.username, &credentials.password)
        })?;
        tracing::info!(user = %credentials.username, "Authentication successful");
        Ok(())
    }

    fn session_parts(
        &mut self,
        operation: &'static str,
    ) -> Result<(&mut E, &Driver<S>, &mut E::Session)> {
        let session = self
            .session
            .as_mut()
            .ok_or(DriveError::invalid_state(operation, self.state))?;
        let client = &mut *self.client;
        Ok((&mut client.engine, &client.driver, session))
    }

    fn channel_parts(
        &mut self,
        operation: &'static str,
    ) -> Result<(&mut E, &Driver<S>, &mut E::Channel)> {
        let channel = self
            .channel
            .as_mut()
            .ok_or(DriveError::invalid_state(operation, self.state))?;
        let client = &mut *self.client;
        Ok((&mut client.engine, &client.driver, channel))
    }

    /// Free the channel after a failed step, returning to `Ready`.
    fn abandon_channel(&mut self) {
        if let Some(channel) = self.channel.take() {
            self.client.engine.channel_free(channel);
            tracing::debug!("Channel freed after failure");
        }
        self.state = SessionState::Ready;
    }

    fn fail(&mut self, reason: Option<&str>) {
        self.state = SessionState::Failed;
        self.teardown(reason);
    }

    /// Release channel, session, and transport, each at most once.
    fn teardown(&mut self, reason: Option<&str>) {
        let client = &mut *self.client;

        if let Some(channel) = self.channel.take() {
            client.engine.channel_free(channel);
        }

        if let Some(mut session) = self.session.take() {
            if let Some(reason) = reason {
                if self.state != SessionState::Failed {
                    self.state = SessionState::Disconnecting;
                }
                let limit = client.driver.limit().capped(client.disconnect_attempts);
                let notified = client.driver.drive_with_limit(Step::Disconnect, limit, || {
                    client.engine.session_disconnect(&mut session, reason)
                });
                if let Err(err) = notified {
                    tracing::warn!(error = %err, "Disconnect notification failed");
                }
            }
            client.engine.session_free(session);
        }

        if let Some(transport) = self.transport.take() {
            transport.close();
        }

        if self.state != SessionState::Failed {
            self.state = SessionState::Freed;
        }
    }
}

impl<E, S, T> Drop for Session<'_, '_, E, S, T>
where
    E: SshEngine,
    S: Scheduler,
    T: Transport,
{
    fn drop(&mut self) {
        if self.session.is_some() || self.transport.is_some() {
            let reason = self.state.is_authenticated().then_some(NORMAL_SHUTDOWN);
            self.teardown(reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineCode;
    use crate::mock::{self, MockEngine, MockTransport, Primitive};
    use crate::test_utils::ManualScheduler;

    fn initialised(engine: MockEngine, library: &LibraryState) -> Client<'_, MockEngine, ManualScheduler> {
        let mut client = Client::new(engine, Driver::new(ManualScheduler::new()), library);
        client.init().unwrap();
        client
    }

    fn creds() -> Credentials {
        Credentials::new("demo", "password")
    }

    #[test]
    fn echo_hi_end_to_end() {
        let library = LibraryState::new();
        let mut client = initialised(mock::echo_hi(), &library);
        let transport = MockTransport::new(7);
        let probe = transport.probe();
        let mut out: Vec<u8> = Vec::new();

        let outputs = client
            .run_commands_over(transport, &creds(), ["echo hi"], &mut out)
            .unwrap();

        assert_eq!(out, b"hi\n");
        assert_eq!(outputs, vec![CommandOutput { bytes: 3 }]);
        assert_eq!(client.driver().scheduler().yield_count(), 2);
        assert!(probe.is_nonblocking());
        assert_eq!(probe.closes(), 1);

        let calls = client.engine().calls();
        assert_eq!(calls.handshake_fds, vec![7, 7, 7]);
        assert_eq!(calls.commands, vec!["echo hi".to_string()]);
        assert_eq!(calls.channel_free, 1);
        assert_eq!(calls.session_free, 1);
        assert_eq!(calls.disconnect_reasons, vec![NORMAL_SHUTDOWN.to_string()]);
        assert_eq!(client.engine().live_sessions(), 0);
        assert_eq!(client.engine().open_channels(), 0);
    }

    #[test]
    fn requires_initialised_library() {
        let library = LibraryState::new();
        let mut client = Client::new(MockEngine::new(), Driver::new(ManualScheduler::new()), &library);
        let transport = MockTransport::new(3);
        let probe = transport.probe();

        let err = client.establish(transport, &creds()).unwrap_err();

        assert!(matches!(err, DriveError::NotInitialized));
        assert_eq!(probe.closes(), 1);
        assert_eq!(client.engine().calls().session_new, 0);
    }

    #[test]
    fn session_init_failure_closes_transport() {
        let library = LibraryState::new();
        let engine = MockEngine::new().fail(Primitive::SessionNew, EngineCode::ALLOC);
        let mut client = initialised(engine, &library);
        let transport = MockTransport::new(3);
        let probe = transport.probe();

        let err = client.establish(transport, &creds()).unwrap_err();

        assert_eq!(err.step(), Some(Step::SessionInit));
        assert_eq!(probe.closes(), 1);
        assert_eq!(client.engine().calls().session_free, 0);
    }

    #[test]
    fn nonblocking_failure_is_transport_error() {
        let library = LibraryState::new();
        let mut client = initialised(MockEngine::new(), &library);
        let transport = MockTransport::new(3).failing_nonblocking();
        let probe = transport.probe();

        let err = client.establish(transport, &creds()).unwrap_err();

        assert!(matches!(err, DriveError::Transport(_)));
        assert_eq!(client.engine().calls().handshake, 0);
        assert_eq!(client.engine().calls().session_free, 1);
        assert_eq!(probe.closes(), 1);
    }

    #[test]
    fn auth_failure_sends_reason() {
        let library = LibraryState::new();
        let mut client = initialised(mock::rejecting_auth(), &library);
        let transport = MockTransport::new(3);
        let probe = transport.probe();

        let err = client.establish(transport, &creds()).unwrap_err();

        assert_eq!(err.engine_code(), Some(EngineCode::AUTHENTICATION_FAILED));
        let calls = client.engine().calls();
        assert_eq!(calls.disconnect_reasons, vec![AUTHENTICATION_FAILED.to_string()]);
        assert_eq!(calls.session_free, 1);
        assert_eq!(probe.closes(), 1);
    }

    #[test]
    fn second_channel_rejected() {
        let library = LibraryState::new();
        let mut client = initialised(MockEngine::new(), &library);

        let mut session = client.establish(MockTransport::new(3), &creds()).unwrap();
        session.open_channel().unwrap();
        let err = session.open_channel().unwrap_err();
        assert!(matches!(err, DriveError::ChannelBusy));
        assert_eq!(session.state(), SessionState::ChannelOpening);
        session.shutdown();

        let calls = client.engine().calls();
        assert_eq!(calls.channel_open, 1);
        assert_eq!(calls.max_open_channels, 1);
        assert_eq!(calls.channel_free, 1);
    }

    #[test]
    fn steps_out_of_order_rejected() {
        let library = LibraryState::new();
        let mut client = initialised(MockEngine::new(), &library);
        let mut session = client.establish(MockTransport::new(3), &creds()).unwrap();

        assert!(matches!(
            session.exec("ls"),
            Err(DriveError::InvalidState { state: SessionState::Ready, .. })
        ));
        assert!(matches!(
            session.drain_output(&mut std::io::sink()),
            Err(DriveError::InvalidState { .. })
        ));
        assert!(matches!(session.close_channel(), Err(DriveError::InvalidState { .. })));
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[test]
    fn exec_failure_frees_channel_and_keeps_session() {
        let library = LibraryState::new();
        let engine = MockEngine::new()
            .fail(Primitive::ChannelExec, EngineCode::CHANNEL_REQUEST_DENIED)
            .read_data("ok\n")
            .read_eof();
        let mut client = initialised(engine, &library);
        let mut session = client.establish(MockTransport::new(3), &creds()).unwrap();
        let mut out: Vec<u8> = Vec::new();

        let err = session.run("bogus", &mut out).unwrap_err();
        assert_eq!(err.step(), Some(Step::Exec));
        assert_eq!(session.state(), SessionState::Ready);
        assert!(!session.has_channel());

        session.run("echo ok", &mut out).unwrap();
        assert_eq!(out, b"ok\n");
        session.shutdown();

        let calls = client.engine().calls();
        assert_eq!(calls.channel_free, 2);
        assert_eq!(calls.channel_close, 1);
    }

    #[test]
    fn close_failure_still_frees_channel() {
        let library = LibraryState::new();
        let engine = MockEngine::new().fail(Primitive::ChannelClose, EngineCode::CHANNEL_CLOSED);
        let mut client = initialised(engine, &library);
        let mut session = client.establish(MockTransport::new(3), &creds()).unwrap();

        let err = session.run("true", &mut std::io::sink()).unwrap_err();
        assert_eq!(err.step(), Some(Step::ChannelClose));
        assert!(!session.has_channel());
        assert!(session.state().accepts_channel());
        drop(session);

        assert_eq!(client.engine().calls().channel_free, 1);
        assert_eq!(client.engine().open_channels(), 0);
    }

    #[test]
    fn drop_tears_down_once() {
        let library = LibraryState::new();
        let mut client = initialised(MockEngine::new(), &library);
        let transport = MockTransport::new(3);
        let probe = transport.probe();

        {
            let mut session = client.establish(transport, &creds()).unwrap();
            session.open_channel().unwrap();
        }

        let calls = client.engine().calls();
        assert_eq!(calls.channel_free, 1);
        assert_eq!(calls.session_free, 1);
        assert_eq!(calls.disconnect_reasons, vec![NORMAL_SHUTDOWN.to_string()]);
        assert_eq!(probe.closes(), 1);
    }

    #[test]
    fn disconnect_attempts_are_capped() {
        let library = LibraryState::new();
        let engine = MockEngine::new().would_block(Primitive::Disconnect, 1_000);
        let mut client = Client::new(engine, Driver::new(ManualScheduler::new()), &library)
            .with_disconnect_attempts(5);
        client.init().unwrap();
        let transport = MockTransport::new(3);
        let probe = transport.probe();

        client.establish(transport, &creds()).unwrap().shutdown();

        let calls = client.engine().calls();
        assert_eq!(calls.session_disconnect, 5);
        assert_eq!(calls.session_free, 1);
        assert_eq!(probe.closes(), 1);
    }

    #[test]
    fn sequence_aborts_on_first_failure() {
        let library = LibraryState::new();
        let engine = mock::with_outputs(["one\n", "two\n", "three\n"])
            .respond(Primitive::ChannelOpen, Ok(()))
            .fail(Primitive::ChannelOpen, EngineCode::CHANNEL_FAILURE);
        let mut client = initialised(engine, &library);
        let mut out: Vec<u8> = Vec::new();

        let err = client
            .run_commands_over(MockTransport::new(3), &creds(), ["a", "b", "c"], &mut out)
            .unwrap_err();

        assert_eq!(err.step(), Some(Step::ChannelOpen));
        assert_eq!(out, b"one\n");
        let calls = client.engine().calls();
        assert_eq!(calls.commands, vec!["a".to_string()]);
        assert_eq!(calls.channel_free, 1);
        assert_eq!(calls.session_free, 1);
    }

    #[test]
    fn from_config_applies_settings() {
        let library = LibraryState::new();
        let config = ClientConfig::new("h")
            .read_buffer(64)
            .poll_interval(std::time::Duration::from_millis(20));
        let client = Client::from_config(MockEngine::new(), &config, &library);

        assert_eq!(client.driver().poll_interval(), std::time::Duration::from_millis(20));
        assert_eq!(client.driver().scheduler().kind(), config.scheduler);
        assert_eq!(client.read_buffer, 64);
    }
}
