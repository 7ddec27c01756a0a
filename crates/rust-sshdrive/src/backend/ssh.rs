//! russh-backed engine.
//!
//! russh is async, the driver is not. The process holds one small tokio
//! runtime, created by [`SshEngine::init`] and shut down by
//! [`SshEngine::exit`], so it lives exactly as long as the library's
//! global initialisation. Every [`RusshEngine`] shares it. Each primitive
//! spawns the matching russh future on its first call and reports
//! [`EngineCode::WOULD_BLOCK`] until that task finishes. The caller's
//! retry loop therefore sees the same contract as any other non-blocking
//! engine.

pub mod known_hosts;

use std::os::fd::{BorrowedFd, RawFd};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use russh::client::{self, Handle};
use russh::keys::PublicKey;
use russh::{ChannelMsg, Disconnect};
use tokio::runtime::{Handle as RuntimeHandle, Runtime};
use tokio::task::JoinHandle;

use crate::engine::{EngineCode, SshEngine};

/// Inactivity timeout applied to every session.
pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(60);

/// Runtime shared by every engine in the process.
static RUNTIME: Mutex<Option<Runtime>> = Mutex::new(None);

/// Handle to the shared runtime, or `BAD_USE` before `init`.
fn runtime() -> Result<RuntimeHandle, EngineCode> {
    RUNTIME
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
        .map(|runtime| runtime.handle().clone())
        .ok_or(EngineCode::BAD_USE)
}

/// How server host keys are checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HostKeyPolicy {
    /// Accept only keys listed in `known_hosts`.
    #[default]
    KnownHosts,
    /// Reject every key.
    RejectUnknown,
    /// Accept every key without verification.
    #[cfg(feature = "insecure-skip-verify")]
    AcceptAll,
}

/// russh client handler performing the host key check.
#[derive(Debug)]
pub struct HostKeyCheck {
    policy: HostKeyPolicy,
    host: Option<String>,
    port: u16,
}

impl client::Handler for HostKeyCheck {
    type Error = russh::Error;

    async fn check_server_key(&mut self, server_public_key: &PublicKey) -> Result<bool, Self::Error> {
        match self.policy {
            #[cfg(feature = "insecure-skip-verify")]
            HostKeyPolicy::AcceptAll => {
                tracing::warn!(host = ?self.host, "Accepting server key without verification (INSECURE)");
                Ok(true)
            }
            HostKeyPolicy::RejectUnknown => {
                tracing::debug!(host = ?self.host, "Rejecting unknown host key");
                Ok(false)
            }
            HostKeyPolicy::KnownHosts => match &self.host {
                Some(host) => Ok(known_hosts::check(host, self.port, server_public_key)),
                None => {
                    tracing::warn!("No host name configured, cannot check known_hosts");
                    Ok(false)
                }
            },
        }
    }
}

type SessionHandle = Handle<HostKeyCheck>;
type Channel = russh::Channel<client::Msg>;

/// Session state of [`RusshEngine`].
#[derive(Default)]
pub struct RusshSession {
    handle: Option<SessionHandle>,
    connect: Option<JoinHandle<Result<SessionHandle, russh::Error>>>,
    auth: Option<JoinHandle<(SessionHandle, Result<bool, russh::Error>)>>,
    open: Option<JoinHandle<(SessionHandle, Result<Channel, russh::Error>)>>,
    disconnect: Option<JoinHandle<(SessionHandle, Result<(), russh::Error>)>>,
}

impl std::fmt::Debug for RusshSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RusshSession")
            .field("connected", &self.handle.is_some())
            .finish()
    }
}

impl RusshSession {
    fn abort_pending(&mut self) {
        for task in [
            self.connect.take().map(|t| t.abort_handle()),
            self.auth.take().map(|t| t.abort_handle()),
            self.open.take().map(|t| t.abort_handle()),
            self.disconnect.take().map(|t| t.abort_handle()),
        ]
        .into_iter()
        .flatten()
        {
            task.abort();
        }
    }
}

/// Channel state of [`RusshEngine`].
#[derive(Default)]
pub struct RusshChannel {
    channel: Option<Channel>,
    exec: Option<JoinHandle<(Channel, Result<(), russh::Error>)>>,
    wait: Option<JoinHandle<(Channel, Option<ChannelMsg>)>>,
    close: Option<JoinHandle<(Channel, Result<(), russh::Error>)>>,
    buffered: Vec<u8>,
    eof: bool,
}

impl std::fmt::Debug for RusshChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RusshChannel")
            .field("buffered", &self.buffered.len())
            .field("eof", &self.eof)
            .finish()
    }
}

impl RusshChannel {
    fn abort_pending(&mut self) {
        for task in [
            self.exec.take().map(|t| t.abort_handle()),
            self.wait.take().map(|t| t.abort_handle()),
            self.close.take().map(|t| t.abort_handle()),
        ]
        .into_iter()
        .flatten()
        {
            task.abort();
        }
    }

    fn accept(&mut self, msg: Option<ChannelMsg>) -> Result<(), EngineCode> {
        match msg {
            Some(ChannelMsg::Data { data }) => self.buffered.extend_from_slice(&data),
            Some(ChannelMsg::ExtendedData { ext, .. }) => {
                tracing::trace!(ext, "Ignoring extended data");
            }
            Some(ChannelMsg::ExitStatus { exit_status }) => {
                tracing::debug!(exit_status, "Remote command exited");
            }
            Some(ChannelMsg::Failure) => return Err(EngineCode::CHANNEL_REQUEST_DENIED),
            Some(ChannelMsg::Eof | ChannelMsg::Close) | None => self.eof = true,
            Some(_) => {}
        }
        Ok(())
    }
}

/// An [`SshEngine`] on top of russh.
///
/// # Example
///
/// ```ignore
/// use rust_sshdrive::backend::{HostKeyPolicy, RusshEngine};
///
/// let engine = RusshEngine::new()
///     .with_host("test.rebex.net", 22)
///     .with_host_key_policy(HostKeyPolicy::KnownHosts);
/// ```
pub struct RusshEngine {
    config: Arc<client::Config>,
    policy: HostKeyPolicy,
    host: Option<String>,
    port: u16,
}

impl std::fmt::Debug for RusshEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RusshEngine")
            .field("initialized", &runtime().is_ok())
            .field("policy", &self.policy)
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

impl Default for RusshEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RusshEngine {
    /// Create an engine. Nothing runs until [`SshEngine::init`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: Arc::new(client::Config {
                inactivity_timeout: Some(DEFAULT_INACTIVITY_TIMEOUT),
                ..Default::default()
            }),
            policy: HostKeyPolicy::default(),
            host: None,
            port: 22,
        }
    }

    /// Name the server, for the `known_hosts` lookup.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = Some(host.into());
        self.port = port;
        self
    }

    /// Set the host key policy.
    #[must_use]
    pub const fn with_host_key_policy(mut self, policy: HostKeyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the inactivity timeout.
    #[must_use]
    pub fn with_inactivity_timeout(mut self, timeout: Duration) -> Self {
        self.config = Arc::new(client::Config {
            inactivity_timeout: Some(timeout),
            ..Default::default()
        });
        self
    }

    fn handler(&self) -> HostKeyCheck {
        HostKeyCheck {
            policy: self.policy,
            host: self.host.clone(),
            port: self.port,
        }
    }
}

/// Collect a finished task, or put it back.
///
/// `Ok(None)` means no task was pending.
fn poll_task<T>(runtime: &RuntimeHandle, slot: &mut Option<JoinHandle<T>>) -> Result<Option<T>, EngineCode> {
    let Some(task) = slot.take() else {
        return Ok(None);
    };
    if !task.is_finished() {
        *slot = Some(task);
        return Err(EngineCode::WOULD_BLOCK);
    }
    runtime.block_on(task).map(Some).map_err(|err| {
        tracing::warn!(error = %err, "Engine task failed");
        EngineCode::SOCKET_DISCONNECT
    })
}

fn engine_code(err: &russh::Error, fallback: EngineCode) -> EngineCode {
    tracing::debug!(error = %err, "russh error");
    match err {
        russh::Error::Disconnect | russh::Error::HUP | russh::Error::IO(_) => {
            EngineCode::SOCKET_DISCONNECT
        }
        russh::Error::UnknownKey => EngineCode::KEX_FAILURE,
        _ => fallback,
    }
}

impl SshEngine for RusshEngine {
    type Session = RusshSession;
    type Channel = RusshChannel;

    fn init(&mut self) -> Result<(), EngineCode> {
        let mut shared = RUNTIME.lock().unwrap_or_else(PoisonError::into_inner);
        if shared.is_some() {
            return Ok(());
        }
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("sshdrive-engine")
            .enable_all()
            .build()
            .map_err(|err| {
                tracing::error!(error = %err, "Failed to create engine runtime");
                EngineCode::ALLOC
            })?;
        *shared = Some(runtime);
        tracing::debug!("Engine runtime started");
        Ok(())
    }

    fn exit(&mut self) {
        let runtime = RUNTIME.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(runtime) = runtime {
            runtime.shutdown_background();
            tracing::debug!("Engine runtime stopped");
        }
    }

    fn session_new(&mut self) -> Result<RusshSession, EngineCode> {
        runtime()?;
        Ok(RusshSession::default())
    }

    fn handshake(&mut self, session: &mut RusshSession, fd: RawFd) -> Result<(), EngineCode> {
        let runtime = runtime()?;
        if session.handle.is_some() {
            return Ok(());
        }
        if let Some(result) = poll_task(&runtime, &mut session.connect)? {
            session.handle = Some(result.map_err(|err| engine_code(&err, EngineCode::KEX_FAILURE))?);
            return Ok(());
        }

        // SAFETY: `fd` stays open for the life of the session; the caller
        // owns it and closes it only after `session_free`.
        #[allow(unsafe_code)]
        let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
        let owned = borrowed.try_clone_to_owned().map_err(|err| {
            tracing::error!(fd, error = %err, "Cannot duplicate transport descriptor");
            EngineCode::SOCKET_NONE
        })?;
        let stream = std::net::TcpStream::from(owned);
        stream.set_nonblocking(true).map_err(|_| EngineCode::SOCKET_NONE)?;

        let config = Arc::clone(&self.config);
        let handler = self.handler();
        session.connect = Some(runtime.spawn(async move {
            let stream = tokio::net::TcpStream::from_std(stream)?;
            client::connect_stream(config, stream, handler).await
        }));
        Err(EngineCode::WOULD_BLOCK)
    }

    fn authenticate(
        &mut self,
        session: &mut RusshSession,
        username: &str,
        password: &str,
    ) -> Result<(), EngineCode> {
        let runtime = runtime()?;
        if let Some((handle, result)) = poll_task(&runtime, &mut session.auth)? {
            session.handle = Some(handle);
            return match result {
                Ok(true) => Ok(()),
                Ok(false) => Err(EngineCode::AUTHENTICATION_FAILED),
                Err(err) => Err(engine_code(&err, EngineCode::AUTHENTICATION_FAILED)),
            };
        }

        let mut handle = session.handle.take().ok_or(EngineCode::BAD_USE)?;
        let (username, password) = (username.to_string(), password.to_string());
        session.auth = Some(runtime.spawn(async move {
            let result = handle
                .authenticate_password(username, password)
                .await
                .map(|auth| auth.success());
            (handle, result)
        }));
        Err(EngineCode::WOULD_BLOCK)
    }

    fn channel_open(&mut self, session: &mut RusshSession) -> Result<RusshChannel, EngineCode> {
        let runtime = runtime()?;
        if let Some((handle, result)) = poll_task(&runtime, &mut session.open)? {
            session.handle = Some(handle);
            let channel = result.map_err(|err| engine_code(&err, EngineCode::CHANNEL_FAILURE))?;
            return Ok(RusshChannel {
                channel: Some(channel),
                ..RusshChannel::default()
            });
        }

        let handle = session.handle.take().ok_or(EngineCode::BAD_USE)?;
        session.open = Some(runtime.spawn(async move {
            let result = handle.channel_open_session().await;
            (handle, result)
        }));
        Err(EngineCode::WOULD_BLOCK)
    }

    fn channel_exec(&mut self, channel: &mut RusshChannel, command: &str) -> Result<(), EngineCode> {
        let runtime = runtime()?;
        if let Some((ch, result)) = poll_task(&runtime, &mut channel.exec)? {
            channel.channel = Some(ch);
            return result.map_err(|err| engine_code(&err, EngineCode::CHANNEL_REQUEST_DENIED));
        }

        let ch = channel.channel.take().ok_or(EngineCode::BAD_USE)?;
        let command = command.to_string();
        channel.exec = Some(runtime.spawn(async move {
            let result = ch.exec(true, command).await;
            (ch, result)
        }));
        Err(EngineCode::WOULD_BLOCK)
    }

    fn channel_read(&mut self, channel: &mut RusshChannel, buf: &mut [u8]) -> Result<usize, EngineCode> {
        let runtime = runtime()?;
        if let Some((ch, msg)) = poll_task(&runtime, &mut channel.wait)? {
            channel.channel = Some(ch);
            channel.accept(msg)?;
        }

        if !channel.buffered.is_empty() {
            let n = channel.buffered.len().min(buf.len());
            buf[..n].copy_from_slice(&channel.buffered[..n]);
            channel.buffered.drain(..n);
            return Ok(n);
        }
        if channel.eof {
            return Ok(0);
        }

        let mut ch = channel.channel.take().ok_or(EngineCode::BAD_USE)?;
        channel.wait = Some(runtime.spawn(async move {
            let msg = ch.wait().await;
            (ch, msg)
        }));
        Err(EngineCode::WOULD_BLOCK)
    }

    fn channel_close(&mut self, channel: &mut RusshChannel) -> Result<(), EngineCode> {
        let runtime = runtime()?;
        if let Some((ch, result)) = poll_task(&runtime, &mut channel.close)? {
            channel.channel = Some(ch);
            return result.map_err(|err| engine_code(&err, EngineCode::CHANNEL_CLOSED));
        }

        let ch = channel.channel.take().ok_or(EngineCode::CHANNEL_CLOSED)?;
        channel.close = Some(runtime.spawn(async move {
            let result = ch.close().await;
            (ch, result)
        }));
        Err(EngineCode::WOULD_BLOCK)
    }

    fn channel_free(&mut self, mut channel: RusshChannel) {
        let runtime = runtime().ok();
        let _guard = runtime.as_ref().map(RuntimeHandle::enter);
        channel.abort_pending();
        drop(channel);
    }

    fn session_disconnect(&mut self, session: &mut RusshSession, reason: &str) -> Result<(), EngineCode> {
        let runtime = runtime()?;
        if let Some((handle, result)) = poll_task(&runtime, &mut session.disconnect)? {
            session.handle = Some(handle);
            return result.map_err(|err| engine_code(&err, EngineCode::SOCKET_DISCONNECT));
        }

        let handle = session.handle.take().ok_or(EngineCode::SOCKET_DISCONNECT)?;
        let reason = reason.to_string();
        session.disconnect = Some(runtime.spawn(async move {
            let result = handle
                .disconnect(Disconnect::ByApplication, &reason, "en")
                .await;
            (handle, result)
        }));
        Err(EngineCode::WOULD_BLOCK)
    }

    fn session_free(&mut self, mut session: RusshSession) {
        let runtime = runtime().ok();
        let _guard = runtime.as_ref().map(RuntimeHandle::enter);
        session.abort_pending();
        drop(session);
    }
}
