//! Environment-based configuration.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use rust_netsock::TimeoutPolicy;

use super::{ClientConfig, Credentials};
use crate::error::{DriveError, Result};
use crate::scheduler::SchedulerKind;

/// Environment configuration prefix.
pub const DEFAULT_PREFIX: &str = "SSHDRIVE";

/// Variable names read by [`EnvConfig::client_config`].
pub mod vars {
    /// Host to connect to.
    pub const HOST: &str = "HOST";
    /// Port.
    pub const PORT: &str = "PORT";
    /// Username.
    pub const USER: &str = "USER";
    /// Password.
    pub const PASSWORD: &str = "PASSWORD";
    /// Poll interval in milliseconds.
    pub const POLL_INTERVAL_MS: &str = "POLL_INTERVAL_MS";
    /// Connect timeout in milliseconds.
    pub const CONNECT_TIMEOUT_MS: &str = "CONNECT_TIMEOUT_MS";
    /// Socket send/receive timeout in milliseconds.
    pub const IO_TIMEOUT_MS: &str = "IO_TIMEOUT_MS";
    /// Retry time limit in milliseconds.
    pub const MAX_WAIT_MS: &str = "MAX_WAIT_MS";
    /// Retry invocation limit.
    pub const MAX_ATTEMPTS: &str = "MAX_ATTEMPTS";
    /// Read buffer size in bytes.
    pub const READ_BUFFER: &str = "READ_BUFFER";
    /// Scheduler substrate (`cooperative` or `preemptive`).
    pub const SUBSTRATE: &str = "SUBSTRATE";
}

/// Environment variable reader.
///
/// Values set with [`EnvConfig::set`] shadow the process environment for
/// this reader only.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Prefix for environment variables.
    prefix: String,
    /// Values that shadow the process environment.
    overrides: HashMap<String, String>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl EnvConfig {
    /// Create a new environment config reader.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            overrides: HashMap::new(),
        }
    }

    /// Build the full environment variable name.
    fn var_name(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_uppercase()
        } else {
            format!("{}_{}", self.prefix, name.to_uppercase())
        }
    }

    /// Get a string value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        let var_name = self.var_name(name);
        self.overrides
            .get(&var_name)
            .cloned()
            .or_else(|| std::env::var(&var_name).ok())
    }

    /// Get a parsed value, failing on malformed input.
    pub fn parse<T>(&self, name: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(name)
            .map(|raw| {
                raw.trim().parse().map_err(|e| {
                    DriveError::config(format!("{}={raw:?}: {e}", self.var_name(name)))
                })
            })
            .transpose()
    }

    /// Get a duration in milliseconds.
    pub fn duration_millis(&self, name: &str) -> Result<Option<Duration>> {
        Ok(self.parse::<u64>(name)?.map(Duration::from_millis))
    }

    /// Check if a variable is set.
    #[must_use]
    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Set a value for this reader.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let var_name = self.var_name(name);
        self.overrides.insert(var_name, value.into());
    }

    /// Remove a value set with [`set`](Self::set).
    pub fn unset(&mut self, name: &str) {
        let var_name = self.var_name(name);
        self.overrides.remove(&var_name);
    }

    /// Apply every variable that is set on top of `base`.
    pub fn apply(&self, base: ClientConfig) -> Result<ClientConfig> {
        let mut config = base;

        if let Some(host) = self.get(vars::HOST) {
            config.host = host;
        }
        if let Some(port) = self.parse(vars::PORT)? {
            config.port = port;
        }
        if let Some(username) = self.get(vars::USER) {
            config.credentials.username = username;
        }
        if let Some(password) = self.get(vars::PASSWORD) {
            config.credentials.password = password;
        }
        if let Some(interval) = self.duration_millis(vars::POLL_INTERVAL_MS)? {
            config.poll_interval = interval;
        }

        let connect = self.duration_millis(vars::CONNECT_TIMEOUT_MS)?;
        let io = self.duration_millis(vars::IO_TIMEOUT_MS)?;
        if connect.is_some() || io.is_some() {
            config.timeouts = TimeoutPolicy::new(
                connect.unwrap_or_else(|| config.timeouts.connect()),
                io.unwrap_or_else(|| config.timeouts.io()),
            );
        }

        if let Some(max_wait) = self.duration_millis(vars::MAX_WAIT_MS)? {
            config.retry = config.retry.with_max_wait(max_wait);
        }
        if let Some(max_attempts) = self.parse(vars::MAX_ATTEMPTS)? {
            config.retry = config.retry.with_max_attempts(max_attempts);
        }
        if let Some(size) = self.parse(vars::READ_BUFFER)? {
            config.read_buffer = size;
        }
        if let Some(kind) = self.parse::<SchedulerKind>(vars::SUBSTRATE)? {
            config.scheduler = kind;
        }

        Ok(config)
    }

    /// Build a client config from defaults and the environment.
    pub fn client_config(&self) -> Result<ClientConfig> {
        self.apply(ClientConfig::default())
    }

    /// Read only the credentials.
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        Some(Credentials::new(
            self.get(vars::USER)?,
            self.get(vars::PASSWORD).unwrap_or_default(),
        ))
    }
}
