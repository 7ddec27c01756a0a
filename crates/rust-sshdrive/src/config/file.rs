//! File-based configuration loading.
//!
//! ```toml
//! host = "test.rebex.net"
//! port = 22
//! user = "demo"
//! password = "password"
//! substrate = "cooperative"
//!
//! [timeouts]
//! connect_ms = 30000
//! io_ms = 10000
//!
//! [driver]
//! poll_interval_ms = 10
//! max_attempts = 3000
//! max_wait_ms = 60000
//! read_buffer = 1024
//! disconnect_attempts = 50
//! ```
//!
//! Every key is optional; missing keys keep their defaults.

use std::path::Path;
use std::time::Duration;

use rust_netsock::TimeoutPolicy;
use serde::Deserialize;

use super::ClientConfig;
use crate::error::{DriveError, Result};
use crate::scheduler::SchedulerKind;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    host: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    password: Option<String>,
    substrate: Option<SchedulerKind>,
    timeouts: TimeoutSection,
    driver: DriverSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TimeoutSection {
    connect_ms: Option<u64>,
    io_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DriverSection {
    poll_interval_ms: Option<u64>,
    max_attempts: Option<u32>,
    max_wait_ms: Option<u64>,
    read_buffer: Option<usize>,
    disconnect_attempts: Option<u32>,
}

impl ConfigFile {
    fn apply(self, base: ClientConfig) -> ClientConfig {
        let mut config = base;
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(user) = self.user {
            config.credentials.username = user;
        }
        if let Some(password) = self.password {
            config.credentials.password = password;
        }
        if let Some(kind) = self.substrate {
            config.scheduler = kind;
        }

        config.timeouts = TimeoutPolicy::new(
            self.timeouts
                .connect_ms
                .map_or(config.timeouts.connect(), Duration::from_millis),
            self.timeouts
                .io_ms
                .map_or(config.timeouts.io(), Duration::from_millis),
        );

        let driver = self.driver;
        if let Some(ms) = driver.poll_interval_ms {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(max) = driver.max_attempts {
            config.retry = config.retry.with_max_attempts(max);
        }
        if let Some(ms) = driver.max_wait_ms {
            config.retry = config.retry.with_max_wait(Duration::from_millis(ms));
        }
        if let Some(size) = driver.read_buffer {
            config.read_buffer = size;
        }
        if let Some(attempts) = driver.disconnect_attempts {
            config.disconnect_attempts = attempts;
        }
        config
    }
}

/// Parse a TOML document on top of the defaults.
pub fn parse_config(content: &str) -> Result<ClientConfig> {
    parse_config_over(content, ClientConfig::default())
}

/// Parse a TOML document on top of `base`.
pub fn parse_config_over(content: &str, base: ClientConfig) -> Result<ClientConfig> {
    let file: ConfigFile =
        toml::from_str(content).map_err(|e| DriveError::config(format!("invalid TOML: {e}")))?;
    Ok(file.apply(base))
}

/// Load a TOML config file.
pub fn load_config(path: &Path) -> Result<ClientConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        DriveError::config(format!("failed to read {}: {e}", path.display()))
    })?;
    tracing::debug!(path = %path.display(), "Loading config file");
    parse_config(&content)
}
