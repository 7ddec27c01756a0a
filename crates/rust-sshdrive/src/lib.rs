//! rust-sshdrive: drive a non-blocking SSH engine to completion.
//!
//! An SSH engine exposes non-blocking primitives that either finish, fail,
//! or report "would block". This crate supplies everything around them:
//! a socket to run on (via `rust-netsock`), a retry loop that yields to
//! the scheduler between attempts, and a lifecycle that releases every
//! handle exactly once on every path.
//!
//! # Features
//!
//! - **Two scheduling substrates**: cooperative busy-wait or preemptive
//!   tick-based sleep, selected at build time (feature: `preemptive`) or
//!   injected
//! - **Opt-in retry budgets** by attempt count or elapsed time, plus
//!   cancellation
//! - **russh backend** for real servers (feature: `ssh`)
//! - **Mock backend** for testing (feature: `mock`)
//!
//! # Example
//!
//! ```ignore
//! use rust_sshdrive::prelude::*;
//! use rust_sshdrive::backend::RusshEngine;
//!
//! fn main() -> Result<()> {
//!     let config = ClientConfig::new("test.rebex.net")
//!         .credentials(Credentials::new("demo", "password"));
//!     let engine = RusshEngine::new().with_host(&config.host, config.port);
//!     let mut client = Client::from_config(engine, &config, LibraryState::global());
//!     client.init()?;
//!     client.run_commands(&config.host, config.port.into(), &config.credentials, ["pwd"], &mut std::io::stdout())?;
//!     client.cleanup();
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod library;
pub mod prelude;
pub mod retry;
pub mod scheduler;
pub mod session;
pub mod types;

/// Scripted engine and transport for testing.
#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Scheduling substrate selected at build time.
pub const FRAMEWORK: &str = if cfg!(feature = "preemptive") {
    "preemptive"
} else {
    "cooperative"
};

/// Name of the scheduling substrate this build was compiled for.
#[must_use]
pub const fn framework_identity() -> &'static str {
    FRAMEWORK
}

pub use config::{ClientConfig, Credentials};
pub use driver::{CancelToken, DEFAULT_POLL_INTERVAL, Driver};
pub use engine::{EngineCode, SshEngine, Transport};
pub use error::{DriveError, Result};
pub use library::{LibraryState, cleanup, init, is_initialized};
pub use retry::RetryLimit;
pub use rust_netsock::{
    ConnectError, Connector, Socket, TimeoutPolicy, close_socket, connect,
};
pub use scheduler::{Cooperative, Preemptive, Scheduler, SchedulerKind, Substrate};
pub use session::{Client, Session};
pub use types::{CommandOutput, SessionState, Step};

#[cfg(any(test, feature = "test-utils"))]
pub use test_utils::ManualScheduler;
