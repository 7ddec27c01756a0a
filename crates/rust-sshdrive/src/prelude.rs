//! Convenient re-exports for common rust-sshdrive usage.
//!
//! ```ignore
//! use rust_sshdrive::prelude::*;
//! ```

// Configuration
pub use crate::config::{ClientConfig, Credentials};

// Error handling
pub use crate::error::{DriveError, Result};

// Engine seam
pub use crate::engine::{EngineCode, SshEngine, Transport};

// Driving
pub use crate::driver::{CancelToken, Driver};
pub use crate::retry::RetryLimit;
pub use crate::scheduler::{Cooperative, Preemptive, Scheduler, SchedulerKind, Substrate};

// Lifecycle
pub use crate::library::LibraryState;
pub use crate::session::{Client, Session};
pub use crate::types::{CommandOutput, SessionState, Step};
