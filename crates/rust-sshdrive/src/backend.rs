//! Engine backends.
//!
//! The orchestrator only needs an [`SshEngine`](crate::engine::SshEngine).
//! The `ssh` feature provides one built on russh; tests use the scripted
//! engine in [`mock`](crate::mock).

#[cfg(feature = "ssh")]
pub mod ssh;

#[cfg(feature = "ssh")]
pub use ssh::{HostKeyPolicy, RusshEngine};
