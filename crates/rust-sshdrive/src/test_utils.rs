//! Test utilities for rust-sshdrive.
//!
//! Driver and session tests run against a virtual clock so that no real
//! time passes.

mod clock;

pub use clock::ManualScheduler;
