//! Process-wide engine initialisation state.
//!
//! SSH engines usually carry global state of their own (crypto backends,
//! allocators) that must be set up once before any session exists and torn
//! down once at the end. [`LibraryState`] tracks that with a single flag.
//! Both transitions happen under a mutex, so concurrent callers never run
//! the engine's initialiser twice.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::engine::SshEngine;
use crate::error::{DriveError, Result};

static GLOBAL: LibraryState = LibraryState::new();

/// The init/cleanup flag guarding an engine's global state.
#[derive(Debug, Default)]
pub struct LibraryState {
    initialized: Mutex<bool>,
}

impl LibraryState {
    /// Create an uninitialised state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            initialized: Mutex::new(false),
        }
    }

    /// The process-wide instance.
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Initialise the engine unless already done.
    ///
    /// Calling this again after success returns `Ok` without touching the
    /// engine. If the engine's initialiser fails the flag stays clear.
    pub fn init<E: SshEngine>(&self, engine: &mut E) -> Result<()> {
        let mut initialized = self.lock();
        if *initialized {
            tracing::debug!("Engine library already initialised");
            return Ok(());
        }

        engine.init().map_err(|code| {
            tracing::error!(code = %code, "Engine library initialisation failed");
            DriveError::Init { code }
        })?;
        *initialized = true;

        tracing::info!(
            version = crate::VERSION,
            framework = crate::FRAMEWORK,
            "Engine library initialised"
        );
        Ok(())
    }

    /// Tear the engine down if it was initialised.
    pub fn cleanup<E: SshEngine>(&self, engine: &mut E) {
        let mut initialized = self.lock();
        if !*initialized {
            return;
        }
        engine.exit();
        *initialized = false;
        tracing::info!("Engine library cleaned up");
    }

    /// Check whether the engine is initialised.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.initialized
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Initialise `engine` through the process-wide state.
pub fn init<E: SshEngine>(engine: &mut E) -> Result<()> {
    LibraryState::global().init(engine)
}

/// Clean `engine` up through the process-wide state.
pub fn cleanup<E: SshEngine>(engine: &mut E) {
    LibraryState::global().cleanup(engine);
}

/// Check the process-wide state.
#[must_use]
pub fn is_initialized() -> bool {
    LibraryState::global().is_initialized()
}
