//! Scheduler abstraction.
//!
//! The driver suspends only through [`Scheduler::yield_ms`] and measures
//! elapsed time only through [`Scheduler::now_ms`]. Two substrates are
//! provided:
//!
//! - [`Cooperative`]: blocks the single execution context with a busy-wait
//! - [`Preemptive`]: sleeps the calling thread for whole scheduler ticks,
//!   letting other tasks run
//!
//! [`Substrate`] wraps both and is what configuration selects. Tests inject
//! a virtual clock instead (see `test_utils::ManualScheduler`).

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default tick rate of the preemptive substrate.
pub const DEFAULT_TICK_RATE_HZ: u32 = 100;

/// Yield and clock capability.
///
/// Neither operation can fail.
pub trait Scheduler {
    /// Suspend the caller for at least `duration_ms` milliseconds.
    fn yield_ms(&self, duration_ms: u64);

    /// Monotonically non-decreasing millisecond counter.
    fn now_ms(&self) -> u64;
}

impl<S: Scheduler + ?Sized> Scheduler for &S {
    fn yield_ms(&self, duration_ms: u64) {
        (**self).yield_ms(duration_ms);
    }

    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

impl<S: Scheduler + ?Sized> Scheduler for Arc<S> {
    fn yield_ms(&self, duration_ms: u64) {
        (**self).yield_ms(duration_ms);
    }

    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

impl<S: Scheduler + ?Sized> Scheduler for Box<S> {
    fn yield_ms(&self, duration_ms: u64) {
        (**self).yield_ms(duration_ms);
    }

    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// Single-context substrate: yielding spins until the clock has advanced.
#[derive(Debug, Clone, Copy)]
pub struct Cooperative {
    epoch: Instant,
}

impl Default for Cooperative {
    fn default() -> Self {
        Self::new()
    }
}

impl Cooperative {
    /// Create a cooperative scheduler whose clock starts now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Scheduler for Cooperative {
    fn yield_ms(&self, duration_ms: u64) {
        let start = Instant::now();
        let wait = Duration::from_millis(duration_ms);
        while start.elapsed() < wait {
            std::hint::spin_loop();
        }
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}

/// Tick-based substrate: yielding sleeps the thread for whole ticks.
#[derive(Debug, Clone, Copy)]
pub struct Preemptive {
    tick_rate_hz: u32,
    epoch: Instant,
}

impl Default for Preemptive {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_RATE_HZ)
    }
}

impl Preemptive {
    /// Create a preemptive scheduler. A zero tick rate uses the default.
    #[must_use]
    pub fn new(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz: if tick_rate_hz == 0 {
                DEFAULT_TICK_RATE_HZ
            } else {
                tick_rate_hz
            },
            epoch: Instant::now(),
        }
    }

    /// Ticks per second.
    #[must_use]
    pub const fn tick_rate_hz(&self) -> u32 {
        self.tick_rate_hz
    }

    /// Convert milliseconds to ticks, rounding up. Saturates at `u64::MAX`.
    #[must_use]
    pub const fn ms_to_ticks(&self, duration_ms: u64) -> u64 {
        duration_ms.saturating_mul(self.tick_rate_hz as u64).div_ceil(1000)
    }

    /// Length of `ticks` scheduler ticks. Saturates.
    #[must_use]
    pub const fn ticks_to_duration(&self, ticks: u64) -> Duration {
        Duration::from_micros(ticks.saturating_mul(1_000_000) / self.tick_rate_hz as u64)
    }
}

impl Scheduler for Preemptive {
    fn yield_ms(&self, duration_ms: u64) {
        let ticks = self.ms_to_ticks(duration_ms);
        if ticks == 0 {
            thread::yield_now();
        } else {
            thread::sleep(self.ticks_to_duration(ticks));
        }
    }

    fn now_ms(&self) -> u64 {
        (self.epoch.elapsed().as_micros() / 1000) as u64
    }
}

/// Which substrate to run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerKind {
    /// Busy-wait yield in a single context.
    Cooperative,
    /// Tick-based thread sleep.
    Preemptive,
}

impl Default for SchedulerKind {
    fn default() -> Self {
        Self::from_build()
    }
}

impl SchedulerKind {
    /// The substrate selected at build time by the `preemptive` feature.
    #[must_use]
    pub const fn from_build() -> Self {
        if cfg!(feature = "preemptive") {
            Self::Preemptive
        } else {
            Self::Cooperative
        }
    }

    /// The substrate's name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cooperative => "cooperative",
            Self::Preemptive => "preemptive",
        }
    }
}

impl fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchedulerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cooperative" | "coop" => Ok(Self::Cooperative),
            "preemptive" | "rtos" => Ok(Self::Preemptive),
            other => Err(format!("unknown scheduler substrate: {other}")),
        }
    }
}

/// Either substrate, chosen at runtime.
#[derive(Debug, Clone, Copy)]
pub enum Substrate {
    /// See [`Cooperative`].
    Cooperative(Cooperative),
    /// See [`Preemptive`].
    Preemptive(Preemptive),
}

impl Default for Substrate {
    fn default() -> Self {
        Self::from_build()
    }
}

impl Substrate {
    /// The substrate selected at build time.
    #[must_use]
    pub fn from_build() -> Self {
        Self::from_kind(SchedulerKind::from_build())
    }

    /// Create a substrate of the given kind with default parameters.
    #[must_use]
    pub fn from_kind(kind: SchedulerKind) -> Self {
        match kind {
            SchedulerKind::Cooperative => Self::Cooperative(Cooperative::new()),
            SchedulerKind::Preemptive => Self::Preemptive(Preemptive::default()),
        }
    }

    /// The kind of this substrate.
    #[must_use]
    pub const fn kind(&self) -> SchedulerKind {
        match self {
            Self::Cooperative(_) => SchedulerKind::Cooperative,
            Self::Preemptive(_) => SchedulerKind::Preemptive,
        }
    }
}

impl Scheduler for Substrate {
    fn yield_ms(&self, duration_ms: u64) {
        match self {
            Self::Cooperative(s) => s.yield_ms(duration_ms),
            Self::Preemptive(s) => s.yield_ms(duration_ms),
        }
    }

    fn now_ms(&self) -> u64 {
        match self {
            Self::Cooperative(s) => s.now_ms(),
            Self::Preemptive(s) => s.now_ms(),
        }
    }
}
