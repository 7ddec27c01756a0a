//! The non-blocking protocol driver.
//!
//! Every engine primitive is driven through the same loop: call it, and if
//! it returns the would-block sentinel, yield for the poll interval and
//! call it again unchanged. Success is returned as is; any other code is
//! returned immediately as [`DriveError::Terminal`] without yielding.
//!
//! [`Driver::drain`] is the read variant. It forwards each chunk to a sink
//! as it arrives and treats end of stream, or any non-would-block code, as
//! the normal end of the loop.
//!
//! # Example
//!
//! ```
//! use rust_sshdrive::driver::Driver;
//! use rust_sshdrive::engine::EngineCode;
//! use rust_sshdrive::scheduler::Cooperative;
//! use rust_sshdrive::types::Step;
//!
//! let driver = Driver::new(Cooperative::new());
//! let mut pending = 2;
//! let value = driver.drive(Step::Handshake, || {
//!     if pending > 0 {
//!         pending -= 1;
//!         Err(EngineCode::WOULD_BLOCK)
//!     } else {
//!         Ok(42)
//!     }
//! })?;
//! assert_eq!(value, 42);
//! # Ok::<(), rust_sshdrive::DriveError>(())
//! ```

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::engine::EngineCode;
use crate::error::{DriveError, Result};
use crate::retry::{RetryLimit, RetryState};
use crate::scheduler::Scheduler;
use crate::types::Step;

/// Default delay between retries of a blocked primitive.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Shared flag that aborts a retry loop at its next yield.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create an unset token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Check whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Retry-until-ready loop over a [`Scheduler`].
#[derive(Debug, Clone)]
pub struct Driver<S> {
    scheduler: S,
    poll_interval: Duration,
    limit: RetryLimit,
    cancel: Option<CancelToken>,
}

impl<S: Scheduler> Driver<S> {
    /// Create a driver with the default poll interval and no retry limit.
    #[must_use]
    pub const fn new(scheduler: S) -> Self {
        Self {
            scheduler,
            poll_interval: DEFAULT_POLL_INTERVAL,
            limit: RetryLimit::unbounded(),
            cancel: None,
        }
    }

    /// Set the poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the retry limit.
    #[must_use]
    pub const fn with_limit(mut self, limit: RetryLimit) -> Self {
        self.limit = limit;
        self
    }

    /// Attach a cancellation token.
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// The poll interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// The retry limit.
    #[must_use]
    pub const fn limit(&self) -> RetryLimit {
        self.limit
    }

    /// Drive `primitive` until it completes or fails.
    ///
    /// A primitive that blocks N times and then succeeds costs exactly N
    /// yields. A primitive that fails on its first call costs none.
    pub fn drive<T, F>(&self, step: Step, primitive: F) -> Result<T>
    where
        F: FnMut() -> std::result::Result<T, EngineCode>,
    {
        self.drive_with_limit(step, self.limit, primitive)
    }

    /// Like [`drive`](Self::drive) with an explicit retry limit.
    pub fn drive_with_limit<T, F>(&self, step: Step, limit: RetryLimit, mut primitive: F) -> Result<T>
    where
        F: FnMut() -> std::result::Result<T, EngineCode>,
    {
        let mut retry = RetryState::new(limit, self.scheduler.now_ms());
        loop {
            retry.record_attempt();
            match primitive() {
                Ok(value) => {
                    tracing::trace!(step = %step, attempts = retry.attempts(), "Step complete");
                    return Ok(value);
                }
                Err(code) if code.is_would_block() => self.wait(step, &retry)?,
                Err(code) => {
                    tracing::debug!(step = %step, code = %code, "Step failed");
                    return Err(DriveError::terminal(step, code));
                }
            }
        }
    }

    /// Read until end of stream, forwarding each chunk to `sink`.
    ///
    /// `read` fills the buffer it is given and returns the byte count;
    /// `Ok(0)` is end of stream. Any code other than would-block also ends
    /// the loop normally. The retry limit applies to consecutive
    /// would-blocks and restarts whenever bytes arrive.
    ///
    /// Returns the number of bytes forwarded.
    pub fn drain<F, W>(&self, step: Step, mut read: F, buffer_size: usize, sink: &mut W) -> Result<u64>
    where
        F: FnMut(&mut [u8]) -> std::result::Result<usize, EngineCode>,
        W: Write + ?Sized,
    {
        let mut buffer = vec![0u8; buffer_size.max(1)];
        let mut total: u64 = 0;
        let mut retry = RetryState::new(self.limit, self.scheduler.now_ms());

        loop {
            retry.record_attempt();
            match read(&mut buffer) {
                Ok(0) => {
                    tracing::debug!(step = %step, bytes = total, "End of stream");
                    break;
                }
                Ok(n) => {
                    let n = n.min(buffer.len());
                    sink.write_all(&buffer[..n]).map_err(DriveError::Output)?;
                    total += n as u64;
                    retry.reset(self.scheduler.now_ms());
                }
                Err(code) if code.is_would_block() => self.wait(step, &retry)?,
                Err(code) => {
                    tracing::debug!(step = %step, code = %code, bytes = total, "Read ended");
                    break;
                }
            }
        }

        sink.flush().map_err(DriveError::Output)?;
        Ok(total)
    }

    /// Yield once after a would-block, unless the budget is spent or the
    /// loop was cancelled.
    fn wait(&self, step: Step, retry: &RetryState) -> Result<()> {
        let now = self.scheduler.now_ms();
        if !retry.should_retry(now) {
            let elapsed = retry.elapsed(now);
            tracing::warn!(
                step = %step,
                attempts = retry.attempts(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Retry limit reached"
            );
            return Err(DriveError::Timeout {
                step,
                elapsed,
                attempts: retry.attempts(),
            });
        }
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            tracing::debug!(step = %step, "Cancelled");
            return Err(DriveError::Cancelled { step });
        }
        tracing::trace!(step = %step, attempt = retry.attempts(), "Would block, yielding");
        self.scheduler.yield_ms(self.poll_interval.as_millis() as u64);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::test_utils::ManualScheduler;

    fn blocking_then<T: Clone>(
        blocks: usize,
        result: std::result::Result<T, EngineCode>,
    ) -> impl FnMut() -> std::result::Result<T, EngineCode> {
        let mut remaining = blocks;
        move || {
            if remaining > 0 {
                remaining -= 1;
                Err(EngineCode::WOULD_BLOCK)
            } else {
                result.clone()
            }
        }
    }

    #[test]
    fn n_would_blocks_cost_n_yields() {
        for n in [0, 1, 2, 7, 50] {
            let clock = ManualScheduler::new();
            let driver = Driver::new(&clock);

            let value = driver.drive(Step::Handshake, blocking_then(n, Ok("done"))).unwrap();

            assert_eq!(value, "done");
            assert_eq!(clock.yield_count(), n);
            assert!(clock.yields().iter().all(|&ms| ms == 10));
        }
    }

    #[test]
    fn terminal_error_costs_no_yield() {
        let clock = ManualScheduler::new();
        let driver = Driver::new(&clock);

        let err = driver
            .drive(Step::Authenticate, blocking_then::<()>(0, Err(EngineCode::AUTHENTICATION_FAILED)))
            .unwrap_err();

        assert!(matches!(
            err,
            DriveError::Terminal { step: Step::Authenticate, code } if code == EngineCode::AUTHENTICATION_FAILED
        ));
        assert_eq!(clock.yield_count(), 0);
    }

    #[test]
    fn poll_interval_is_fixed() {
        let clock = ManualScheduler::new();
        let driver = Driver::new(&clock).with_poll_interval(Duration::from_millis(25));

        driver.drive(Step::Exec, blocking_then(4, Ok(()))).unwrap();

        assert_eq!(clock.yields(), vec![25, 25, 25, 25]);
        assert_eq!(clock.now_ms(), 100);
    }

    #[test]
    fn attempt_limit_times_out() {
        let clock = ManualScheduler::new();
        let driver = Driver::new(&clock).with_limit(RetryLimit::attempts(3));

        let err = driver
            .drive(Step::ChannelOpen, || Err::<(), _>(EngineCode::WOULD_BLOCK))
            .unwrap_err();

        match err {
            DriveError::Timeout { step, attempts, .. } => {
                assert_eq!(step, Step::ChannelOpen);
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(clock.yield_count(), 2);
    }

    #[test]
    fn wait_limit_times_out() {
        let clock = ManualScheduler::new();
        let driver = Driver::new(&clock).with_limit(RetryLimit::wait(Duration::from_millis(50)));

        let err = driver
            .drive(Step::Handshake, || Err::<(), _>(EngineCode::WOULD_BLOCK))
            .unwrap_err();

        match err {
            DriveError::Timeout { elapsed, attempts, .. } => {
                assert_eq!(elapsed, Duration::from_millis(50));
                assert_eq!(attempts, 6);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(clock.yield_count(), 5);
    }

    #[test]
    fn completion_within_limit() {
        let clock = ManualScheduler::new();
        let driver = Driver::new(&clock).with_limit(RetryLimit::attempts(3));

        driver.drive(Step::Handshake, blocking_then(2, Ok(()))).unwrap();
        assert_eq!(clock.yield_count(), 2);
    }

    #[test]
    fn cancellation_stops_at_next_yield() {
        let clock = ManualScheduler::new();
        let token = CancelToken::new();
        let driver = Driver::new(&clock).with_cancel_token(token.clone());

        let mut calls = 0;
        let err = driver
            .drive(Step::Handshake, || {
                calls += 1;
                if calls == 3 {
                    token.cancel();
                }
                Err::<(), _>(EngineCode::WOULD_BLOCK)
            })
            .unwrap_err();

        assert!(matches!(err, DriveError::Cancelled { step: Step::Handshake }));
        assert_eq!(calls, 3);
        assert_eq!(clock.yield_count(), 2);
    }

    /// Scripted reader: each entry is one `read` result.
    fn reader(
        script: Vec<std::result::Result<&'static str, EngineCode>>,
    ) -> impl FnMut(&mut [u8]) -> std::result::Result<usize, EngineCode> {
        let mut script = script.into_iter();
        move |buf| match script.next() {
            Some(Ok(text)) => {
                buf[..text.len()].copy_from_slice(text.as_bytes());
                Ok(text.len())
            }
            Some(Err(code)) => Err(code),
            None => Ok(0),
        }
    }

    #[test]
    fn drain_forwards_incrementally() {
        let clock = ManualScheduler::new();
        let driver = Driver::new(&clock);
        let mut out: Vec<u8> = Vec::new();

        let total = driver
            .drain(
                Step::Read,
                reader(vec![
                    Ok("hel"),
                    Err(EngineCode::WOULD_BLOCK),
                    Ok("lo\n"),
                    Err(EngineCode::WOULD_BLOCK),
                    Err(EngineCode::WOULD_BLOCK),
                ]),
                1024,
                &mut out,
            )
            .unwrap();

        assert_eq!(out, b"hello\n");
        assert_eq!(total, 6);
        assert_eq!(clock.yield_count(), 3);
    }

    #[test]
    fn drain_stops_on_negative_code() {
        let clock = ManualScheduler::new();
        let driver = Driver::new(&clock);
        let mut out: Vec<u8> = Vec::new();

        let total = driver
            .drain(
                Step::Read,
                reader(vec![Ok("partial"), Err(EngineCode::CHANNEL_CLOSED), Ok("never")]),
                64,
                &mut out,
            )
            .unwrap();

        assert_eq!(out, b"partial");
        assert_eq!(total, 7);
    }

    #[test]
    fn drain_budget_resets_on_progress() {
        let clock = ManualScheduler::new();
        let driver = Driver::new(&clock).with_limit(RetryLimit::attempts(3));
        let wb = Err(EngineCode::WOULD_BLOCK);
        let mut out: Vec<u8> = Vec::new();

        driver
            .drain(
                Step::Read,
                reader(vec![wb, wb, Ok("a"), wb, wb, Ok("b")]),
                16,
                &mut out,
            )
            .unwrap();
        assert_eq!(out, b"ab");

        let err = driver
            .drain(Step::Read, reader(vec![Ok("c"), wb, wb, wb, wb]), 16, &mut out)
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(out, b"abc");
    }

    struct BrokenSink;

    impl Write for BrokenSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn drain_reports_sink_failure() {
        let clock = ManualScheduler::new();
        let driver = Driver::new(&clock);

        let err = driver
            .drain(Step::Read, reader(vec![Ok("data")]), 16, &mut BrokenSink)
            .unwrap_err();
        assert!(matches!(err, DriveError::Output(_)));
    }

    #[test]
    fn drain_small_buffer_chunks() {
        let clock = ManualScheduler::new();
        let driver = Driver::new(&clock);
        let mut source: &[u8] = b"abcdefgh";
        let mut out: Vec<u8> = Vec::new();

        let total = driver
            .drain(
                Step::Read,
                |buf: &mut [u8]| {
                    assert_eq!(buf.len(), 3);
                    let n = source.len().min(buf.len());
                    buf[..n].copy_from_slice(&source[..n]);
                    source = &source[n..];
                    Ok(n)
                },
                3,
                &mut out,
            )
            .unwrap();

        assert_eq!(total, 8);
        assert_eq!(out, b"abcdefgh");
    }
}
