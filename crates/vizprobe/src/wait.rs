//! Wait Mechanisms
//!
//! One polling primitive for every "wait until the page shows X" in a test.
//!
//! - A condition that already holds returns without sleeping.
//! - Otherwise the condition is re-checked every poll interval, never faster
//!   than [`MIN_POLL_INTERVAL_MS`], and one last time at the deadline.
//! - Expiry is reported as [`HarnessError::Timeout`] naming the condition.
//!   There is no retry with backoff.

use crate::result::{HarnessError, HarnessResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Default timeout for wait operations (5 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 5_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Floor for the polling interval; faster polling starves the page's event loop
pub const MIN_POLL_INTERVAL_MS: u64 = 10;

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Effective poll interval, clamped to the minimum
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }
}

/// Result of a successful wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitResult {
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of times the condition was evaluated
    pub checks: u32,
    /// Description of what was waited for
    pub waited_for: String,
}

/// Deadline-bounded ticker shared by waits and actionability checks
#[derive(Debug)]
pub struct Poller {
    started: Instant,
    deadline: Instant,
    interval: Duration,
    ticks: u32,
}

impl Poller {
    /// Start polling now
    #[must_use]
    pub fn new(options: &WaitOptions) -> Self {
        let started = Instant::now();
        Self {
            started,
            deadline: started + options.timeout(),
            interval: options.poll_interval(),
            ticks: 0,
        }
    }

    /// Sleep until the next check. Returns `false` once the deadline has passed.
    pub async fn tick(&mut self) -> bool {
        let now = Instant::now();
        if now >= self.deadline {
            return false;
        }
        let remaining = self.deadline - now;
        tokio::time::sleep(self.interval.min(remaining)).await;
        self.ticks += 1;
        true
    }

    /// Time since polling started
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Number of sleeps so far
    #[must_use]
    pub const fn ticks(&self) -> u32 {
        self.ticks
    }
}

/// Poll `check` until it yields `true` or the timeout expires.
///
/// Errors returned by `check` abort the wait immediately.
pub async fn wait_for<F, Fut>(
    description: &str,
    options: &WaitOptions,
    mut check: F,
) -> HarnessResult<WaitResult>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = HarnessResult<bool>>,
{
    let mut poller = Poller::new(options);
    loop {
        if check().await? {
            return Ok(WaitResult {
                elapsed: poller.elapsed(),
                checks: poller.ticks() + 1,
                waited_for: description.to_string(),
            });
        }
        if !poller.tick().await {
            return Err(HarnessError::Timeout {
                condition: description.to_string(),
                timeout_ms: options.timeout_ms,
            });
        }
    }
}
