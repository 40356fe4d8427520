//! Polling primitives.
//!
//! Every wait in the harness is a fixed-interval poll bounded by a timeout.
//! There is no backoff: a check runs, and if it does not hold the loop sleeps
//! for the interval and tries again until the deadline passes.

use std::fmt::{Debug, Display};
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep, Instant};
use tracing::trace;

/// Default polling interval.
pub const POLLING: Duration = Duration::from_millis(250);

/// Polling interval for slow conditions.
pub const POLLING_LONG: Duration = Duration::from_secs(1);

/// Default timeout for a single wait.
pub const TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Timeout for waits that involve reboots, image pulls, or builds.
pub const LONG_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Timeout and interval for one poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub timeout: Duration,
    pub interval: Duration,
}

impl PollConfig {
    pub const fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// `LONG_TIMEOUT` polled every `POLLING_LONG`.
    pub const fn slow() -> Self {
        Self::new(LONG_TIMEOUT, POLLING_LONG)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::new(TIMEOUT, POLLING)
    }
}

/// Errors returned by the poll loops.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PollError {
    /// The condition never held before the timeout.
    #[error("condition not met within {elapsed:?}: {last}")]
    Timeout { elapsed: Duration, last: String },

    /// A condition that had to keep holding stopped holding.
    #[error("condition stopped holding after {elapsed:?} ({attempts} checks): {reason}")]
    Failed {
        elapsed: Duration,
        attempts: u32,
        reason: String,
    },
}

const NOT_MET: &str = "condition not met";

/// Poll `check` until it yields `Some`.
///
/// `Ok(None)` and `Err(_)` both mean "not yet"; the most recent error is kept
/// so a timeout reports why the last attempt failed.
pub async fn eventually<T, E, F, Fut>(config: PollConfig, mut check: F) -> Result<T, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
    E: Display,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let last = match check().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => NOT_MET.to_string(),
            Err(e) => e.to_string(),
        };

        let elapsed = start.elapsed();
        if elapsed >= config.timeout {
            return Err(PollError::Timeout { elapsed, last });
        }

        trace!(attempts, last = %last, "poll condition not met yet");
        sleep(config.interval.min(config.timeout - elapsed)).await;
    }
}

/// Poll until `produce` returns a value equal to `expected`.
pub async fn eventually_eq<T, E, F, Fut>(
    config: PollConfig,
    expected: T,
    mut produce: F,
) -> Result<T, PollError>
where
    T: PartialEq + Debug,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let start = Instant::now();

    loop {
        let last = match produce().await {
            Ok(value) if value == expected => return Ok(value),
            Ok(value) => format!("expected {expected:?}, got {value:?}"),
            Err(e) => e.to_string(),
        };

        let elapsed = start.elapsed();
        if elapsed >= config.timeout {
            return Err(PollError::Timeout { elapsed, last });
        }
        sleep(config.interval.min(config.timeout - elapsed)).await;
    }
}

/// `eventually` with `LONG_TIMEOUT` and `POLLING_LONG`.
pub async fn eventually_slow<T, E, F, Fut>(check: F) -> Result<T, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
    E: Display,
{
    eventually(PollConfig::slow(), check).await
}

/// Require `check` to hold on every poll for the whole `config.timeout`.
pub async fn consistently<E, F, Fut>(config: PollConfig, mut check: F) -> Result<(), PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: Display,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let reason = match check().await {
            Ok(true) => None,
            Ok(false) => Some("condition did not hold".to_string()),
            Err(e) => Some(e.to_string()),
        };
        if let Some(reason) = reason {
            return Err(PollError::Failed {
                elapsed: start.elapsed(),
                attempts,
                reason,
            });
        }

        let elapsed = start.elapsed();
        if elapsed >= config.timeout {
            return Ok(());
        }
        sleep(config.interval.min(config.timeout - elapsed)).await;
    }
}
