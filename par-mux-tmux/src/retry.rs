//! Convergence polling.
//!
//! tmux acknowledges a command before its effect is necessarily visible: a
//! renamed window, a new pane's working directory or a freshly created
//! session can lag behind the command that requested them. Every wait on
//! such state goes through [`retry_until`] / [`wait_until`] (or the fallible
//! [`try_retry_until`]), which re-evaluate a predicate against freshly
//! fetched state until it holds or the [`RetryPolicy`] is exhausted.

use std::convert::Infallible;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Bounds and pacing for a convergence wait.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the second evaluation.
    pub interval: Duration,
    /// Multiplier applied to the interval after every failed attempt (>= 1.0).
    pub backoff: f64,
    /// Upper bound for the backed-off interval.
    pub max_interval: Duration,
    /// Wall-clock budget for the whole wait.
    pub timeout: Duration,
    /// Optional cap on the number of evaluations.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Fixed-interval policy bounded by a wall-clock timeout.
    pub fn fixed(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            backoff: 1.0,
            max_interval: interval,
            timeout,
            max_attempts: None,
        }
    }

    /// Same policy, additionally capped at `attempts` evaluations.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts.max(1));
        self
    }

    /// Same policy with exponential backoff up to `max_interval`.
    pub fn with_backoff(mut self, factor: f64, max_interval: Duration) -> Self {
        self.backoff = factor.max(1.0);
        self.max_interval = max_interval.max(self.interval);
        self
    }

    /// Backed-off interval, saturating at `max_interval`.
    fn next_interval(&self, current: Duration) -> Duration {
        Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff)
            .map_or(self.max_interval, |next| next.min(self.max_interval))
    }
}

impl Default for RetryPolicy {
    /// 50ms between attempts for up to 8 seconds.
    fn default() -> Self {
        Self::fixed(Duration::from_millis(50), Duration::from_secs(8))
    }
}

/// The predicate never held within the policy's bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("state did not converge after {attempts} attempts in {elapsed:?}")]
pub struct ConvergenceTimeout {
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Failure of a fallible convergence wait.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error(transparent)]
    Timeout(#[from] ConvergenceTimeout),
    /// The predicate itself failed; the wait stops immediately.
    #[error("{0}")]
    Predicate(E),
}

/// Poll `predicate` until it returns `Ok(true)`.
///
/// An `Err` from the predicate aborts the wait and is returned as
/// [`RetryError::Predicate`]. The predicate is always evaluated at least once,
/// even with a zero timeout.
pub fn try_retry_until<E, F>(policy: &RetryPolicy, mut predicate: F) -> Result<(), RetryError<E>>
where
    F: FnMut() -> Result<bool, E>,
{
    let start = Instant::now();
    let mut interval = policy.interval;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if predicate().map_err(RetryError::Predicate)? {
            if attempts > 1 {
                log::trace!("converged after {attempts} attempts");
            }
            return Ok(());
        }

        let elapsed = start.elapsed();
        let out_of_attempts = policy.max_attempts.is_some_and(|max| attempts >= max);
        if out_of_attempts || elapsed + interval > policy.timeout {
            return Err(ConvergenceTimeout { attempts, elapsed }.into());
        }

        std::thread::sleep(interval);
        interval = policy.next_interval(interval);
    }
}

/// Poll `predicate` until it returns `true`, or fail with [`ConvergenceTimeout`].
pub fn retry_until<F>(policy: &RetryPolicy, mut predicate: F) -> Result<(), ConvergenceTimeout>
where
    F: FnMut() -> bool,
{
    try_retry_until::<Infallible, _>(policy, || Ok(predicate())).map_err(|e| match e {
        RetryError::Timeout(timeout) => timeout,
        RetryError::Predicate(never) => match never {},
    })
}

/// Like [`retry_until`] but reports exhaustion as `false`.
///
/// Useful when the caller wants to assert on the final state itself for a
/// clearer failure message.
pub fn wait_until<F>(policy: &RetryPolicy, predicate: F) -> bool
where
    F: FnMut() -> bool,
{
    retry_until(policy, predicate).is_ok()
}
