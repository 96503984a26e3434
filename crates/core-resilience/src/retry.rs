//! Retry policy: bounded attempts with a fixed or exponential pause
//!
//! A [`RetryPolicy`] answers two questions for a caller that is about to
//! repeat a failed operation: "may I try again?" and "how long do I wait
//! first?". [`RetryPolicy::run`] wraps both in a blocking executor for the
//! common case where the operation is a plain closure.
//!
//! Callers that must thread state between attempts (for example a network
//! session that may be replaced on reconnect) drive the loop themselves using
//! [`RetryPolicy::should_retry`] and [`RetryPolicy::delay_after`].
//!
//! # Example
//!
//! ```
//! use harvest_core_resilience::retry::{RetryPolicy, Transient};
//! use std::time::Duration;
//!
//! #[derive(Debug)]
//! struct Flaky;
//!
//! impl std::fmt::Display for Flaky {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "flaky")
//!     }
//! }
//!
//! impl Transient for Flaky {
//!     fn is_transient(&self) -> bool {
//!         true
//!     }
//! }
//!
//! let policy = RetryPolicy::fixed(3, Duration::ZERO);
//! let mut calls = 0;
//! let value = policy
//!     .run("probe", |_attempt| {
//!         calls += 1;
//!         if calls < 3 { Err(Flaky) } else { Ok(calls) }
//!     })
//!     .unwrap();
//! assert_eq!(value, 3);
//! ```

use std::fmt;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::RetryError;

/// Classifies an error as worth retrying or not.
pub trait Transient {
    /// `true` when the same operation may succeed if simply repeated
    fn is_transient(&self) -> bool;
}

/// Pause schedule between attempts
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Same pause after every failure
    Fixed(Duration),

    /// Pause grows by `factor` after every failure, capped at `max`
    Exponential {
        initial: Duration,
        max: Duration,
        factor: f64,
    },
}

impl Backoff {
    /// Pause to apply after the `failed_attempts`-th consecutive failure (1-based)
    pub fn delay_for(&self, failed_attempts: u32) -> Duration {
        match *self {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential {
                initial,
                max,
                factor,
            } => {
                let exponent = failed_attempts.saturating_sub(1) as i32;
                let secs = initial.as_secs_f64() * factor.powi(exponent);
                if !secs.is_finite() || secs >= max.as_secs_f64() {
                    max
                } else {
                    Duration::from_secs_f64(secs)
                }
            }
        }
    }
}

/// Bounded retry budget plus pause schedule.
///
/// `max_attempts` counts the first try, so `max_attempts = 3` means one try
/// and at most two retries. A value of zero is treated as one.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(5))
    }
}

impl RetryPolicy {
    /// Policy with a constant pause between attempts
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed(delay),
        }
    }

    /// Policy with a growing pause between attempts
    pub fn exponential(max_attempts: u32, initial: Duration, max: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Exponential {
                initial,
                max,
                factor: 2.0,
            },
        }
    }

    /// Attempt budget, never less than one
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Whether another attempt is allowed after `attempt` (1-based) failed
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.attempts()
    }

    /// Pause before the attempt that follows failed attempt `attempt`
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff.delay_for(attempt)
    }

    /// Run `op` until it succeeds, fails permanently, or the budget runs out.
    ///
    /// The closure receives the 1-based attempt number. Only errors whose
    /// [`Transient::is_transient`] returns `true` are retried.
    pub fn run<T, E, F>(&self, operation: &str, op: F) -> Result<T, RetryError<E>>
    where
        E: Transient + fmt::Display,
        F: FnMut(u32) -> Result<T, E>,
    {
        self.run_with_sleep(operation, op, thread::sleep)
    }

    /// Same as [`RetryPolicy::run`] with an injectable sleep function
    pub fn run_with_sleep<T, E, F, S>(
        &self,
        operation: &str,
        mut op: F,
        mut sleep: S,
    ) -> Result<T, RetryError<E>>
    where
        E: Transient + fmt::Display,
        F: FnMut(u32) -> Result<T, E>,
        S: FnMut(Duration),
    {
        let budget = self.attempts();
        let mut attempt = 1;

        loop {
            match op(attempt) {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) if !error.is_transient() => {
                    return Err(RetryError::Permanent {
                        operation: operation.to_string(),
                        attempt,
                        error,
                    });
                }
                Err(error) => {
                    warn!(
                        operation,
                        attempt,
                        max_attempts = budget,
                        %error,
                        "attempt failed"
                    );
                    if !self.should_retry(attempt) {
                        return Err(RetryError::Exhausted {
                            operation: operation.to_string(),
                            attempts: attempt,
                            last: error,
                        });
                    }
                    let delay = self.delay_after(attempt);
                    debug!(operation, ?delay, "waiting before retry");
                    sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}
