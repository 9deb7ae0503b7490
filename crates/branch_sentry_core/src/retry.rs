//! Exponential backoff with jitter.
//!
//! A [`RetryPolicy`] is plain configuration. Calling [`RetryPolicy::backoff`] creates a
//! fresh, finite [`Backoff`] iterator of wait durations. Every caller gets its own
//! sequence, so concurrent requests never share retry state.
//!
//! The delay before retry `n` (0-based) is
//! `min(base * 2^n, max_interval) * (1 + jitter * u)` with `u` drawn uniformly from
//! `[-1, 1]`. Once the iterator returns `None` the caller has used up its retries; that
//! is a normal stop signal, not an error.

use rand::{rngs::StdRng, Rng, SeedableRng};
use std::time::Duration;

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;

/// Configuration for exponential backoff with jitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    base: Duration,
    jitter: f64,
    max_attempts: u32,
    max_interval: Duration,
}

impl RetryPolicy {
    /// Default policy for waiting on a freshly created repository.
    ///
    /// - 10 retries starting at 100ms, doubling, capped at 5s
    /// - 5% jitter
    pub const DEFAULT: Self = Self {
        base: Duration::from_millis(100),
        jitter: 0.05,
        max_attempts: 10,
        max_interval: Duration::from_secs(5),
    };

    /// Creates a policy without an interval cap.
    ///
    /// `jitter` is clamped to `[0.0, 1.0]`; a non-finite value disables jitter.
    pub fn new(base: Duration, jitter: f64, max_attempts: u32) -> Self {
        let jitter = if jitter.is_finite() {
            jitter.clamp(0.0, 1.0)
        } else {
            0.0
        };

        Self {
            base,
            jitter,
            max_attempts,
            max_interval: Duration::MAX,
        }
    }

    /// Caps the un-jittered delay of any single retry.
    pub fn with_max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = max_interval;
        self
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn max_interval(&self) -> Duration {
        self.max_interval
    }

    /// Computes the un-jittered delay for the given retry attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let secs = self.base.as_secs_f64() * 2f64.powi(exponent);
        let capped = secs.min(self.max_interval.as_secs_f64());
        Duration::try_from_secs_f64(capped).unwrap_or(self.max_interval)
    }

    /// Upper bound for the summed waits of a full backoff sequence.
    ///
    /// Never exceeds `base * (2^max_attempts - 1) * (1 + jitter)`.
    pub fn max_total_wait(&self) -> Duration {
        (0..self.max_attempts)
            .map(|attempt| scale(self.delay_for_attempt(attempt), 1.0 + self.jitter))
            .fold(Duration::ZERO, Duration::saturating_add)
    }

    /// Starts a new backoff sequence seeded from the operating system.
    pub fn backoff(&self) -> Backoff<StdRng> {
        self.backoff_with_rng(StdRng::from_entropy())
    }

    /// Starts a new backoff sequence that draws its jitter from `rng`.
    ///
    /// Passing a seeded generator makes the sequence reproducible.
    pub fn backoff_with_rng<R: Rng>(&self, rng: R) -> Backoff<R> {
        Backoff {
            policy: *self,
            attempt: 0,
            rng,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// One finite sequence of retry delays.
///
/// Owned by a single caller and dropped when that caller returns.
#[derive(Debug)]
pub struct Backoff<R> {
    policy: RetryPolicy,
    attempt: u32,
    rng: R,
}

impl<R> Backoff<R> {
    /// Number of delays handed out so far.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Returns `true` once the sequence has no further delays.
    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.policy.max_attempts
    }
}

impl<R: Rng> Iterator for Backoff<R> {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }

        let nominal = self.policy.delay_for_attempt(self.attempt);
        self.attempt += 1;

        if self.policy.jitter == 0.0 {
            return Some(nominal);
        }

        let spread: f64 = self.rng.gen_range(-1.0..=1.0);
        Some(scale(nominal, 1.0 + self.policy.jitter * spread))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.policy.max_attempts.saturating_sub(self.attempt) as usize;
        (remaining, Some(remaining))
    }
}

impl<R: Rng> ExactSizeIterator for Backoff<R> {}

fn scale(duration: Duration, factor: f64) -> Duration {
    Duration::try_from_secs_f64(duration.as_secs_f64() * factor.max(0.0)).unwrap_or(Duration::MAX)
}
