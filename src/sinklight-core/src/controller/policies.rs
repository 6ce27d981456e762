// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Retry policies for the convergence loop and for session restarts.

use std::time::Duration;

/// Policy for retrying a failed step.
pub trait RetryPolicy: Send + Sync {
    /// Whether another attempt may be made after `attempt` attempts so far.
    fn should_retry(&self, attempt: u32) -> bool;

    /// Delay before the attempt following `attempt`.
    fn delay(&self, attempt: u32) -> Duration;

    /// Maximum number of attempts, if bounded.
    fn max_attempts(&self) -> Option<u32>;
}

/// Convergence loop policy: fixed settle delay after every pulse.
///
/// Unbounded by default, so a jammed mechanism keeps being retried until a
/// newer command supersedes the target. Setting `max_attempts` turns on the
/// safety cutoff.
#[derive(Debug, Clone)]
pub struct ConvergencePolicy {
    settle_delay: Duration,
    max_attempts: Option<u32>,
}

impl ConvergencePolicy {
    pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

    pub fn new(settle_delay: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            settle_delay,
            max_attempts,
        }
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }
}

impl Default for ConvergencePolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SETTLE_DELAY, None)
    }
}

impl RetryPolicy for ConvergencePolicy {
    fn should_retry(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }

    fn delay(&self, _attempt: u32) -> Duration {
        self.settle_delay
    }

    fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }
}

/// Exponential backoff retry policy.
///
/// Delays increase exponentially with each retry attempt,
/// up to a configured maximum delay.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    max_attempts: Option<u32>,
    base_delay: Duration,
    max_delay: Duration,
}

impl ExponentialBackoff {
    pub fn new(max_attempts: Option<u32>, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Unbounded restarts from 1 s up to 30 s.
    pub fn default_restart() -> Self {
        Self {
            max_attempts: None,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::default_restart()
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn should_retry(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }

    fn delay(&self, attempt: u32) -> Duration {
        let multiplier = 2u32.saturating_pow(attempt);
        let delay = self.base_delay.saturating_mul(multiplier);
        delay.min(self.max_delay)
    }

    fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }
}
