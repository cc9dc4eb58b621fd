//! Exponential backoff with proportional jitter.

use std::time::Duration;

use rand::Rng;

use crate::{DeeplError, Result};

/// Delay schedule between retry attempts.
///
/// The wait before attempt `n + 2` is `min(initial * factor^n, max)`, scaled by
/// a uniform factor in `[1 - jitter, 1 + jitter)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Backoff {
    initial_delay: Duration,
    max_delay: Duration,
    factor: f64,
    jitter: f64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(120),
            factor: 1.6,
            jitter: 0.23,
        }
    }
}

impl Backoff {
    /// Validates and builds a schedule.
    ///
    /// Requires `factor >= 1`, `jitter` in `[0, 1)` and `initial_delay <= max_delay`,
    /// which keeps every computed delay non-negative.
    pub fn new(
        initial_delay: Duration,
        max_delay: Duration,
        factor: f64,
        jitter: f64,
    ) -> Result<Self> {
        if !factor.is_finite() || factor < 1.0 {
            return Err(DeeplError::Config(format!(
                "backoff factor must be finite and >= 1, got {factor}"
            )));
        }
        if !(0.0..1.0).contains(&jitter) {
            return Err(DeeplError::Config(format!(
                "backoff jitter must be in [0, 1), got {jitter}"
            )));
        }
        if initial_delay > max_delay {
            return Err(DeeplError::Config(format!(
                "initial delay {initial_delay:?} exceeds max delay {max_delay:?}"
            )));
        }
        Ok(Self {
            initial_delay,
            max_delay,
            factor,
            jitter,
        })
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// Capped delay for `attempt` before jitter is applied.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        secs_to_duration(self.base_secs(attempt))
    }

    /// Jittered delay for `attempt` (0 = wait before the second attempt).
    pub fn delay(&self, attempt: u32) -> Duration {
        let draw = rand::rng().random_range(-1.0..1.0);
        self.delay_with_draw(attempt, draw)
    }

    /// Deterministic form of [`Backoff::delay`] for a fixed draw in `[-1, 1)`.
    pub fn delay_with_draw(&self, attempt: u32, draw: f64) -> Duration {
        let jittered = self.base_secs(attempt) * (1.0 + self.jitter * draw);
        secs_to_duration(jittered.max(0.0))
    }

    fn base_secs(&self, attempt: u32) -> f64 {
        let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
        let grown = self.initial_delay.as_secs_f64() * self.factor.powi(exp);
        // 0 * inf
        if grown.is_nan() {
            return 0.0;
        }
        grown.min(self.max_delay.as_secs_f64())
    }
}

fn secs_to_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}
