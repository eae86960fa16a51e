//! Adaptive delay between tail iterations.
//!
//! Empty iterations multiply the delay by `factor` up to `max`; any iteration
//! that emitted something drops it back to `min`. The small pacing delay
//! between pages of one walk is separate and never goes through here.

use std::time::Duration;

use crate::config::TailConfig;

/// Backoff bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffConfig {
    pub min: Duration,
    pub max: Duration,
    pub factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(1000),
            max: Duration::from_millis(30_000),
            factor: 2.0,
        }
    }
}

impl BackoffConfig {
    pub fn from_tail(tail: &TailConfig) -> Self {
        Self {
            min: tail.min_delay(),
            max: tail.max_delay(),
            factor: tail.factor,
        }
    }
}

/// Current delay state. Invariant: `min <= current <= max`.
#[derive(Debug, Clone)]
pub struct BackoffScheduler {
    config: BackoffConfig,
    current: Duration,
}

impl BackoffScheduler {
    /// Start at `min`. Bounds are normalized so `min <= max` and `factor >= 1`.
    pub fn new(config: BackoffConfig) -> Self {
        let config = BackoffConfig {
            min: config.min,
            max: config.max.max(config.min),
            factor: if config.factor.is_finite() && config.factor >= 1.0 {
                config.factor
            } else {
                1.0
            },
        };
        Self {
            current: config.min,
            config,
        }
    }

    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }

    /// Delay to wait before the next iteration.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Update after an iteration.
    pub fn record(&mut self, had_entries: bool) -> Duration {
        if had_entries {
            self.reset();
        } else {
            self.grow();
        }
        self.current
    }

    pub fn reset(&mut self) {
        self.current = self.config.min;
    }

    fn grow(&mut self) {
        let max = self.config.max;
        let next = self.current.as_nanos() as f64 * self.config.factor;
        self.current = if next >= max.as_nanos() as f64 {
            max
        } else {
            Duration::from_nanos(next as u64).clamp(self.config.min, max)
        };
    }
}

impl Default for BackoffScheduler {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler(min_ms: u64, max_ms: u64, factor: f64) -> BackoffScheduler {
        BackoffScheduler::new(BackoffConfig {
            min: Duration::from_millis(min_ms),
            max: Duration::from_millis(max_ms),
            factor,
        })
    }

    #[test]
    fn test_starts_at_min() {
        assert_eq!(BackoffScheduler::default().current(), Duration::from_secs(1));
    }

    #[test]
    fn test_doubles_until_max() {
        let mut b = scheduler(1000, 5000, 2.0);
        assert_eq!(b.record(false), Duration::from_millis(2000));
        assert_eq!(b.record(false), Duration::from_millis(4000));
        assert_eq!(b.record(false), Duration::from_millis(5000));
        assert_eq!(b.record(false), Duration::from_millis(5000));
    }

    #[test]
    fn test_activity_resets() {
        let mut b = scheduler(1000, 30_000, 2.0);
        b.record(false);
        b.record(false);
        assert_eq!(b.record(true), Duration::from_millis(1000));
    }

    #[test]
    fn test_factor_one_is_constant() {
        let mut b = scheduler(500, 1000, 1.0);
        assert_eq!(b.record(false), Duration::from_millis(500));
    }

    #[test]
    fn test_inverted_bounds_normalized() {
        let b = scheduler(2000, 1000, 2.0);
        assert_eq!(b.config().max, Duration::from_millis(2000));
    }
}
