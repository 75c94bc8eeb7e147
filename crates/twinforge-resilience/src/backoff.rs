//! Retry policies and backoff schedules

use std::time::Duration;

/// Default number of attempts, the first one included
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default first delay of the exponential schedule
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(2);

/// Default cap of the exponential schedule
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// How long to wait before the next attempt
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffSchedule {
    /// `initial * multiplier^(n-1)`, capped at `max`
    Exponential {
        initial: Duration,
        max: Duration,
        multiplier: f64,
    },
    /// Explicit delays; the last one repeats once the list runs out
    Fixed(Vec<Duration>),
}

impl BackoffSchedule {
    /// Delay after the `failures`-th failed attempt (1-based)
    pub fn delay(&self, failures: u32) -> Duration {
        let index = failures.saturating_sub(1);
        match self {
            BackoffSchedule::Exponential {
                initial,
                max,
                multiplier,
            } => {
                let exponent = i32::try_from(index).unwrap_or(i32::MAX);
                let secs = initial.as_secs_f64() * multiplier.powi(exponent);
                Duration::try_from_secs_f64(secs)
                    .map(|d| d.min(*max))
                    .unwrap_or(*max)
            }
            BackoffSchedule::Fixed(delays) => delays
                .get(index as usize)
                .or_else(|| delays.last())
                .copied()
                .unwrap_or(Duration::ZERO),
        }
    }
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        BackoffSchedule::Exponential {
            initial: DEFAULT_INITIAL_DELAY,
            max: DEFAULT_MAX_DELAY,
            multiplier: 2.0,
        }
    }
}

/// Bounded retry policy
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included. Zero behaves like one.
    pub max_attempts: u32,
    pub backoff: BackoffSchedule,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: BackoffSchedule) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Run once, never retry
    pub fn no_retry() -> Self {
        Self::new(1, BackoffSchedule::Fixed(Vec::new()))
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, BackoffSchedule::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_is_capped() {
        let schedule = BackoffSchedule::Exponential {
            initial: Duration::from_millis(100),
            max: Duration::from_millis(500),
            multiplier: 2.0,
        };
        assert_eq!(schedule.delay(1), Duration::from_millis(100));
        assert_eq!(schedule.delay(2), Duration::from_millis(200));
        assert_eq!(schedule.delay(3), Duration::from_millis(400));
        assert_eq!(schedule.delay(4), Duration::from_millis(500));
        assert_eq!(schedule.delay(u32::MAX), Duration::from_millis(500));
    }

    #[test]
    fn test_fixed_repeats_last() {
        let schedule = BackoffSchedule::Fixed(vec![Duration::from_secs(1), Duration::from_secs(5)]);
        assert_eq!(schedule.delay(1), Duration::from_secs(1));
        assert_eq!(schedule.delay(2), Duration::from_secs(5));
        assert_eq!(schedule.delay(9), Duration::from_secs(5));
        assert_eq!(BackoffSchedule::Fixed(Vec::new()).delay(3), Duration::ZERO);
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        assert_eq!(RetryPolicy::new(0, BackoffSchedule::default()).attempts(), 1);
        assert_eq!(RetryPolicy::no_retry().attempts(), 1);
    }
}
