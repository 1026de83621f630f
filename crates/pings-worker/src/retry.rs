use std::time::Duration;

/// Decides how long to pause after a failed fetch.
pub trait RetryPolicy: Send {
    /// `consecutive_failures` is at least 1. `None` gives up.
    fn next_delay(&mut self, consecutive_failures: u32) -> Option<Duration>;
}

impl<R: RetryPolicy + ?Sized> RetryPolicy for Box<R> {
    fn next_delay(&mut self, consecutive_failures: u32) -> Option<Duration> {
        (**self).next_delay(consecutive_failures)
    }
}

/// Same pause after every failure, forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay {
    pub delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl RetryPolicy for FixedDelay {
    fn next_delay(&mut self, _consecutive_failures: u32) -> Option<Duration> {
        Some(self.delay)
    }
}

/// Doubles the pause on each consecutive failure, capped at `max_delay`,
/// optionally giving up after `max_attempts` failures in a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    pub initial: Duration,
    pub max_delay: Duration,
    pub max_attempts: Option<u32>,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, max_delay: Duration) -> Self {
        Self {
            initial,
            max_delay,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn next_delay(&mut self, consecutive_failures: u32) -> Option<Duration> {
        if let Some(max) = self.max_attempts {
            if consecutive_failures >= max {
                return None;
            }
        }

        let shift = consecutive_failures.saturating_sub(1).min(31);
        let delay = self.initial.saturating_mul(1u32 << shift);
        Some(delay.min(self.max_delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_delay_never_gives_up() {
        let mut policy = FixedDelay::default();
        assert_eq!(policy.next_delay(1), Some(Duration::from_secs(1)));
        assert_eq!(policy.next_delay(10_000), Some(Duration::from_secs(1)));
    }

    #[test]
    fn exponential_doubles_up_to_cap() {
        let mut policy =
            ExponentialBackoff::new(Duration::from_millis(100), Duration::from_millis(500));
        assert_eq!(policy.next_delay(1), Some(Duration::from_millis(100)));
        assert_eq!(policy.next_delay(2), Some(Duration::from_millis(200)));
        assert_eq!(policy.next_delay(3), Some(Duration::from_millis(400)));
        assert_eq!(policy.next_delay(4), Some(Duration::from_millis(500)));
        assert_eq!(policy.next_delay(200), Some(Duration::from_millis(500)));
    }

    #[test]
    fn exponential_gives_up_at_max_attempts() {
        let mut policy = ExponentialBackoff::new(Duration::from_millis(1), Duration::from_secs(1))
            .with_max_attempts(3);
        assert!(policy.next_delay(2).is_some());
        assert!(policy.next_delay(3).is_none());
    }
}
