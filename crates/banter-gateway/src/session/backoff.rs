//! Randomized exponential backoff

use rand::Rng;
use std::time::Duration;

/// Delay between reconnect attempts
///
/// `base * 2^attempt`, shifted by a random amount in `[-jitter, +jitter]` and
/// capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    jitter: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration, jitter: Duration) -> Self {
        Self {
            base,
            max,
            jitter,
            attempt: 0,
        }
    }

    /// Delay before the next attempt; advances the attempt counter
    pub fn next_delay(&mut self) -> Duration {
        let exponent = self.attempt.min(31);
        let delay = self
            .base
            .checked_mul(1u32 << exponent)
            .map_or(self.max, |delay| delay.min(self.max));

        let jitter_ms = self.jitter.as_millis() as i64;
        let offset = if jitter_ms > 0 {
            rand::thread_rng().gen_range(-jitter_ms..=jitter_ms)
        } else {
            0
        };
        let delay_ms = (delay.as_millis() as i64 + offset).clamp(0, self.max.as_millis() as i64);

        self.attempt = self.attempt.saturating_add(1);
        Duration::from_millis(delay_ms as u64)
    }

    /// Back to the first attempt after a successful connection
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff() -> Backoff {
        Backoff::new(
            Duration::from_secs(1),
            Duration::from_secs(60),
            Duration::from_millis(250),
        )
    }

    #[test]
    fn test_delay_doubles_within_jitter() {
        let mut backoff = backoff();
        for expected in [1_000u64, 2_000, 4_000, 8_000, 16_000, 32_000] {
            let delay = backoff.next_delay().as_millis() as u64;
            assert!(
                (expected - 250..=expected + 250).contains(&delay),
                "{delay} not within jitter of {expected}"
            );
        }
        assert_eq!(backoff.attempt(), 6);
    }

    #[test]
    fn test_delay_is_capped() {
        let mut backoff = backoff();
        for _ in 0..40 {
            assert!(backoff.next_delay() <= Duration::from_secs(60));
        }
        assert!(backoff.next_delay() >= Duration::from_millis(59_750));
    }

    #[test]
    fn test_reset() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(1), Duration::ZERO);
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.attempt(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }
}
