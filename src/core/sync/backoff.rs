/*!
 * Full-Jitter Exponential Backoff
 *
 * Each retry waits `k * base` where `k` is drawn uniformly from `[0, 2^c)`
 * and `c = min(attempt, ceiling)`. The wait is clamped to the time left
 * before the caller's deadline, so a waiter never sleeps past its own expiry.
 */

use rand::Rng;
use std::time::Duration;

/// Backoff window calculator
#[derive(Debug, Clone, Copy)]
pub(crate) struct Backoff {
    base: Duration,
    ceiling: u32,
}

impl Backoff {
    pub(crate) const fn new(base: Duration, ceiling: u32) -> Self {
        Self { base, ceiling }
    }

    /// Exclusive upper bound of the jitter multiplier for this attempt
    #[inline]
    fn window(&self, attempt: u32) -> u64 {
        1u64 << attempt.min(self.ceiling)
    }

    /// Wait before the next lock check
    ///
    /// Never exceeds `time_left`.
    pub(crate) fn wait_time(&self, attempt: u32, time_left: Duration) -> Duration {
        self.wait_time_with(&mut rand::thread_rng(), attempt, time_left)
    }

    pub(crate) fn wait_time_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        attempt: u32,
        time_left: Duration,
    ) -> Duration {
        let k = rng.gen_range(0..self.window(attempt));
        // k < 2^ceiling <= 2^31
        let candidate = self.base.saturating_mul(k as u32);
        candidate.min(time_left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_window_caps_at_ceiling() {
        let backoff = Backoff::new(Duration::from_millis(1), 3);
        assert_eq!(backoff.window(1), 2);
        assert_eq!(backoff.window(3), 8);
        assert_eq!(backoff.window(50), 8);
    }

    #[test]
    fn test_first_attempt_is_zero_or_one_unit() {
        let backoff = Backoff::new(Duration::from_millis(1), 10);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..200 {
            let wait = backoff.wait_time_with(&mut rng, 1, Duration::from_secs(1));
            assert!(wait == Duration::ZERO || wait == Duration::from_millis(1));
        }
    }

    #[test]
    fn test_clamped_to_time_left() {
        let backoff = Backoff::new(Duration::from_millis(100), 10);
        let mut rng = StdRng::seed_from_u64(42);
        let time_left = Duration::from_millis(3);

        for attempt in 1..20 {
            assert!(backoff.wait_time_with(&mut rng, attempt, time_left) <= time_left);
        }
    }

    #[test]
    fn test_zero_time_left() {
        let backoff = Backoff::new(Duration::from_millis(1), 10);
        assert_eq!(backoff.wait_time(8, Duration::ZERO), Duration::ZERO);
    }

    proptest! {
        #[test]
        fn prop_wait_never_exceeds_bounds(
            base_ms in 1u64..50,
            ceiling in 0u32..=16,
            attempt in 0u32..64,
            time_left_ms in 0u64..10_000,
            seed in any::<u64>(),
        ) {
            let base = Duration::from_millis(base_ms);
            let backoff = Backoff::new(base, ceiling);
            let time_left = Duration::from_millis(time_left_ms);
            let mut rng = StdRng::seed_from_u64(seed);

            let wait = backoff.wait_time_with(&mut rng, attempt, time_left);

            prop_assert!(wait <= time_left);
            prop_assert!(wait <= base * ((1u32 << ceiling) - 1));
        }
    }
}
