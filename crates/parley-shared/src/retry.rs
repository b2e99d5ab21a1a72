//! Full-jitter exponential backoff shared by every retrying caller.

use std::time::Duration;

use rand::Rng;

/// Upper bound of the backoff window for `attempt`: `2^attempt * base_ms`.
pub fn backoff_ceiling(attempt: u32, base_ms: u64) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(factor.saturating_mul(base_ms))
}

/// Full-jitter delay: uniformly random in `[0, 2^attempt * base_ms)`.
pub fn full_jitter_delay<R: Rng + ?Sized>(attempt: u32, base_ms: u64, rng: &mut R) -> Duration {
    let ceiling = backoff_ceiling(attempt, base_ms);
    ceiling.mul_f64(rng.gen::<f64>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_ceiling_doubles() {
        assert_eq!(backoff_ceiling(1, 2000), Duration::from_millis(4000));
        assert_eq!(backoff_ceiling(5, 2000), Duration::from_millis(64_000));
    }

    #[test]
    fn test_delay_stays_in_window() {
        let mut rng = StdRng::seed_from_u64(7);
        for attempt in 1..=5 {
            for _ in 0..200 {
                let delay = full_jitter_delay(attempt, 2000, &mut rng);
                assert!(delay <= backoff_ceiling(attempt, 2000));
            }
        }
    }

    #[test]
    fn test_huge_attempt_saturates() {
        assert_eq!(backoff_ceiling(80, 2000), Duration::from_millis(u64::MAX));
    }
}
