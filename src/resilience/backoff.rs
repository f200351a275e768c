//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Deterministic part of the wait after the failed attempt `attempt_index` (0-based):
/// `min(max, base * 2^attempt_index)`.
pub fn backoff_floor(attempt_index: u32, base: Duration, max: Duration) -> Duration {
    let factor = 2u32.saturating_pow(attempt_index);
    base.saturating_mul(factor).min(max)
}

/// Uniform random duration in `[0, range]`, millisecond resolution.
pub fn jitter(range: Duration) -> Duration {
    let range_ms = u64::try_from(range.as_millis()).unwrap_or(u64::MAX);
    if range_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=range_ms))
}

/// Calculate exponential backoff delay with additive jitter.
pub fn calculate_backoff(
    attempt_index: u32,
    base: Duration,
    max: Duration,
    jitter_range: Duration,
) -> Duration {
    backoff_floor(attempt_index, base, max) + jitter(jitter_range)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: Duration = Duration::from_secs(1);
    const MAX: Duration = Duration::from_secs(10);

    #[test]
    fn test_floor_doubles_then_caps() {
        let floors: Vec<u64> = (0..6)
            .map(|i| backoff_floor(i, BASE, MAX).as_secs())
            .collect();
        assert_eq!(floors, vec![1, 2, 4, 8, 10, 10]);

        assert_eq!(backoff_floor(u32::MAX, BASE, MAX), MAX);
    }

    #[test]
    fn test_backoff_calculation() {
        let jitter_range = Duration::from_secs(2);
        for attempt_index in 0..4 {
            let floor = backoff_floor(attempt_index, BASE, MAX);
            for _ in 0..100 {
                let delay = calculate_backoff(attempt_index, BASE, MAX, jitter_range);
                assert!(delay >= floor);
                assert!(delay <= floor + jitter_range);
            }
        }
    }

    #[test]
    fn test_zero_jitter() {
        assert_eq!(jitter(Duration::ZERO), Duration::ZERO);
        assert_eq!(calculate_backoff(2, BASE, MAX, Duration::ZERO), Duration::from_secs(4));
    }
}
