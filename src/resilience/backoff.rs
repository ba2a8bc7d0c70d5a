//! Exponential backoff with jitter.

use std::time::Duration;
use rand::Rng;

/// Delay before the next accept after `failures` consecutive accept errors.
///
/// Zero failures means no delay. The delay doubles per failure from `base_ms`
/// up to `max_ms`, plus up to 10% jitter.
pub fn calculate_backoff(failures: u32, base_ms: u64, max_ms: u64) -> Duration {
    if failures == 0 {
        return Duration::ZERO;
    }

    let exponential_base = 2u64.saturating_pow(failures - 1);
    let capped_delay = base_ms.saturating_mul(exponential_base).min(max_ms);

    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}
