//! Delays between attempts of idempotent reads and feed polls.

use rand::Rng;
use std::time::Duration;

/// Delay before retry `attempt` (1-based): `base_ms * 2^(attempt - 1)`, capped
/// at `max_ms`, plus up to a tenth of that as jitter so concurrent readers
/// drift apart. Attempt 0 waits nothing.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let Some(exponent) = attempt.checked_sub(1) else {
        return Duration::ZERO;
    };

    let delay_ms = 2u64
        .checked_pow(exponent)
        .and_then(|factor| base_ms.checked_mul(factor))
        .unwrap_or(u64::MAX)
        .min(max_ms);
    let jitter_ms = rand::thread_rng().gen_range(0..=delay_ms / 10);

    Duration::from_millis(delay_ms.saturating_add(jitter_ms))
}
