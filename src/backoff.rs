//! Exponential backoff with additive jitter

use chrono::{Duration, NaiveDateTime};
use rand::Rng;

/// Default delay for the first retry, in seconds
pub const DEFAULT_BASE_SECS: u64 = 5;
/// Default cap on the exponential delay, in seconds
pub const DEFAULT_MAX_SECS: u64 = 300;

/// Exponential delay for `attempt` before jitter: `min(max, base * 2^(attempt - 1))`.
///
/// Inputs are clamped (`attempt >= 1`, `base >= 1`, `max >= base`) and the
/// exponent saturates instead of overflowing.
pub fn capped_delay_secs(attempt: u32, base_secs: u64, max_secs: u64) -> u64 {
    let attempt = attempt.max(1);
    let base = base_secs.max(1);
    let max = max_secs.max(base);

    let factor = 1u64.checked_shl(attempt - 1).unwrap_or(u64::MAX);
    base.saturating_mul(factor).min(max)
}

/// Time of the next retry: `now + capped delay + uniform(0, base)` seconds
pub fn next_retry<R: Rng + ?Sized>(
    now: NaiveDateTime,
    attempt: u32,
    base_secs: u64,
    max_secs: u64,
    rng: &mut R,
) -> NaiveDateTime {
    let base = base_secs.max(1);
    let capped = capped_delay_secs(attempt, base, max_secs);
    let jitter_ms = rng.gen_range(0..=base.saturating_mul(1000));
    let delay_ms = capped.saturating_mul(1000).saturating_add(jitter_ms);

    let delay = Duration::milliseconds(i64::try_from(delay_ms).unwrap_or(i64::MAX));
    now.checked_add_signed(delay).unwrap_or(NaiveDateTime::MAX)
}
