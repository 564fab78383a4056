//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

/// Delay to sleep after failed attempt number `attempt` (1-based).
///
/// `initial * factor^(attempt - 1)`, capped at `max`, plus up to 10% jitter.
pub fn calculate_backoff(attempt: u32, initial: Duration, factor: f64, max: Duration) -> Duration {
    if attempt == 0 || initial.is_zero() {
        return Duration::ZERO;
    }

    let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
    let growth = factor.max(1.0).powi(exponent);
    let delay_ms = (initial.as_millis() as f64 * growth).min(u64::MAX as f64) as u64;
    let capped_delay = delay_ms.min(max.as_millis() as u64);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}
