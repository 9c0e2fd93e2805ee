//! Backoff strategies: the wait between a failed, retryable attempt and the
//! next one.

use std::fmt;
use std::time::Duration;

use rand::Rng;

/// Strategy computing the wait before the next attempt.
///
/// `attempt` is zero-based: the wait after the first failed attempt is
/// computed with `attempt == 0`. The response from the just-completed attempt
/// is available for header-driven overrides.
pub trait BackoffStrategy: fmt::Debug + Send + Sync {
    fn wait(
        &self,
        min: Duration,
        max: Duration,
        attempt: u32,
        response: Option<&reqwest::Response>,
    ) -> Duration;
}

/// Exponential backoff, honoring `Retry-After`.
///
/// When the response carries an integer-seconds `Retry-After` header and the
/// status is 429 or 503, that duration is used verbatim. Otherwise the wait
/// is `min * 2^attempt`, clamped to `max` (also on numeric overflow).
#[derive(Debug, Clone, Copy, Default)]
pub struct ExponentialBackoff;

impl BackoffStrategy for ExponentialBackoff {
    fn wait(
        &self,
        min: Duration,
        max: Duration,
        attempt: u32,
        response: Option<&reqwest::Response>,
    ) -> Duration {
        if let Some(server_wait) = retry_after_override(response) {
            return server_wait;
        }

        let exponent = attempt.min(i32::MAX as u32) as i32;
        let secs = min.as_secs_f64() * 2f64.powi(exponent);
        match Duration::try_from_secs_f64(secs) {
            Ok(wait) if wait <= max => wait,
            _ => max,
        }
    }
}

/// Linear backoff with jitter, to spread out simultaneous retriers.
///
/// The wait is `(min + uniform(0, max - min)) * (attempt + 1)`; when
/// `max <= min` it degrades to `min * (attempt + 1)`. The randomness source
/// is freshly taken per call; determinism is not required.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearJitterBackoff;

impl BackoffStrategy for LinearJitterBackoff {
    fn wait(
        &self,
        min: Duration,
        max: Duration,
        attempt: u32,
        _response: Option<&reqwest::Response>,
    ) -> Duration {
        let multiplier = attempt.saturating_add(1);

        if max <= min {
            return min.saturating_mul(multiplier);
        }

        let spread = (max - min).as_secs_f64();
        let jitter = rand::rng().random_range(0.0..1.0) * spread;
        min.saturating_add(Duration::from_secs_f64(jitter))
            .saturating_mul(multiplier)
    }
}

/// The server-directed wait, when the response is a 429 or 503 carrying an
/// integer-seconds `Retry-After` header.
fn retry_after_override(response: Option<&reqwest::Response>) -> Option<Duration> {
    let response = response?;
    let status = response.status().as_u16();
    if status != 429 && status != 503 {
        return None;
    }

    response
        .headers()
        .get("retry-after")?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
