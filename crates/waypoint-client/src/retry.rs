//! Bounded exponential-backoff retry for rate-limited operations.
//!
//! The controller wraps an arbitrary asynchronous operation. Only the
//! rate-limited failure kind is ever retried; every other failure, and
//! retry exhaustion, propagates immediately and unwrapped.

use crate::error::{ApiResult, RateLimitInfo};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use waypoint_observability::{ObservabilityContext, SdkEvent};

/// Retry policy for rate-limited requests.
///
/// Immutable per call. Delay for retry attempt *n* (1-indexed) is
/// `min(base_delay * 2^(n-1), max_delay)`, scaled by a uniform jitter
/// factor drawn from `[1 - jitter, 1 + jitter]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Master switch; disabled means every call gets exactly one attempt.
    pub retry_enabled: bool,
    /// Upper bound on retries, so at most `max_retries + 1` total attempts.
    pub max_retries: u32,
    /// Initial backoff delay.
    pub base_delay: Duration,
    /// Cap on the exponential growth.
    pub max_delay: Duration,
    /// Jitter fraction in `[0, 1]`.
    pub jitter: f64,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            retry_enabled: true,
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            jitter: 0.1,
        }
    }
}

/// Successful outcome of a retried operation.
#[derive(Debug, Clone)]
pub struct RetryOutcome<T> {
    pub value: T,
    /// Best-effort headroom harvested from the most recent failed attempt.
    pub rate_limit: Option<RateLimitInfo>,
}

/// Backoff delay for retry attempt `attempt` (1-indexed), ignoring jitter.
pub fn compute_backoff(attempt: u32, policy: &RateLimitPolicy) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }
    let base_ms = policy.base_delay.as_millis() as u64;
    let max_ms = policy.max_delay.as_millis() as u64;
    let multiplier = 1u64.checked_shl(attempt - 1).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(multiplier).min(max_ms))
}

/// Scale a delay by a uniform random factor in `[1 - jitter, 1 + jitter]`.
pub fn apply_jitter(delay: Duration, jitter: f64) -> Duration {
    let jitter = jitter.clamp(0.0, 1.0);
    if jitter == 0.0 || delay.is_zero() {
        return delay;
    }
    let factor = rand::thread_rng().gen_range(1.0 - jitter..=1.0 + jitter);
    delay.mul_f64(factor)
}

/// Execute `op`, retrying rate-limited failures under `policy`.
///
/// A retry happens only when the failure's code is rate-limited, its
/// retryable flag is set, retry is enabled, and retries remain. A server
/// `retry-after` on the failure overrides the computed delay. A
/// rate-limit-hit event is emitted before each wait.
pub async fn with_retry<T, F, Fut>(
    policy: &RateLimitPolicy,
    observability: &ObservabilityContext,
    operation_id: &str,
    mut op: F,
) -> ApiResult<RetryOutcome<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ApiResult<T>>,
{
    let mut rate_limit: Option<RateLimitInfo> = None;
    let mut retries: u32 = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(RetryOutcome { value, rate_limit }),
            Err(error) => {
                let eligible = policy.retry_enabled
                    && error.is_rate_limited()
                    && error.retryable
                    && retries < policy.max_retries;
                if !eligible {
                    return Err(error);
                }

                retries += 1;
                if error.rate_limit.is_some() {
                    rate_limit = error.rate_limit;
                }

                let computed = apply_jitter(compute_backoff(retries, policy), policy.jitter);
                let wait = error.retry_after.unwrap_or(computed);

                observability.emit(SdkEvent::rate_limit_hit(operation_id, retries, wait));
                tracing::warn!(
                    operation_id,
                    attempt = retries,
                    wait_ms = wait.as_millis() as u64,
                    "rate limited, backing off before retry"
                );

                tokio::time::sleep(wait).await;
            }
        }
    }
}
