use rand::Rng;
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Retry schedule for the transport: exponential backoff from `base_delay`,
/// plus up to 25% jitter, capped at `max_delay`. A `Retry-After` header
/// from Graph takes precedence over the computed delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Never retry
    #[cfg(test)]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    fn base_delay_for(&self, attempt: usize) -> Duration {
        let multiplier = 1u32.checked_shl(attempt as u32).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(multiplier).min(self.max_delay)
    }
}

const RETRY_JITTER_DIVISOR: u128 = 4; // + up to 25% jitter

fn is_retriable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT
            | StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

fn is_retriable_send_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_body()
}

fn add_jitter(delay: Duration) -> Duration {
    let max_jitter_ms = delay.as_millis() / RETRY_JITTER_DIVISOR;
    if max_jitter_ms == 0 {
        return delay;
    }

    let max_jitter_ms = std::cmp::min(max_jitter_ms, u128::from(u64::MAX)) as u64;
    let jitter_ms = rand::thread_rng().gen_range(0..=max_jitter_ms);
    delay + Duration::from_millis(jitter_ms)
}

fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Send a request, retrying transient failures.
///
/// Non-success responses that are not retriable (or that exhausted the
/// retries) are returned as-is for the caller to inspect.
pub(super) async fn send_with_retry(
    policy: &RetryPolicy,
    mut make_request: impl FnMut() -> reqwest::RequestBuilder,
) -> Result<reqwest::Response, reqwest::Error> {
    let max_attempts = policy.max_retries + 1;
    let mut attempt = 0;

    loop {
        match make_request().send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }

                let should_retry = is_retriable_status(status) && attempt < policy.max_retries;
                if !should_retry {
                    return Ok(response);
                }

                let base_delay = policy.base_delay_for(attempt);
                let delay = match retry_after(&response) {
                    Some(hint) => hint.min(policy.max_delay),
                    None => add_jitter(base_delay),
                };
                debug!(
                    "HTTP request failed with status {}; retrying in {:?} (base {:?}, attempt {}/{})",
                    status,
                    delay,
                    base_delay,
                    attempt + 1,
                    max_attempts
                );
                let _ = response.bytes().await;
                sleep(delay).await;
            }
            Err(err) => {
                let should_retry = is_retriable_send_error(&err) && attempt < policy.max_retries;
                if !should_retry {
                    return Err(err);
                }

                let base_delay = policy.base_delay_for(attempt);
                let delay = add_jitter(base_delay);
                debug!(
                    "HTTP request error: {}; retrying in {:?} (base {:?}, attempt {}/{})",
                    err,
                    delay,
                    base_delay,
                    attempt + 1,
                    max_attempts
                );
                sleep(delay).await;
            }
        }
        attempt += 1;
    }
}
