//! Retry logic with exponential backoff for sentiment HTTP calls.
//!
//! Retries on transient errors (429 rate limit, 5xx server errors, network timeouts).
//! Does NOT retry on client errors (400, 401, 403, 404).

use reqwest::{Response, StatusCode};
use sadbot_core::SentimentError;
use std::time::Duration;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Initial delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for each subsequent delay.
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            backoff_factor: 2.0,
        }
    }
}

impl RetryConfig {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

/// Determine if a status code is retryable.
fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS         // 429
        || status == StatusCode::INTERNAL_SERVER_ERROR // 500
        || status == StatusCode::BAD_GATEWAY           // 502
        || status == StatusCode::SERVICE_UNAVAILABLE   // 503
        || status == StatusCode::GATEWAY_TIMEOUT       // 504
        || status == StatusCode::REQUEST_TIMEOUT // 408
}

/// Execute an async HTTP operation with retry logic.
///
/// The `operation` closure is called repeatedly until it succeeds, returns a
/// non-retryable error, or `max_attempts` is exhausted.
///
/// Returns the successful `Response`, or the last error if all retries failed.
pub async fn with_retry<F, Fut>(
    config: &RetryConfig,
    provider_name: &str,
    operation: F,
) -> Result<Response, SentimentError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<Response, reqwest::Error>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut delay = config.initial_delay;
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        match operation().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    if attempt > 1 {
                        tracing::info!("{} succeeded on attempt {}", provider_name, attempt);
                    }
                    return Ok(response);
                }

                let body = response.text().await.unwrap_or_default();
                let error = SentimentError::Http {
                    status: status.as_u16(),
                    body: body.chars().take(200).collect(),
                };

                if !is_retryable_status(status) {
                    return Err(error);
                }

                tracing::warn!(
                    "{} returned {} on attempt {}/{}",
                    provider_name,
                    status,
                    attempt,
                    max_attempts
                );
                last_error = Some(error);
            }
            Err(e) => {
                // Network error (timeout, DNS failure, connection refused)
                tracing::warn!(
                    "{} network error on attempt {}/{}: {}",
                    provider_name,
                    attempt,
                    max_attempts,
                    e
                );
                last_error = Some(SentimentError::Network(e.to_string()));
            }
        }

        if attempt < max_attempts {
            let sleep_time = delay + Duration::from_millis(rand_jitter());

            tracing::info!(
                "{} retrying in {:.1}s (attempt {}/{})",
                provider_name,
                sleep_time.as_secs_f64(),
                attempt + 1,
                max_attempts
            );

            tokio::time::sleep(sleep_time).await;

            delay = Duration::from_secs_f64(
                (delay.as_secs_f64() * config.backoff_factor).min(config.max_delay.as_secs_f64()),
            );
        }
    }

    Err(last_error.unwrap_or_else(|| SentimentError::Network("no attempt made".to_string())))
}

/// Simple jitter: 0-100ms using timestamp as poor-man's random.
fn rand_jitter() -> u64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 100) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn test_none_is_single_attempt() {
        assert_eq!(RetryConfig::none().max_attempts, 1);
    }

    #[test]
    fn test_jitter_bounded() {
        for _ in 0..10 {
            assert!(rand_jitter() < 100);
        }
    }
}
