use crate::config::RetrySettings;
use crate::error::ErrorCategory;
use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first one included
    pub max_attempts: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
    /// Maximum jitter as a fraction of the delay
    pub jitter: f64,
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            initial_delay: settings.initial_delay(),
            max_delay: settings.max_delay(),
            multiplier: settings.multiplier,
            jitter: settings.jitter,
        }
    }
}

/// Decides which errors are retried, and how
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    rate_limited: RetryConfig,
}

impl RetryPolicy {
    /// Retry nothing but rate limiting, anything else fails immediately
    #[must_use]
    pub const fn rate_limit_only(config: RetryConfig) -> Self {
        Self {
            rate_limited: config,
        }
    }

    /// Get retry config based on error
    #[must_use]
    pub fn config_for_error(&self, error: &Error) -> Option<&RetryConfig> {
        match error.category() {
            ErrorCategory::RateLimited => Some(&self.rate_limited),
            ErrorCategory::Permanent
            | ErrorCategory::CircuitBreaker
            | ErrorCategory::Transient => None,
        }
    }
}

/// Execute an operation with retry logic.
///
/// Errors the policy does not retry are returned untouched. Running out of
/// attempts on a retryable error yields [`Error::RetriesExhausted`].
pub async fn retry_with_policy<T, F, Fut>(
    operation: F,
    policy: &RetryPolicy,
    operation_name: &str,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;

    loop {
        debug!(
            "Executing operation '{}' (attempt {})",
            operation_name, attempt
        );

        let error = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        "Operation '{}' succeeded after {} attempts",
                        operation_name, attempt
                    );
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        let Some(retry_config) = policy.config_for_error(&error) else {
            debug!(
                "Operation '{}' failed with non-retryable error: {}",
                operation_name, error
            );
            return Err(error);
        };

        if attempt >= retry_config.max_attempts {
            warn!(
                "Operation '{}' failed after {} attempts: {}",
                operation_name, attempt, error
            );
            return Err(Error::RetriesExhausted {
                operation: operation_name.to_string(),
                attempts: attempt,
                last_error: Box::new(error),
            });
        }

        let delay = calculate_delay(attempt - 1, retry_config, &error);
        warn!(
            "Operation '{}' failed (attempt {}), retrying after {:?}: {}",
            operation_name, attempt, delay, error
        );

        sleep(delay).await;
        attempt += 1;
    }
}

/// Calculate delay for retry attempt
fn calculate_delay(attempt: u32, config: &RetryConfig, error: &Error) -> Duration {
    // Server-provided Retry-After wins over our own schedule
    if let Some(retry_after) = error.retry_after() {
        return retry_after.min(config.max_delay);
    }

    let base_delay_ms = config.initial_delay.as_millis() as f64;
    let exponential_delay_ms = base_delay_ms * config.multiplier.powi(attempt as i32);
    let capped_delay_ms = exponential_delay_ms.min(config.max_delay.as_millis() as f64);
    let delay = Duration::from_millis(capped_delay_ms as u64);

    add_jitter(delay, config.jitter)
}

fn add_jitter(delay: Duration, jitter_factor: f64) -> Duration {
    if jitter_factor <= 0.0 {
        return delay;
    }

    use rand::Rng;
    let jitter_ms = (delay.as_millis() as f64 * jitter_factor) as u64;
    let jitter = rand::thread_rng().gen_range(0..=jitter_ms);

    delay + Duration::from_millis(jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn quick(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            multiplier: 2.0,
            jitter: 0.0,
        }
    }

    fn throttled() -> Error {
        Error::Api {
            service: "search".to_string(),
            status: 429,
            message: String::new(),
        }
    }

    #[tokio::test]
    async fn test_retry_success_after_rate_limits() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_with_policy(
            move || {
                let count = counter_clone.fetch_add(1, Ordering::SeqCst);
                async move {
                    if count < 2 {
                        Err(throttled())
                    } else {
                        Ok(42u32)
                    }
                }
            },
            &RetryPolicy::rate_limit_only(quick(5)),
            "search",
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rate_limit_only_does_not_retry_server_errors() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_with_policy(
            move || {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                async move {
                    Err::<u32, Error>(Error::Api {
                        service: "search".to_string(),
                        status: 500,
                        message: String::new(),
                    })
                }
            },
            &RetryPolicy::rate_limit_only(quick(5)),
            "search",
        )
        .await;

        assert!(matches!(result, Err(Error::Api { status: 500, .. })));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_is_bounded() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_with_policy(
            move || {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                async move { Err::<u32, Error>(throttled()) }
            },
            &RetryPolicy::rate_limit_only(quick(3)),
            "search",
        )
        .await;

        match result {
            Err(Error::RetriesExhausted { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_jitter_calculation() {
        let delay = Duration::from_millis(1000);
        let jittered = add_jitter(delay, 0.1);

        assert!(jittered >= delay);
        assert!(jittered <= delay + Duration::from_millis(100));
    }

    #[test]
    fn test_retry_after_is_capped() {
        let config = quick(3);
        let error = Error::RateLimitExceeded {
            retry_after: Duration::from_secs(120),
        };
        assert_eq!(calculate_delay(0, &config, &error), config.max_delay);
    }

    #[test]
    fn test_backoff_grows_exponentially() {
        let config = RetryConfig::from(&RetrySettings {
            jitter: 0.0,
            ..RetrySettings::default()
        });
        let error = throttled();
        assert_eq!(calculate_delay(0, &config, &error), Duration::from_secs(2));
        assert_eq!(calculate_delay(1, &config, &error), Duration::from_secs(3));
        assert_eq!(calculate_delay(20, &config, &error), config.max_delay);
    }
}
