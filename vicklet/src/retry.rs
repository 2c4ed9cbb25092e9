//! Exponential backoff for backend calls.
//!
//! Two policies exist. Stop and remove re-run while the portlayer answers
//! Conflict; the readiness gate re-probes until both services answer.
//! Anything `should_retry` rejects is returned immediately.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

// ============================================================================
// Retry Configuration Constants
// ============================================================================

/// Total time budget shared by every policy.
const MAX_ELAPSED_SECS: u64 = 10 * 60;

const CONFLICT_INITIAL_DELAY_MS: u64 = 200;
const CONFLICT_MAX_DELAY_SECS: u64 = 10;
const CONFLICT_MULTIPLIER: f64 = 1.5;

const READINESS_INITIAL_DELAY_MS: u64 = 500;
const READINESS_MAX_DELAY_SECS: u64 = 2;
const READINESS_MULTIPLIER: f64 = 2.0;

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Caps exponential growth of the delay.
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// No new attempt starts once this much time has passed since the first.
    pub max_elapsed: Duration,
}

impl RetryConfig {
    /// Policy for stop/remove loops retrying on Conflict.
    pub fn for_conflict() -> Self {
        Self {
            initial_delay: Duration::from_millis(CONFLICT_INITIAL_DELAY_MS),
            max_delay: Duration::from_secs(CONFLICT_MAX_DELAY_SECS),
            backoff_multiplier: CONFLICT_MULTIPLIER,
            max_elapsed: Duration::from_secs(MAX_ELAPSED_SECS),
        }
    }

    /// Policy for the startup readiness gate.
    pub fn for_readiness() -> Self {
        Self {
            initial_delay: Duration::from_millis(READINESS_INITIAL_DELAY_MS),
            max_delay: Duration::from_secs(READINESS_MAX_DELAY_SECS),
            backoff_multiplier: READINESS_MULTIPLIER,
            max_elapsed: Duration::from_secs(MAX_ELAPSED_SECS),
        }
    }

    /// Delay that follows `current`.
    fn next_delay(&self, current: Duration) -> Duration {
        let next = current.mul_f64(self.backoff_multiplier);
        next.min(self.max_delay)
    }
}

/// Execute an async operation with retry logic.
///
/// `should_retry` decides whether an error is transient. The last error is
/// returned once the elapsed budget would be exceeded by the next sleep.
///
/// # Example
///
/// ```ignore
/// retry_with_backoff(
///     RetryConfig::for_conflict(),
///     "remove pod",
///     || proxy.remove(&id, true),
///     VickletError::is_conflict,
/// )
/// .await?;
/// ```
pub async fn retry_with_backoff<T, E, F, Fut, R>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
    should_retry: R,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let started = Instant::now();
    let mut attempt: u32 = 0;
    let mut delay = config.initial_delay;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(operation = operation_name, attempt, "operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) => {
                if !should_retry(&e) {
                    return Err(e);
                }

                if started.elapsed() + delay > config.max_elapsed {
                    warn!(
                        operation = operation_name,
                        attempt,
                        error = %e,
                        "retry budget exhausted"
                    );
                    return Err(e);
                }

                debug!(
                    operation = operation_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "retrying after backoff"
                );
                tokio::time::sleep(delay).await;
                delay = config.next_delay(delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use vicklet_shared::errors::VickletError;

    #[test]
    fn test_delay_is_capped() {
        let config = RetryConfig::for_readiness();
        let mut delay = config.initial_delay;
        for _ in 0..10 {
            delay = config.next_delay(delay);
        }
        assert_eq!(delay, Duration::from_secs(2));
    }

    #[test]
    fn test_readiness_first_step() {
        let config = RetryConfig::for_readiness();
        assert_eq!(
            config.next_delay(config.initial_delay),
            Duration::from_secs(1)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_conflict_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<u32, VickletError> = retry_with_backoff(
            &RetryConfig::for_conflict(),
            "test",
            || {
                let counter = counter.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        Err(VickletError::Conflict("busy".into()))
                    } else {
                        Ok(n)
                    }
                }
            },
            VickletError::is_conflict,
        )
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_returns_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), VickletError> = retry_with_backoff(
            &RetryConfig::for_conflict(),
            "test",
            || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(VickletError::Internal("boom".into())) }
            },
            VickletError::is_conflict,
        )
        .await;

        assert_eq!(result.unwrap_err(), VickletError::Internal("boom".into()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_elapsed() {
        let started = Instant::now();
        let config = RetryConfig::for_readiness();

        let result: Result<(), VickletError> = retry_with_backoff(
            &config,
            "test",
            || async { Err(VickletError::Transport("refused".into())) },
            |_| true,
        )
        .await;

        assert!(result.unwrap_err().is_transport());
        assert!(started.elapsed() <= config.max_elapsed);
        assert!(started.elapsed() >= config.max_elapsed - config.max_delay);
    }
}
