//! Bounded exponential backoff for calls to the source and the index.
//!
//! Only errors that classify themselves as transient are retried. Every
//! failed attempt is logged, and once the retries are spent the last error is
//! returned to the caller.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use movies_etl_repository::{SearchIndexError, SourceRepositoryError};
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::warn;

/// Backoff bounds for a retried operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for a single delay.
    pub max_delay: Duration,
    /// Retries after the first attempt. Zero disables retrying.
    pub max_retries: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            max_retries: 8,
        }
    }
}

impl RetryPolicy {
    /// Un-jittered delays: doubling from `initial_delay`, capped at `max_delay`.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        // ExponentialBackoff yields factor * base^n, so base 2 doubles each step.
        let factor = (self.initial_delay.as_millis() as u64 / 2).max(1);
        ExponentialBackoff::from_millis(2)
            .factor(factor)
            .max_delay(self.max_delay)
            .take(self.max_retries)
    }

    fn strategy(&self) -> impl Iterator<Item = Duration> {
        self.delays().map(jitter)
    }
}

/// Errors that know whether backing off and retrying can help.
pub trait RetryableError: std::fmt::Display {
    fn is_transient(&self) -> bool;
}

impl RetryableError for SourceRepositoryError {
    fn is_transient(&self) -> bool {
        SourceRepositoryError::is_transient(self)
    }
}

impl RetryableError for SearchIndexError {
    fn is_transient(&self) -> bool {
        SearchIndexError::is_transient(self)
    }
}

/// Run `action` until it succeeds, fails permanently or the policy is spent.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation: &'static str,
    mut action: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryableError,
{
    let attempts = AtomicUsize::new(0);
    let max_attempts = policy.max_retries + 1;

    RetryIf::spawn(
        policy.strategy(),
        || {
            attempts.fetch_add(1, Ordering::Relaxed);
            action()
        },
        |error: &E| {
            let attempt = attempts.load(Ordering::Relaxed);
            let transient = error.is_transient();
            if transient && attempt < max_attempts {
                warn!(
                    operation = operation,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    error = %error,
                    "Transient failure, backing off"
                );
            }
            transient
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct TestError {
        transient: bool,
    }

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test error (transient: {})", self.transient)
        }
    }

    impl RetryableError for TestError {
        fn is_transient(&self) -> bool {
            self.transient
        }
    }

    fn fast_policy(max_retries: usize) -> RetryPolicy {
        RetryPolicy {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
            max_retries,
        }
    }

    #[test]
    fn test_default_delays_double_and_cap() {
        let delays: Vec<u64> = RetryPolicy::default()
            .delays()
            .map(|d| d.as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![200, 400, 800, 1600, 3200, 6400, 10_000, 10_000]);
    }

    #[test]
    fn test_zero_retries_has_no_delays() {
        assert_eq!(fast_policy(0).delays().count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_are_retried_until_success() {
        let calls = AtomicUsize::new(0);

        let result: Result<&str, TestError> = retry(&fast_policy(5), "test", || {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if call < 2 {
                    Err(TestError { transient: true })
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_errors_are_not_retried() {
        let calls = AtomicUsize::new(0);

        let result: Result<(), TestError> = retry(&fast_policy(5), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(TestError { transient: false }) }
        })
        .await;

        assert!(!result.unwrap_err().transient);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_return_last_error() {
        let calls = AtomicUsize::new(0);

        let result: Result<(), TestError> = retry(&fast_policy(2), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(TestError { transient: true }) }
        })
        .await;

        assert!(result.unwrap_err().transient);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_repository_errors_classify_themselves() {
        let transient = SearchIndexError::from_status(503, "unavailable");
        let permanent = SearchIndexError::from_status(400, "mapper_parsing_exception");
        assert!(RetryableError::is_transient(&transient));
        assert!(!RetryableError::is_transient(&permanent));
        assert!(!RetryableError::is_transient(&SourceRepositoryError::NoJunction(
            movies_etl_shared::EntityStream::FilmWork
        )));
    }
}
