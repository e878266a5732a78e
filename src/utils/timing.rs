use std::fmt::Debug;
use std::future::Future;
use std::time::{Duration, Instant};

use itertools::Itertools;
use tokio::time;
use tracing::Instrument;

use crate::github::api::DEFAULT_REQUEST_TIMEOUT;

/// Signals if a retryable operation should be retried or not.
pub enum ShouldRetry<E> {
    Yes(E),
    No(E),
}

/// If we have a general error, we convert it to `ShouldRetry::Yes` automatically.
impl From<anyhow::Error> for ShouldRetry<anyhow::Error> {
    fn from(error: anyhow::Error) -> Self {
        Self::Yes(error)
    }
}

/// Decides how will a retryable operation get retried in case it times out or fails.
#[derive(Debug, Clone)]
pub struct RetryMethod {
    /// After how much time should a single attempt time out.
    timeout_after: Duration,
    /// How many total attempts should be performed.
    /// An attempt might be performed either because a timeout happened, or because an error was
    /// returned.
    max_attempts: u32,
    /// Should we retry when an error was returned from the operation?
    retry_on_error: bool,
    /// For how much time should we sleep in-between attempts.
    backoff_time: Duration,
}

impl RetryMethod {
    /// Perform a single attempt, bounded only by the timeout.
    pub fn no_retry() -> Self {
        Self {
            retry_on_error: false,
            max_attempts: 1,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_after = timeout;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff_time = backoff;
        self
    }
}

/// The default is one attempt plus a single retry.
impl Default for RetryMethod {
    fn default() -> Self {
        Self {
            timeout_after: DEFAULT_REQUEST_TIMEOUT,
            max_attempts: 2,
            retry_on_error: true,
            #[cfg(not(test))]
            backoff_time: Duration::from_secs(2),
            #[cfg(test)]
            backoff_time: Duration::from_millis(10),
        }
    }
}

/// Represents the result of a fallible/retryable operation.
#[derive(Debug)]
pub enum RetryableOpError<E> {
    /// The operation ended with an error on its last attempt.
    Err(E),
    /// The operation ended with a timeout on its last attempt.
    /// The data contains all previously encountered errors.
    AllAttemptsExhausted(Vec<anyhow::Error>),
}

impl<E: Into<anyhow::Error>> From<RetryableOpError<E>> for anyhow::Error {
    fn from(value: RetryableOpError<E>) -> Self {
        match value {
            RetryableOpError::Err(error) => error.into(),
            RetryableOpError::AllAttemptsExhausted(errors) => anyhow::anyhow!(
                "All attempts were exhausted, the operation was not performed successfully. Errors:\n{}",
                errors
                    .into_iter()
                    .map(|error| format!("{error:?}"))
                    .join("\n")
            ),
        }
    }
}

/// Perform an asynchronous retryable operation.
///
/// Every attempt is bounded by the timeout of `retry_method`, so the caller is never blocked
/// indefinitely by an unresponsive remote service.
///
/// If the operation returns an error and it was retried, the last received error will be returned
/// from the function.
///
/// The caller can explicitly specify which errors should be retried and which shouldn't.
/// By default, all errors will be turned into `ShouldRetry::Yes` due to a blanket impl.
/// If you hit an inference error, you might want to return e.g. `anyhow::Ok(...)` from `func`.
pub async fn perform_retryable<T, E, R, F, Fut>(
    operation_name: &str,
    retry_method: RetryMethod,
    func: F,
) -> Result<T, RetryableOpError<E>>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, R>>,
    R: Into<ShouldRetry<E>>,
    E: Debug,
{
    let span = tracing::debug_span!("Retryable op", operation = operation_name);

    let mut errors = vec![];
    for attempt in 1..=retry_method.max_attempts {
        let last_attempt = attempt == retry_method.max_attempts;

        let start = Instant::now();

        span.in_scope(|| {
            tracing::trace!(attempt = attempt, "Starting");
        });

        let future =
            time::timeout(retry_method.timeout_after, func()).instrument(span.clone());

        let result: Option<Result<T, ShouldRetry<E>>> = match future.await {
            Ok(res) => Some(res.map_err(|e| e.into())),
            Err(_) => None,
        };

        let duration = format!("{:.2}ms", start.elapsed().as_secs_f64() * 1000.0);

        match result {
            Some(Ok(res)) => {
                span.in_scope(|| {
                    tracing::trace!(attempt = attempt, duration = %duration, "Completed");
                });
                return Ok(res);
            }
            Some(Err(ShouldRetry::Yes(error))) => {
                span.in_scope(|| {
                    tracing::warn!(attempt = attempt, duration = %duration, "Failed: {error:?}");
                });
                if last_attempt || !retry_method.retry_on_error {
                    return Err(RetryableOpError::Err(error));
                }

                errors.push(anyhow::anyhow!("{error:?}"));
            }
            Some(Err(ShouldRetry::No(error))) => return Err(RetryableOpError::Err(error)),
            None => {
                span.in_scope(|| {
                    tracing::warn!(attempt = attempt, duration = %duration, "Timed out");
                });
                errors.push(anyhow::anyhow!(
                    "Timeout after {}s",
                    retry_method.timeout_after.as_secs_f64()
                ));
            }
        };

        if !last_attempt {
            time::sleep(retry_method.backoff_time).await;
        }
    }

    span.in_scope(|| {
        tracing::debug!(
            "Operation failed after {} attempts",
            retry_method.max_attempts
        );
    });
    Err(RetryableOpError::AllAttemptsExhausted(errors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::Duration;
    use tokio::time::sleep;

    #[derive(Default)]
    struct AttemptCounter(Cell<u32>);

    impl AttemptCounter {
        fn increment(&self) {
            self.0.set(self.0.get() + 1);
        }

        fn get(&self) -> u32 {
            self.0.get()
        }
    }

    fn fast_retry() -> RetryMethod {
        RetryMethod::default()
            .with_timeout(Duration::from_millis(50))
            .with_backoff(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn default_retries_exactly_once() {
        let counter = AttemptCounter::default();

        let result: Result<(), RetryableOpError<anyhow::Error>> =
            perform_retryable("test_op", fast_retry(), || async {
                counter.increment();
                Err(anyhow::anyhow!("FooBarFail"))
            })
            .await;
        let error = anyhow::Error::from(result.expect_err("no error found"));

        assert!(format!("{error:?}").contains("FooBarFail"));
        assert_eq!(counter.get(), 2);
    }

    #[tokio::test]
    async fn retry_recovers_after_first_failure() {
        let counter = AttemptCounter::default();

        let result: Result<i32, RetryableOpError<anyhow::Error>> =
            perform_retryable("test_op", fast_retry(), || async {
                counter.increment();
                if counter.get() == 1 {
                    Err(anyhow::anyhow!("transient"))
                } else {
                    anyhow::Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.get(), 2);
    }

    #[tokio::test]
    async fn timeout_is_retried() {
        let counter = AttemptCounter::default();

        let error: RetryableOpError<anyhow::Error> =
            perform_retryable("test_op", fast_retry(), || async {
                counter.increment();
                sleep(Duration::from_millis(500)).await;
                anyhow::Ok(42)
            })
            .await
            .expect_err("no error found");

        assert!(matches!(error, RetryableOpError::AllAttemptsExhausted(ref errors) if errors.len() == 2));
        assert_eq!(counter.get(), 2);
    }

    #[tokio::test]
    async fn no_retry_performs_single_attempt() {
        let counter = AttemptCounter::default();

        let result: Result<(), RetryableOpError<anyhow::Error>> = perform_retryable(
            "test_op",
            RetryMethod::no_retry().with_timeout(Duration::from_secs(1000)),
            || async {
                counter.increment();
                Err(anyhow::anyhow!("FooBarFail"))
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(counter.get(), 1);
    }

    #[tokio::test]
    async fn no_retry_still_times_out() {
        let result: Result<i32, RetryableOpError<anyhow::Error>> = perform_retryable(
            "test_op",
            RetryMethod::no_retry().with_timeout(Duration::from_millis(10)),
            || async {
                sleep(Duration::from_millis(500)).await;
                anyhow::Ok(42)
            },
        )
        .await;

        assert!(matches!(
            result,
            Err(RetryableOpError::AllAttemptsExhausted(_))
        ));
    }

    #[tokio::test]
    async fn manual_retry_no() {
        let counter = AttemptCounter::default();

        let error: RetryableOpError<anyhow::Error> = perform_retryable(
            "test_op",
            fast_retry(),
            || async {
                counter.increment();
                Err::<(), _>(ShouldRetry::No(anyhow::anyhow!("FooBarFail")))
            },
        )
        .await
        .expect_err("no error found");

        assert!(format!("{error:?}").contains("FooBarFail"));
        assert_eq!(counter.get(), 1);
    }
}
