//! The resilient executor

use crate::backoff::RetryPolicy;
use crate::classifier::TransientClassifier;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Terminal outcome of a retried operation
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed with a transient error
    #[error("{operation} failed after {attempts} attempts: {last}")]
    Exhausted {
        operation: String,
        attempts: u32,
        last: E,
    },

    /// The classifier rejected the error; no retry was made
    #[error("{operation} failed: {error}")]
    Fatal { operation: String, error: E },
}

impl<E> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } => *attempts,
            RetryError::Fatal { .. } => 1,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }

    /// The last underlying error
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Fatal { error, .. } => error,
        }
    }
}

/// Runs an operation until it succeeds, fails fatally, or runs out of
/// attempts. Retries are sequential and block the caller.
#[derive(Debug, Clone, Default)]
pub struct ResilientExecutor {
    policy: RetryPolicy,
}

impl ResilientExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn execute<T, E, F, Fut, C>(
        &self,
        operation: &str,
        mut op: F,
        classifier: &C,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: TransientClassifier<E> + ?Sized,
        E: fmt::Display,
    {
        let max_attempts = self.policy.attempts();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) if !classifier.is_transient(&error) => {
                    warn!(operation, attempt, error = %error, "Non-transient failure");
                    return Err(RetryError::Fatal {
                        operation: operation.to_string(),
                        error,
                    });
                }
                Err(error) if attempt >= max_attempts => {
                    warn!(
                        operation,
                        attempts = attempt,
                        error = %error,
                        "Retries exhausted"
                    );
                    return Err(RetryError::Exhausted {
                        operation: operation.to_string(),
                        attempts: attempt,
                        last: error,
                    });
                }
                Err(error) => {
                    let delay = self.policy.backoff.delay(attempt);
                    warn!(
                        operation,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Pause after code upload so the platform can finish activating it
pub async fn wait_for_warmup(duration: Duration) {
    settle("warm-up", duration).await;
}

/// Bounded pause after an identity is created or assigned
pub async fn wait_for_propagation(duration: Duration) {
    settle("identity propagation", duration).await;
}

async fn settle(reason: &str, duration: Duration) {
    if duration.is_zero() {
        return;
    }
    info!(reason, wait_ms = duration.as_millis() as u64, "Waiting");
    tokio::time::sleep(duration).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::BackoffSchedule;
    use crate::classifier::NeverTransient;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, PartialEq)]
    enum Failure {
        Busy,
        Denied,
    }

    impl fmt::Display for Failure {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Failure::Busy => f.write_str("busy"),
                Failure::Denied => f.write_str("denied"),
            }
        }
    }

    fn busy_is_transient(e: &Failure) -> bool {
        *e == Failure::Busy
    }

    fn executor(attempts: u32) -> ResilientExecutor {
        ResilientExecutor::new(RetryPolicy::new(
            attempts,
            BackoffSchedule::Exponential {
                initial: Duration::from_secs(1),
                max: Duration::from_secs(10),
                multiplier: 2.0,
            },
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_twice_then_success() {
        let calls = &AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result = executor(5)
            .execute(
                "create_unit",
                move || async move {
                    match calls.fetch_add(1, Ordering::SeqCst) {
                        0 | 1 => Err(Failure::Busy),
                        _ => Ok("arn:unit"),
                    }
                },
                &busy_is_transient,
            )
            .await;

        assert_eq!(result.unwrap(), "arn:unit");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1s + 2s of backoff
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_transient_fails_immediately() {
        let calls = &AtomicU32::new(0);

        let result: Result<(), _> = executor(5)
            .execute(
                "assign_role",
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(Failure::Denied)
                },
                &busy_is_transient,
            )
            .await;

        let err = result.unwrap_err();
        assert!(!err.is_exhausted());
        assert_eq!(err.into_inner(), Failure::Denied);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_reports_attempts() {
        let calls = &AtomicU32::new(0);

        let result: Result<(), _> = executor(3)
            .execute(
                "upload_code",
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(Failure::Busy)
                },
                &busy_is_transient,
            )
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.attempts(), 3);
        assert_eq!(err.to_string(), "upload_code failed after 3 attempts: busy");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_transient_classifier() {
        let result: Result<(), _> = executor(5)
            .execute("describe", || async { Err(Failure::Busy) }, &NeverTransient)
            .await;
        assert_eq!(result.unwrap_err().attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_warmup_sleeps() {
        let started = tokio::time::Instant::now();
        wait_for_warmup(Duration::from_secs(15)).await;
        assert!(started.elapsed() >= Duration::from_secs(15));
    }
}
