//! Execution strategy
//!
//! Runs a unit of work, repeating it when it fails with a transient error
//! (store busy or locked). The delay doubles from the base delay on every
//! retry and is capped at `MAX_DELAY`. Non-transient errors are returned
//! at once; a transient error still present after the last retry becomes
//! `RetryLimitExceeded` carrying that error.

use std::time::Duration;

use recipe_core::errors::ExError;
use recipe_core_types::schema::EVENT_RETRY;

use crate::config::StoreConfig;
use crate::errors::{retry_limit_exceeded, Result};

/// Longest wait between two attempts
pub const MAX_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionStrategy {
    max_retry_count: u32,
    base_delay: Duration,
}

impl ExecutionStrategy {
    pub fn new(max_retry_count: u32, base_delay: Duration) -> Self {
        Self {
            max_retry_count,
            base_delay,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.max_retry_count, config.retry_base_delay())
    }

    pub fn max_retry_count(&self) -> u32 {
        self.max_retry_count
    }

    /// Wait before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.base_delay
            .checked_mul(1 << exponent)
            .map_or(MAX_DELAY, |d| d.min(MAX_DELAY))
    }

    /// Run `work` until it succeeds, fails permanently or the retries run out
    ///
    /// `work` receives the attempt number, starting at 1.
    ///
    /// # Errors
    /// The first non-transient error, or `RetryLimitExceeded`.
    pub fn execute<T, F>(&self, op: &str, mut work: F) -> Result<T>
    where
        F: FnMut(u32) -> Result<T>,
    {
        let mut attempt = 1;
        loop {
            match work(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) if attempt > self.max_retry_count => {
                    return Err(self.exhausted(op, err));
                }
                Err(err) => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        op = op,
                        event = EVENT_RETRY,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }

    fn exhausted(&self, op: &str, last: ExError) -> ExError {
        tracing::error!(op = op, retries = self.max_retry_count, error = %last, "retry limit exceeded");
        retry_limit_exceeded(op, self.max_retry_count, last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recipe_core::errors::ExErrorKind;

    fn transient() -> ExError {
        ExError::new(ExErrorKind::Transient).with_message("database is locked")
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let strategy = ExecutionStrategy::new(3, Duration::from_millis(50));
        assert_eq!(strategy.delay_for(1), Duration::from_millis(50));
        assert_eq!(strategy.delay_for(2), Duration::from_millis(100));
        assert_eq!(strategy.delay_for(3), Duration::from_millis(200));
        assert_eq!(strategy.delay_for(40), MAX_DELAY);
    }

    #[test]
    fn test_succeeds_after_transient_failures() {
        let strategy = ExecutionStrategy::new(3, Duration::ZERO);
        let result = strategy.execute("test", |attempt| {
            if attempt < 3 {
                Err(transient())
            } else {
                Ok(attempt)
            }
        });
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn test_permanent_error_not_retried() {
        let strategy = ExecutionStrategy::new(3, Duration::ZERO);
        let mut calls = 0;
        let err = strategy
            .execute::<(), _>("test", |_| {
                calls += 1;
                Err(ExError::new(ExErrorKind::ConstraintViolation))
            })
            .unwrap_err();
        assert_eq!(calls, 1);
        assert_eq!(err.kind(), ExErrorKind::ConstraintViolation);
    }

    #[test]
    fn test_exhaustion_reports_retry_limit() {
        let strategy = ExecutionStrategy::new(2, Duration::ZERO);
        let mut calls = 0;
        let err = strategy
            .execute::<(), _>("save_changes", |_| {
                calls += 1;
                Err(transient())
            })
            .unwrap_err();
        assert_eq!(calls, 3);
        assert_eq!(err.kind(), ExErrorKind::RetryLimitExceeded);
        assert_eq!(
            err.source_error().map(|e| e.kind()),
            Some(ExErrorKind::Transient)
        );
    }
}
