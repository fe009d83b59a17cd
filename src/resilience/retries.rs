//! Retry logic.
//!
//! # Responsibilities
//! - Retry idempotent reads on transport failure with backoff + jitter
//! - Bound the number of attempts
//!
//! # Design Decisions
//! - Never used for submissions: a resent mutation could apply twice
//! - Only `LedgerError::Network` is retried; everything else returns at once

use std::future::Future;

use crate::config::schema::RetryConfig;
use crate::ledger::error::LedgerResult;
use crate::resilience::backoff::calculate_backoff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// Single attempt, no waiting.
    pub const NONE: RetryPolicy = RetryPolicy {
        max_attempts: 1,
        base_delay_ms: 0,
        max_delay_ms: 0,
    };
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or
/// `policy.max_attempts` is used up.
pub async fn retry_idempotent<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> LedgerResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = LedgerResult<T>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                let delay = calculate_backoff(attempt, policy.base_delay_ms, policy.max_delay_ms);
                tracing::info!(what = %what, attempt = attempt, delay = ?delay, error = %e, "Retrying after network error");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::error::LedgerError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay_ms: 1,
            max_delay_ms: 2,
        }
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = retry_idempotent(&fast(3), "query", move || async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(LedgerError::Network("connection reset".into()))
            } else {
                Ok("balance")
            }
        })
        .await;
        assert_eq!(result, Ok("balance"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: LedgerResult<()> = retry_idempotent(&fast(2), "query", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(LedgerError::Network("down".into()))
        })
        .await;
        assert!(matches!(result, Err(LedgerError::Network(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_error_returns_immediately() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: LedgerResult<()> = retry_idempotent(&fast(5), "query", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(LedgerError::Query("no such topic".into()))
        })
        .await;
        assert!(matches!(result, Err(LedgerError::Query(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
