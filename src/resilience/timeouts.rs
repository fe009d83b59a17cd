//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap read-only network calls with a deadline
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - An expired read is a `Network` error, so the retry layer may try again.
//!   Receipt waits use their own deadline and report `Timeout` instead.

use std::future::Future;
use std::time::Duration;

use crate::ledger::error::{LedgerError, LedgerResult};

pub async fn with_deadline<T, F>(deadline: Duration, what: &str, fut: F) -> LedgerResult<T>
where
    F: Future<Output = LedgerResult<T>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(LedgerError::Network(format!("{} timed out after {:?}", what, deadline))),
    }
}
