//! Metrics collection.
//!
//! # Metrics
//! - `ledger_transactions_submitted_total` (counter): accepted submissions by kind
//! - `ledger_receipts_total` (counter): final receipts by kind, status
//! - `ledger_receipt_wait_seconds` (histogram): submit-to-receipt latency
//! - `ledger_queries_total` (counter): queries by name, outcome
//! - `ledger_subscription_messages_total` (counter): messages delivered to consumers
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; without an installed recorder
//!   every call is a no-op
//! - Label values are static strings from the domain enums

use std::time::Instant;

pub fn record_submission(kind: &'static str) {
    metrics::counter!("ledger_transactions_submitted_total", "kind" => kind).increment(1);
}

pub fn record_receipt(kind: &'static str, status: &'static str, submitted_at: Instant) {
    metrics::counter!("ledger_receipts_total", "kind" => kind, "status" => status).increment(1);
    metrics::histogram!("ledger_receipt_wait_seconds").record(submitted_at.elapsed().as_secs_f64());
}

pub fn record_query(query: &'static str, outcome: &'static str) {
    metrics::counter!("ledger_queries_total", "query" => query, "outcome" => outcome).increment(1);
}

pub fn record_subscription_message() {
    metrics::counter!("ledger_subscription_messages_total").increment(1);
}
