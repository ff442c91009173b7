//! Metrics collection.
//!
//! # Metrics
//! - `site_operations_total` (counter): site calls by operation and outcome
//! - `primitive_failures_total` (counter): failed primitive operations
//! - `transactions_total` (counter): transaction events (start, commit,
//!   discard, conflict)
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; without an installed recorder
//!   every call is a no-op
//! - Installing an exporter is left to the embedding application

/// Record the outcome of a site-level call.
pub fn record_site_operation(operation: &'static str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!(
        "site_operations_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a failed primitive operation during reconciliation.
pub fn record_primitive_failure(operation: &'static str) {
    metrics::counter!("primitive_failures_total", "operation" => operation).increment(1);
}

/// Record a transaction lifecycle event.
pub fn record_transaction(event: &'static str) {
    metrics::counter!("transactions_total", "event" => event).increment(1);
}
