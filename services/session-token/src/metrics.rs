//! Prometheus metrics for the session token service.
//!
//! Counters are registered on first use in the default registry.

use once_cell::sync::Lazy;
use prometheus::{CounterVec, HistogramVec, register_counter_vec, register_histogram_vec};

/// Token pairs issued.
pub static TOKEN_PAIRS_ISSUED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "session_token_pairs_issued_total",
        "Total number of token pairs issued",
        &["status"]
    )
    .expect("Failed to register token_pairs_issued metric")
});

/// Token verifications by token type and outcome code.
pub static TOKEN_VERIFICATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "session_token_verifications_total",
        "Total number of token verifications",
        &["token_type", "outcome"]
    )
    .expect("Failed to register token_verifications metric")
});

/// Revocations by reason.
pub static TOKENS_REVOKED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "session_token_revocations_total",
        "Total number of refresh tokens revoked",
        &["reason"]
    )
    .expect("Failed to register tokens_revoked metric")
});

/// Refresh rotations by status.
pub static ROTATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "session_token_rotations_total",
        "Total number of refresh token rotations",
        &["status"]
    )
    .expect("Failed to register rotations metric")
});

/// Ledger writes by marker, policy and status.
pub static LEDGER_WRITES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "session_token_ledger_writes_total",
        "Total number of revocation ledger writes",
        &["marker", "policy", "status"]
    )
    .expect("Failed to register ledger_writes metric")
});

/// Lifecycle operation latency.
pub static OPERATION_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "session_token_operation_latency_seconds",
        "Token lifecycle operation latency in seconds",
        &["operation"],
        vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register operation_latency metric")
});

/// Record an issuance attempt.
pub fn record_pair_issued(status: &str) {
    TOKEN_PAIRS_ISSUED.with_label_values(&[status]).inc();
}

/// Record a verification outcome (`ok` or an error code).
pub fn record_verification(token_type: &str, outcome: &str) {
    TOKEN_VERIFICATIONS
        .with_label_values(&[token_type, outcome])
        .inc();
}

/// Record a revocation.
pub fn record_revocation(reason: &str) {
    TOKENS_REVOKED.with_label_values(&[reason]).inc();
}

/// Record a rotation attempt.
pub fn record_rotation(status: &str) {
    ROTATIONS.with_label_values(&[status]).inc();
}

/// Record a ledger write.
pub fn record_ledger_write(marker: &str, policy: &str, status: &str) {
    LEDGER_WRITES
        .with_label_values(&[marker, policy, status])
        .inc();
}

/// Record operation latency.
pub fn record_latency(operation: &str, duration_secs: f64) {
    OPERATION_LATENCY
        .with_label_values(&[operation])
        .observe(duration_secs);
}
