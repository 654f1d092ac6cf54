//! Prometheus metrics for token issuance, verification and key management.

use once_cell::sync::Lazy;
use prometheus::{register_counter, register_counter_vec, Counter, CounterVec};

/// Tokens issued counter.
pub static TOKENS_ISSUED: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "token_authority_tokens_issued_total",
        "Total number of tokens issued"
    )
    .expect("Failed to register tokens_issued metric")
});

/// Verifications by outcome (`ok` or an error code).
pub static VERIFICATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "token_authority_verifications_total",
        "Total number of token verifications",
        &["outcome"]
    )
    .expect("Failed to register verifications metric")
});

/// Signing key rotations counter.
pub static KEY_ROTATIONS: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "token_authority_key_rotations_total",
        "Total number of signing key rotations"
    )
    .expect("Failed to register key_rotations metric")
});

/// Signing keys pruned counter.
pub static KEYS_PRUNED: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "token_authority_keys_pruned_total",
        "Total number of signing keys pruned after exceeding max age"
    )
    .expect("Failed to register keys_pruned metric")
});

/// Remote key set refreshes by status.
pub static JWKS_REFRESHES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "token_authority_jwks_refreshes_total",
        "Total number of remote key set refreshes",
        &["status"]
    )
    .expect("Failed to register jwks_refreshes metric")
});

/// Record a token issuance.
pub fn record_token_issued() {
    TOKENS_ISSUED.inc();
}

/// Record a verification outcome.
pub fn record_verification(outcome: &str) {
    VERIFICATIONS.with_label_values(&[outcome]).inc();
}

/// Record a key rotation.
pub fn record_key_rotation() {
    KEY_ROTATIONS.inc();
}

/// Record keys removed by pruning.
pub fn record_keys_pruned(count: usize) {
    if count > 0 {
        KEYS_PRUNED.inc_by(count as f64);
    }
}

/// Record a key set refresh.
pub fn record_jwks_refresh(status: &str) {
    JWKS_REFRESHES.with_label_values(&[status]).inc();
}
