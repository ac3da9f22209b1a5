//! Metrics for the alloy-backed L1 provider.

use lazy_static::lazy_static;
use prometheus::{self, register_counter_vec, register_histogram_vec, CounterVec, HistogramVec};

const RESPONSE_TIME_CUSTOM_BUCKETS: &[f64; 14] = &[
    0.001, 0.002, 0.005, 0.008, 0.01, 0.02, 0.05, 0.08, 0.1, 0.2, 0.5, 0.8, 1.0, 2.0,
];

lazy_static! {
    /// Tracks the number of L1 provider method calls.
    pub static ref PROVIDER_CALLS: CounterVec = register_counter_vec!(
        "op_deposit_provider_calls",
        "Number of L1 provider method calls",
        &["provider", "method"]
    ).expect("Provider Calls failed to register");

    /// Tracks the number of L1 provider method errors.
    pub static ref PROVIDER_ERRORS: CounterVec = register_counter_vec!(
        "op_deposit_provider_errors",
        "Number of L1 provider method errors",
        &["provider", "method"]
    ).expect("Provider Errors failed to register");

    /// Tracks the time taken for L1 provider methods.
    pub static ref PROVIDER_RESPONSE_TIME: HistogramVec = register_histogram_vec!(
        "op_deposit_provider_response_time_seconds",
        "L1 provider response times",
        &["provider", "method"],
        RESPONSE_TIME_CUSTOM_BUCKETS.to_vec()
    )
    .expect("Failed to register histogram vec");
}
