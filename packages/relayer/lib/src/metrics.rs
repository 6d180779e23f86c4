//! Metrics module for the header relay.

#![allow(missing_docs)]

use prometheus::{register_int_counter_vec, register_int_gauge_vec, IntCounterVec, IntGaugeVec};
use std::sync::LazyLock;

/// Prometheus metric for the block number of the bridge endpoint, by network
pub static TARGET_BLOCK_NUMBER: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    register_int_gauge_vec!(
        "header_relay_target_block_number",
        "Block number of the endpoint recorded by the bridge",
        &["network"]
    )
    .unwrap()
});

/// Prometheus metric for the head block number of the source chain, by network
pub static SOURCE_HEAD_NUMBER: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    register_int_gauge_vec!(
        "header_relay_source_head_number",
        "Head block number of the source chain",
        &["network"]
    )
    .unwrap()
});

/// Prometheus metric for how many blocks the bridge lags behind the source chain, by network
pub static BLOCKS_BEHIND: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    register_int_gauge_vec!(
        "header_relay_blocks_behind",
        "Number of blocks the bridge lags behind the source chain",
        &["network"]
    )
    .unwrap()
});

/// Prometheus metric for blocks walked back while resolving reorgs, by network
pub static REWOUND_BLOCKS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "header_relay_rewound_blocks_total",
        "Total number of blocks rewound while searching for a common ancestor",
        &["network"]
    )
    .unwrap()
});

/// Prometheus metric for headers accepted for submission, by network
pub static SUBMITTED_HEADERS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "header_relay_submitted_headers_total",
        "Total number of submitted block headers",
        &["network"]
    )
    .unwrap()
});

/// Prometheus metric for rejected submissions, by network
pub static SUBMISSION_FAILURES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "header_relay_submission_failures_total",
        "Total number of rejected header submissions",
        &["network"]
    )
    .unwrap()
});

/// Prometheus metric for sync iterations, distinguished by network and outcome
pub static ITERATIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "header_relay_iterations_total",
        "Total number of sync iterations",
        &["network", "outcome"]
    )
    .unwrap()
});

fn as_gauge(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Records where the bridge and the source chain are.
pub fn record_position(network: &str, target_block_number: u64, source_head: u64) {
    TARGET_BLOCK_NUMBER
        .with_label_values(&[network])
        .set(as_gauge(target_block_number));
    SOURCE_HEAD_NUMBER
        .with_label_values(&[network])
        .set(as_gauge(source_head));
    BLOCKS_BEHIND
        .with_label_values(&[network])
        .set(as_gauge(source_head.saturating_sub(target_block_number)));
}

/// Records the result of a sync iteration.
pub fn record_iteration(network: &str, outcome: &str) {
    ITERATIONS.with_label_values(&[network, outcome]).inc();
}
