//! Metrics definitions for the indexer.
//!
//! This module defines all metrics used throughout the indexer.
//! Metrics are collected using the `metrics` crate and can be exported
//! to Prometheus via `metrics-exporter-prometheus`.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

/// Initialize all metric descriptions.
/// Call this once at startup before any metrics are recorded.
pub fn init_metrics() {
    describe_counter!(
        "blocks_indexed_total",
        "Total number of blocks successfully fetched and dispatched to actions"
    );
    describe_counter!(
        "block_fetch_retries_total",
        "Total number of failed block fetch attempts that were retried"
    );
    describe_counter!(
        "block_fetch_failures_total",
        "Total number of heights whose fetch retry budget was exhausted in a pass"
    );
    describe_counter!(
        "action_errors_total",
        "Total number of block action execution errors"
    );
    describe_counter!(
        "indexing_passes_total",
        "Total number of completed fan-out passes"
    );
    describe_counter!(
        "txs_indexed_total",
        "Total number of transactions written by actions"
    );
    describe_histogram!(
        "block_processing_duration_seconds",
        "Time taken to run all actions against one block in seconds"
    );
}

/// Record a successfully processed block.
pub fn record_block_indexed() {
    counter!("blocks_indexed_total").increment(1);
}

/// Record a retried block fetch attempt.
pub fn record_fetch_retry() {
    counter!("block_fetch_retries_total").increment(1);
}

/// Record a height whose retry budget was exhausted.
pub fn record_fetch_failure() {
    counter!("block_fetch_failures_total").increment(1);
}

/// Record a block action execution error.
///
/// # Arguments
/// * `action` - The action name
pub fn record_action_error(action: &str) {
    counter!("action_errors_total", "action" => action.to_string()).increment(1);
}

/// Record a completed fan-out pass.
pub fn record_pass_completed() {
    counter!("indexing_passes_total").increment(1);
}

/// Record a transaction written by an action.
///
/// # Arguments
/// * `action` - The action name
pub fn record_tx_indexed(action: &str) {
    counter!("txs_indexed_total", "action" => action.to_string()).increment(1);
}

/// Record block processing duration.
pub fn record_block_processing_duration(duration_secs: f64) {
    histogram!("block_processing_duration_seconds").record(duration_secs);
}

/// A timer that automatically records duration when dropped.
pub struct ProcessingTimer {
    start: Instant,
}

impl ProcessingTimer {
    /// Start a new processing timer.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for ProcessingTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProcessingTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        record_block_processing_duration(duration);
    }
}
