use std::time::Duration;

use metrics::{counter, gauge, histogram};

pub(crate) fn record_occurrence(status: &str) {
    counter!(
        "avs_node_occurrences_total",
        "status" => status.to_string()
    )
    .increment(1);
}

pub(crate) fn record_reconnect_attempt(attempt: u32) {
    counter!("avs_node_reconnect_attempts_total").increment(1);
    gauge!("avs_node_reconnect_attempt").set(attempt as f64);
}

pub(crate) fn record_backfill(blocks_behind: u64, occurrences: usize) {
    counter!("avs_node_backfill_runs_total").increment(1);
    histogram!("avs_node_backfill_blocks").record(blocks_behind as f64);
    counter!("avs_node_backfill_occurrences_total").increment(occurrences as u64);
}

pub(crate) fn record_response_transaction(function: &str, status: &str, duration: Duration) {
    counter!(
        "avs_node_response_tx_total",
        "function" => function.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "avs_node_response_tx_duration_seconds",
        "function" => function.to_string(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());
}
