//! Prometheus metrics endpoint and metric descriptions.

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use metrics::Unit;
use metrics_exporter_prometheus::PrometheusHandle;

/// Registers help text for the metrics this service records.
///
/// Call once after the recorder is installed.
pub fn describe() {
    metrics::describe_counter!(
        "table_commands_total",
        "Table commands executed, labelled by aggregate and outcome"
    );
    metrics::describe_counter!(
        "table_write_conflicts_total",
        "Table saves rejected because another writer committed first"
    );
    metrics::describe_counter!(
        "table_store_timeouts_total",
        "Store calls abandoned after the persistence timeout"
    );
    metrics::describe_counter!(
        "order_notifications_failed_total",
        "Order ready notices that failed or timed out"
    );
    metrics::describe_histogram!(
        "table_command_duration_seconds",
        Unit::Seconds,
        "Time spent executing a table command, retries included"
    );
}

/// GET /metrics — renders the Prometheus exposition text.
pub async fn get(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        handle.render(),
    )
}
