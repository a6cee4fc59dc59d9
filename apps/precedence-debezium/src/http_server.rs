use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use precedence_node::{MetricsSnapshot, RelayMetrics};
use serde::Deserialize;
use serde_json::json;

use crate::logger::LogBuffer;

#[derive(Clone)]
pub struct HealthState {
    pub metrics: Arc<RelayMetrics>,
    pub log_buffer: Arc<LogBuffer>,
}

pub fn build_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/metrics", get(metrics))
        .route("/logs", get(logs))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn metrics(State(state): State<HealthState>) -> impl IntoResponse {
    metrics_body(&state.metrics.snapshot())
}

fn metrics_body(metrics: &MetricsSnapshot) -> String {
    format!(
        "precedence_records_seen_total {}\nprecedence_tombstones_total {}\nprecedence_decode_failures_total {}\nprecedence_created_total {}\nprecedence_conflicts_total {}\nprecedence_transient_failures_total {}\nprecedence_pipeline_starts_total {}\nprecedence_subscribed_topics {}\n",
        metrics.records_seen,
        metrics.tombstones,
        metrics.decode_failures,
        metrics.created,
        metrics.conflicts,
        metrics.transient_failures,
        metrics.pipeline_starts,
        metrics.subscribed_topics,
    )
}

#[derive(Deserialize)]
struct LogsQuery {
    limit: Option<usize>,
}

async fn logs(
    State(state): State<HealthState>,
    Query(query): Query<LogsQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(200).min(1000);
    Json(json!({ "ok": true, "logs": state.log_buffer.recent(limit) }))
}
