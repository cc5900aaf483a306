//! Status and metrics snapshots.

use axum::{extract::State, Json};
use spool_broker::{BrokerStatus, MetricsSnapshot};
use tracing::instrument;

use crate::AppState;

/// Point-in-time view of queue, leases, commits, dead letters and workers.
#[instrument(name = "status", skip_all)]
pub async fn status(State(state): State<AppState>) -> Json<BrokerStatus> {
    Json(state.broker.status().await)
}

/// Lifetime counters and processing latency.
#[instrument(name = "metrics", skip_all)]
pub async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.broker.metrics())
}
