//! Liveness endpoint.

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::AppState;

/// Health check response structure.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"healthy"` while the process serves requests
    pub status: &'static str,
    /// Time of the check, epoch milliseconds
    pub timestamp: i64,
}

/// Health check endpoint handler.
///
/// Called frequently by orchestration systems and load balancers, so it
/// touches nothing but the clock.
#[instrument(name = "health_check", skip_all)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    debug!("performing health check");
    Json(HealthResponse { status: "healthy", timestamp: state.clock.now_millis() })
}
