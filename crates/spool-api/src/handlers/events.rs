//! Producer and consumer endpoints.

use std::time::Duration;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use spool_broker::{AckOutcome, ConsumedEvent, EnqueueReceipt};
use spool_core::BrokerError;
use tracing::{debug, instrument};

use crate::{error::ApiError, AppState};

/// Query string of `POST /api/events`.
#[derive(Debug, Default, Deserialize)]
pub struct EnqueueQuery {
    /// Routing label for the event
    pub topic: Option<String>,
}

/// Query string of `GET /api/events/consume`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeQuery {
    /// Batch size; the configured default when absent
    pub max_events: Option<usize>,
    /// Longest wait for the batch to fill, in milliseconds
    pub timeout_ms: Option<u64>,
    /// Only take events carrying this topic
    pub topic: Option<String>,
}

/// Body of `GET /api/events/consume`.
#[derive(Debug, Serialize)]
pub struct ConsumeResponse {
    /// Leased events, oldest first
    pub events: Vec<ConsumedEvent>,
    /// Number of leased events
    pub count: usize,
}

/// Body of `POST /api/events/acknowledge`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgeRequest {
    /// Receipts to commit
    #[serde(default)]
    pub receipt_ids: Vec<String>,
}

/// Query string of `POST /api/events/{receiptId}/nack`.
#[derive(Debug, Default, Deserialize)]
pub struct NackQuery {
    /// Whether the event goes back through the retry policy; defaults to
    /// `true`
    pub requeue: Option<bool>,
}

/// Body of `POST /api/events/{receiptId}/nack`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NackResponse {
    /// The nacked receipt
    pub receipt_id: String,
    /// Always `"nacked"`
    pub status: &'static str,
    /// Whether the event was requeued rather than dead-lettered
    pub requeue: bool,
}

/// Accepts an event. The request body is the payload.
#[instrument(name = "enqueue_event", skip_all)]
pub async fn enqueue_event(
    State(state): State<AppState>,
    query: Result<Query<EnqueueQuery>, QueryRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<EnqueueReceipt>), ApiError> {
    let Query(query) = query?;
    let Json(payload) = body?;

    let receipt = state.broker.enqueue(payload, query.topic).await?;
    debug!(event_id = %receipt.id, "event accepted");
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Leases a batch of events, waiting up to the requested timeout.
#[instrument(name = "consume_events", skip_all)]
pub async fn consume_events(
    State(state): State<AppState>,
    query: Result<Query<ConsumeQuery>, QueryRejection>,
) -> Result<Json<ConsumeResponse>, ApiError> {
    let Query(query) = query?;
    let max_events = query.max_events.unwrap_or(state.broker.config().max_events_per_poll);
    let timeout = query.timeout_ms.map(Duration::from_millis);
    let topic = query.topic.as_deref().filter(|t| !t.is_empty());

    let events = state.broker.consume(max_events, timeout, topic).await;
    Ok(Json(ConsumeResponse { count: events.len(), events }))
}

/// Commits a batch of receipts. Receipts that do not resolve are reported
/// per item.
#[instrument(name = "acknowledge_events", skip_all)]
pub async fn acknowledge_events(
    State(state): State<AppState>,
    body: Result<Json<AcknowledgeRequest>, JsonRejection>,
) -> Result<Json<AckOutcome>, ApiError> {
    let Json(request) = body?;
    if request.receipt_ids.is_empty() {
        return Err(BrokerError::invalid_event("receiptIds must be a non-empty array").into());
    }

    let outcome = state.broker.acknowledge(&request.receipt_ids).await?;
    Ok(Json(outcome))
}

/// Ends one delivery without committing it.
#[instrument(name = "nack_event", skip_all)]
pub async fn nack_event(
    State(state): State<AppState>,
    receipt_id: Result<Path<String>, PathRejection>,
    query: Result<Query<NackQuery>, QueryRejection>,
) -> Result<Json<NackResponse>, ApiError> {
    let Path(receipt_id) = receipt_id?;
    let Query(query) = query?;
    let requeue = query.requeue.unwrap_or(true);

    state.broker.nack(&receipt_id, requeue).await?;
    Ok(Json(NackResponse { receipt_id, status: "nacked", requeue }))
}
