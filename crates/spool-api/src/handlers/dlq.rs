//! Dead-letter inspection and reprocessing.

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use spool_broker::{EnqueueReceipt, MAX_DEAD_LETTER_PAGE};
use spool_core::DeadLetterEntry;
use tracing::instrument;

use crate::{error::ApiError, AppState};

/// Page size when the caller does not ask for one.
pub const DEFAULT_DEAD_LETTER_PAGE: usize = 100;

/// Query string of `GET /api/dlq`.
#[derive(Debug, Default, Deserialize)]
pub struct DeadLetterQuery {
    /// Page size, clamped to `1..=1000`
    pub limit: Option<usize>,
    /// Entries to skip
    pub offset: Option<usize>,
}

/// Body of `GET /api/dlq`.
#[derive(Debug, Serialize)]
pub struct DeadLetterPage {
    /// Entries in write order
    pub entries: Vec<DeadLetterEntry>,
    /// Entries on this page
    pub count: usize,
    /// Entries in the store
    pub total: usize,
    /// Effective page size
    pub limit: usize,
    /// Effective offset
    pub offset: usize,
}

/// Reads a page of dead-letter entries.
#[instrument(name = "list_dead_letters", skip_all)]
pub async fn list_dead_letters(
    State(state): State<AppState>,
    query: Result<Query<DeadLetterQuery>, QueryRejection>,
) -> Result<Json<DeadLetterPage>, ApiError> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_DEAD_LETTER_PAGE).clamp(1, MAX_DEAD_LETTER_PAGE);
    let offset = query.offset.unwrap_or(0);

    let entries = state.broker.dead_letters(limit, offset).await;
    let total = state.broker.dead_letter_count().await;
    Ok(Json(DeadLetterPage { count: entries.len(), entries, total, limit, offset }))
}

/// Enqueues a dead-lettered payload again as a new event.
#[instrument(name = "reprocess_dead_letter", skip_all)]
pub async fn reprocess_dead_letter(
    State(state): State<AppState>,
    receipt_id: Result<Path<String>, PathRejection>,
) -> Result<(StatusCode, Json<EnqueueReceipt>), ApiError> {
    let Path(receipt_id) = receipt_id?;

    let receipt = state.broker.reprocess_dead_letter(&receipt_id).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}
