//! Result shapes returned by broker operations.
//!
//! All of them serialize with camelCase field names and epoch-millisecond
//! timestamps, which is what the HTTP layer sends back verbatim.

use serde::Serialize;
use spool_core::{BrokerError, EventId, Payload, ReceiptId};

use crate::inflight::InflightSummary;

/// Outcome of a successful enqueue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnqueueReceipt {
    /// Identifier assigned to the event
    pub id: EventId,
    /// Acceptance time
    pub timestamp: i64,
    /// Always `"queued"`
    pub status: &'static str,
}

impl EnqueueReceipt {
    pub(crate) fn queued(id: EventId, timestamp: i64) -> Self {
        Self { id, timestamp, status: "queued" }
    }
}

/// One event handed to a consumer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumedEvent {
    /// Token required to acknowledge or nack this delivery
    pub receipt_id: ReceiptId,
    /// Event identifier
    pub id: EventId,
    /// Producer-supplied body
    pub payload: Payload,
    /// Time the event was first accepted
    pub timestamp: i64,
    /// Failed delivery cycles so far
    pub retries: u32,
    /// Routing label, when the event has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Time of this delivery
    pub delivered_at: i64,
}

/// Per-receipt result of a batch acknowledge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AckOutcome {
    /// Receipts whose events are now committed
    pub acknowledged: Vec<String>,
    /// Receipts that did not resolve to a live delivery
    pub failed: Vec<AckFailure>,
}

/// Why one receipt could not be acknowledged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AckFailure {
    /// The receipt as supplied
    pub receipt_id: String,
    /// Human-readable reason
    pub reason: String,
    /// Stable error code
    pub code: &'static str,
}

impl AckFailure {
    pub(crate) fn new(receipt_id: &str, error: &BrokerError) -> Self {
        Self { receipt_id: receipt_id.to_string(), reason: error.to_string(), code: error.code() }
    }
}

/// Point-in-time view of the broker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrokerStatus {
    /// Queue occupancy
    pub queue: QueueStatus,
    /// Outstanding deliveries
    pub inflight: InflightStatus,
    /// Committed events known to this process
    pub committed: CountStatus,
    /// Dead-letter entries on disk
    pub dlq: CountStatus,
    /// Worker pool
    pub workers: WorkerStatus,
    /// Milliseconds since the broker opened
    pub uptime: u64,
}

/// Queue occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    /// Items queued
    pub size: usize,
    /// Capacity
    pub max_size: usize,
    /// `size / max_size` as a percentage, rounded to two decimals
    pub utilization_percent: f64,
}

impl QueueStatus {
    pub(crate) fn new(size: usize, max_size: usize) -> Self {
        let utilization_percent = if max_size == 0 {
            100.0
        } else {
            (size as f64 / max_size as f64 * 10_000.0).round() / 100.0
        };
        Self { size, max_size, utilization_percent }
    }
}

/// Outstanding deliveries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InflightStatus {
    /// Number of leases
    pub count: usize,
    /// Every lease, earliest deadline first
    pub events: Vec<InflightSummary>,
}

/// A bare count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountStatus {
    /// Number of items
    pub count: usize,
}

/// Worker pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkerStatus {
    /// Workers currently running
    pub active: usize,
    /// Workers configured
    pub total: usize,
}
