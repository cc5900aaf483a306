//! Event records, identifiers and dead-letter entries.
//!
//! These are the shapes that reach disk. `EventRecord` is one line of the
//! durable event log, `DeadLetterEntry` one line of the dead-letter log.
//! Field names are camelCase on the wire and timestamps are epoch
//! milliseconds, so logs written by one build stay readable by the next.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{BrokerError, Result};

/// Structured event body. Always a JSON object.
pub type Payload = serde_json::Map<String, Value>;

/// Identifier of an event.
///
/// Taken from the payload's `id` field when the producer supplies one,
/// otherwise a random UUID.
///
/// ```
/// use spool_core::models::EventId;
///
/// let id = EventId::new("order-42");
/// assert_eq!(id.as_str(), "order-42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Wraps an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Picks the identifier for a new event from its payload.
    ///
    /// A non-empty string or an integer `id` is honored. A missing or null
    /// `id` produces a generated one. Anything else is rejected.
    pub fn from_payload(payload: &Payload) -> Result<Self> {
        match payload.get("id") {
            None | Some(Value::Null) => Ok(Self::generate()),
            Some(Value::String(id)) if !id.trim().is_empty() => Ok(Self::new(id.as_str())),
            Some(Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(Self::new(n.to_string())),
            Some(other) => Err(BrokerError::invalid_event(format!(
                "payload id must be a non-empty string or an integer, got {other}"
            ))),
        }
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Opaque token naming one delivery of an event to a consumer, or one
/// dead-letter entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptId(String);

impl ReceiptId {
    /// Generates a fresh receipt.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the receipt as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ReceiptId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ReceiptId {
    fn from(receipt: &str) -> Self {
        Self(receipt.to_string())
    }
}

impl From<String> for ReceiptId {
    fn from(receipt: String) -> Self {
        Self(receipt)
    }
}

/// One event as stored in the durable log and carried through the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event identifier
    pub id: EventId,
    /// Time the event was first accepted
    #[serde(rename = "ts", with = "chrono::serde::ts_milliseconds")]
    pub enqueued_at: DateTime<Utc>,
    /// Producer-supplied body
    pub payload: Payload,
    /// Failed delivery cycles so far
    #[serde(default)]
    pub retries: u32,
    /// Optional routing label used by topic-filtered consumes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

impl EventRecord {
    /// Creates a record with zero retries.
    pub fn new(
        id: EventId,
        payload: Payload,
        topic: Option<String>,
        enqueued_at: DateTime<Utc>,
    ) -> Self {
        Self { id, enqueued_at, payload, retries: 0, topic }
    }

    /// Whether the record is eligible for a consume filtered by `topic`.
    ///
    /// No filter matches every record.
    pub fn matches_topic(&self, topic: Option<&str>) -> bool {
        match topic {
            None => true,
            Some(wanted) => self.topic.as_deref() == Some(wanted),
        }
    }
}

/// Why an event ended up in the dead-letter store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadLetterReason {
    /// The queue was full when the producer enqueued it.
    QueueFullOnEnqueue,
    /// The queue was full when a retry tried to re-admit it.
    #[serde(alias = "queue_full_on_reaper")]
    QueueFullOnRequeue,
    /// A consumer negatively acknowledged it past the retry limit.
    MaxRetriesExceeded,
    /// A consumer negatively acknowledged it without requeue.
    RejectedByConsumer,
    /// The worker callback failed past the retry limit.
    #[serde(alias = "max_retries")]
    HandlerMaxRetries,
    /// Its visibility timeout expired past the retry limit.
    VisibilityTimeoutMaxRetries,
    /// The queue was full while replaying the log at startup.
    StartupQueueFull,
    /// Written by a newer build with a reason this build does not know.
    #[serde(other)]
    Unknown,
}

impl DeadLetterReason {
    /// The on-disk tag.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::QueueFullOnEnqueue => "queue_full_on_enqueue",
            Self::QueueFullOnRequeue => "queue_full_on_requeue",
            Self::MaxRetriesExceeded => "max_retries_exceeded",
            Self::RejectedByConsumer => "rejected_by_consumer",
            Self::HandlerMaxRetries => "handler_max_retries",
            Self::VisibilityTimeoutMaxRetries => "visibility_timeout_max_retries",
            Self::StartupQueueFull => "startup_queue_full",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DeadLetterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the dead-letter log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetterEntry {
    /// Identifier of this entry, distinct from any delivery receipt
    pub receipt_id: ReceiptId,
    /// When the event was dead-lettered
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// What triggered dead-lettering
    pub reason: DeadLetterReason,
    /// The event as it was at that moment, including its retry count
    pub record: EventRecord,
    /// Last handler error, when a handler failure triggered it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeadLetterEntry {
    /// Creates an entry with a fresh receipt.
    pub fn new(
        record: EventRecord,
        reason: DeadLetterReason,
        error: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self { receipt_id: ReceiptId::generate(), timestamp, reason, record, error }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn event_id_prefers_payload_id() {
        let id = EventId::from_payload(&payload(json!({"id": "abc", "n": 1}))).unwrap();
        assert_eq!(id.as_str(), "abc");

        let id = EventId::from_payload(&payload(json!({"id": 42}))).unwrap();
        assert_eq!(id.as_str(), "42");
    }

    #[test]
    fn event_id_generated_when_absent() {
        let first = EventId::from_payload(&payload(json!({"n": 1}))).unwrap();
        let second = EventId::from_payload(&payload(json!({"id": null}))).unwrap();

        assert_ne!(first, second);
        assert!(Uuid::parse_str(first.as_str()).is_ok());
    }

    #[test]
    fn event_id_rejects_structured_ids() {
        let err = EventId::from_payload(&payload(json!({"id": {"nested": true}}))).unwrap_err();
        assert_eq!(err.code(), "INVALID_EVENT");

        let err = EventId::from_payload(&payload(json!({"id": "  "}))).unwrap_err();
        assert_eq!(err.code(), "INVALID_EVENT");
    }

    #[test]
    fn record_serializes_as_log_line() {
        let ts = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let record =
            EventRecord::new(EventId::new("e1"), payload(json!({"id": "e1", "n": 1})), None, ts);

        let line = serde_json::to_value(&record).unwrap();

        assert_eq!(
            line,
            json!({"id": "e1", "ts": 1_700_000_000_123_i64, "payload": {"id": "e1", "n": 1}, "retries": 0})
        );
    }

    #[test]
    fn record_without_retries_field_defaults_to_zero() {
        let record: EventRecord =
            serde_json::from_str(r#"{"id":"e1","ts":1,"payload":{},"topic":"billing"}"#).unwrap();

        assert_eq!(record.retries, 0);
        assert_eq!(record.topic.as_deref(), Some("billing"));
    }

    #[test]
    fn topic_filter_matching() {
        let mut record = EventRecord::new(EventId::new("e"), Payload::new(), None, Utc::now());
        assert!(record.matches_topic(None));
        assert!(!record.matches_topic(Some("a")));

        record.topic = Some("a".to_string());
        assert!(record.matches_topic(Some("a")));
        assert!(!record.matches_topic(Some("b")));
    }

    #[test]
    fn unknown_dead_letter_reason_is_tolerated() {
        let reason: DeadLetterReason = serde_json::from_str(r#""poison_pill""#).unwrap();
        assert_eq!(reason, DeadLetterReason::Unknown);

        let tag = serde_json::to_string(&DeadLetterReason::QueueFullOnEnqueue).unwrap();
        assert_eq!(tag, r#""queue_full_on_enqueue""#);
    }

    #[test]
    fn legacy_dead_letter_tags_keep_their_reason() {
        let reason: DeadLetterReason = serde_json::from_str(r#""max_retries""#).unwrap();
        assert_eq!(reason, DeadLetterReason::HandlerMaxRetries);

        let reason: DeadLetterReason = serde_json::from_str(r#""queue_full_on_reaper""#).unwrap();
        assert_eq!(reason, DeadLetterReason::QueueFullOnRequeue);

        let reason: DeadLetterReason = serde_json::from_str(r#""max_retries_exceeded""#).unwrap();
        assert_eq!(reason, DeadLetterReason::MaxRetriesExceeded);

        let tag = serde_json::to_string(&DeadLetterReason::HandlerMaxRetries).unwrap();
        assert_eq!(tag, r#""handler_max_retries""#);
    }
}
