//! Payload and record fixtures.

use chrono::Utc;
use serde_json::Value;
use spool_core::{EventId, EventRecord, Payload};

/// Converts a JSON object literal into a [`Payload`].
///
/// # Panics
///
/// Panics when `value` is not an object.
pub fn payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture payload must be a JSON object, got {other}"),
    }
}

/// Builds a record with id `id`, an `{"id": id}` payload and no topic.
pub fn record(id: &str) -> EventRecord {
    let mut body = Payload::new();
    body.insert("id".to_string(), Value::String(id.to_string()));
    EventRecord::new(EventId::new(id), body, None, Utc::now())
}

/// Serializes `records` as the contents of an event log file.
pub fn event_log(records: &[EventRecord]) -> String {
    records
        .iter()
        .filter_map(|r| serde_json::to_string(r).ok())
        .map(|line| line + "\n")
        .collect()
}
