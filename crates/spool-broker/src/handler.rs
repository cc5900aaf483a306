//! Pluggable callback run by the internal worker pool.

use async_trait::async_trait;
use spool_core::EventRecord;
use tracing::info;

use crate::error::HandlerError;

/// Processes one event on behalf of a worker.
///
/// Returning `Ok` commits the event. Returning an error, or panicking,
/// counts as a failed cycle and goes through the retry policy.
#[async_trait]
pub trait EventHandler: Send + Sync + std::fmt::Debug {
    /// Handles `record`.
    async fn handle(&self, record: &EventRecord) -> Result<(), HandlerError>;
}

/// Handler that logs each event and succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogHandler;

#[async_trait]
impl EventHandler for LogHandler {
    async fn handle(&self, record: &EventRecord) -> Result<(), HandlerError> {
        info!(
            event_id = %record.id,
            topic = record.topic.as_deref().unwrap_or(""),
            retries = record.retries,
            "processing event"
        );
        Ok(())
    }
}
