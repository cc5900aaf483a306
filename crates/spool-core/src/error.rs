//! Broker error taxonomy.
//!
//! Every failure a caller of the broker can observe maps to one
//! [`BrokerError`] variant with a stable machine-readable code. The HTTP
//! layer turns codes into status codes; log lines and dead-letter entries
//! carry the display form.

use std::error::Error as StdError;

use thiserror::Error;

/// Result type alias using [`BrokerError`].
pub type Result<T> = std::result::Result<T, BrokerError>;

/// Boxed source error carried by [`BrokerError::Storage`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors returned by broker operations.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The bounded queue is at capacity.
    #[error("queue full: event {event_id} rejected at capacity {capacity}")]
    QueueFull {
        /// Event that could not be admitted
        event_id: String,
        /// Configured queue capacity
        capacity: usize,
    },

    /// Receipt or dead-letter entry is unknown.
    #[error("Invalid receipt ID: {receipt_id}")]
    EventNotFound {
        /// The identifier that did not resolve
        receipt_id: String,
    },

    /// The submitted event is malformed.
    #[error("invalid event: {reason}")]
    InvalidEvent {
        /// What was wrong with the event
        reason: String,
    },

    /// The receipt resolved, but its delivery is no longer in flight.
    #[error("Event not in-flight: {event_id}")]
    EventNotInflight {
        /// Event the receipt pointed at
        event_id: String,
    },

    /// A durable log could not be written or read.
    #[error("storage error during {operation}: {source}")]
    Storage {
        /// Operation that failed, e.g. `append event`
        operation: &'static str,
        /// Underlying I/O or serialization failure
        #[source]
        source: BoxError,
    },
}

impl BrokerError {
    /// Creates a queue-full error.
    pub fn queue_full(event_id: impl Into<String>, capacity: usize) -> Self {
        Self::QueueFull { event_id: event_id.into(), capacity }
    }

    /// Creates an error for an unknown receipt or entry.
    pub fn not_found(receipt_id: impl Into<String>) -> Self {
        Self::EventNotFound { receipt_id: receipt_id.into() }
    }

    /// Creates an invalid-event error.
    pub fn invalid_event(reason: impl Into<String>) -> Self {
        Self::InvalidEvent { reason: reason.into() }
    }

    /// Creates an error for a receipt whose delivery has already completed.
    pub fn not_inflight(event_id: impl Into<String>) -> Self {
        Self::EventNotInflight { event_id: event_id.into() }
    }

    /// Wraps an I/O or serialization failure.
    pub fn storage(operation: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Storage { operation, source: source.into() }
    }

    /// Stable machine-readable code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::QueueFull { .. } => "QUEUE_FULL",
            Self::EventNotFound { .. } => "EVENT_NOT_FOUND",
            Self::InvalidEvent { .. } => "INVALID_EVENT",
            Self::EventNotInflight { .. } => "EVENT_NOT_INFLIGHT",
            Self::Storage { .. } => "STORAGE_ERROR",
        }
    }

    /// Whether the caller may succeed by retrying the same request later.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::QueueFull { .. } | Self::Storage { .. })
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(BrokerError::queue_full("a", 1).code(), "QUEUE_FULL");
        assert_eq!(BrokerError::not_found("r").code(), "EVENT_NOT_FOUND");
        assert_eq!(BrokerError::invalid_event("x").code(), "INVALID_EVENT");
        assert_eq!(BrokerError::not_inflight("a").code(), "EVENT_NOT_INFLIGHT");
        assert_eq!(
            BrokerError::storage("append event", io::Error::other("disk")).code(),
            "STORAGE_ERROR"
        );
    }

    #[test]
    fn storage_error_keeps_source() {
        let err = BrokerError::storage(
            "append commit",
            io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
        );

        let source = err.source().expect("storage error should expose its source");
        assert_eq!(source.to_string(), "read-only");
        assert_eq!(err.to_string(), "storage error during append commit: read-only");
    }

    #[test]
    fn only_capacity_and_storage_are_transient() {
        assert!(BrokerError::queue_full("a", 1).is_transient());
        assert!(!BrokerError::not_found("r").is_transient());
        assert!(!BrokerError::invalid_event("x").is_transient());
    }
}
