//! Errors raised by event handlers.
//!
//! A handler failure never escapes the worker: it ends the delivery cycle
//! and feeds the retry policy. The display string is what ends up in the
//! dead-letter entry's `error` field once retries run out.

use thiserror::Error;

/// Failure reported by an [`EventHandler`](crate::EventHandler).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// Generic processing failure.
    #[error("{message}")]
    Failed {
        /// What went wrong
        message: String,
    },

    /// The payload cannot be acted on.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Why the payload was rejected
        message: String,
    },

    /// Remote endpoint answered with a non-success status.
    #[error("HTTP {status}")]
    Http {
        /// Response status code
        status: u16,
    },

    /// Remote endpoint could not be reached.
    #[error("network error: {message}")]
    Network {
        /// Transport error description
        message: String,
    },

    /// Remote endpoint did not answer in time.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout {
        /// Timeout that elapsed
        timeout_ms: u64,
    },

    /// The handler panicked.
    #[error("handler panicked: {message}")]
    Panicked {
        /// Panic payload, when it was a string
        message: String,
    },
}

impl HandlerError {
    /// Creates a generic failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed { message: message.into() }
    }

    /// Creates an invalid-request failure.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest { message: message.into() }
    }

    /// Creates a network failure.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }

    /// Creates a timeout failure.
    pub fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout { timeout_ms }
    }

    /// Creates a failure from a caught panic payload.
    pub fn panicked(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::Panicked { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_strings() {
        assert_eq!(HandlerError::failed("boom").to_string(), "boom");
        assert_eq!(HandlerError::Http { status: 503 }.to_string(), "HTTP 503");
        assert_eq!(HandlerError::timeout(250).to_string(), "request timed out after 250ms");
    }

    #[test]
    fn panic_payloads_are_described() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("static str");
        assert_eq!(
            HandlerError::panicked(payload.as_ref()).to_string(),
            "handler panicked: static str"
        );

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(HandlerError::panicked(payload.as_ref()).to_string(), "handler panicked: owned");

        let payload: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert!(HandlerError::panicked(payload.as_ref()).to_string().contains("non-string"));
    }
}
