//! Error responses.
//!
//! Every failure leaves the API as `{"error": {"code", "message"}}` with the
//! status derived from the broker error code. Transient failures carry a
//! `Retry-After` hint.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use spool_core::BrokerError;
use tracing::{error, warn};

/// Error response with code and message.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error details including code and message
    pub error: ErrorDetail,
}

/// Detailed error information.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Stable code from the broker taxonomy, e.g. `QUEUE_FULL`
    pub code: String,
    /// Human-readable error description
    pub message: String,
}

/// A broker error on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub BrokerError);

impl ApiError {
    /// HTTP status for the wrapped error.
    pub fn status(&self) -> StatusCode {
        status_for(&self.0)
    }
}

/// Maps a broker error code to its HTTP status.
pub fn status_for(err: &BrokerError) -> StatusCode {
    match err {
        BrokerError::QueueFull { .. } => StatusCode::SERVICE_UNAVAILABLE,
        BrokerError::EventNotFound { .. } => StatusCode::NOT_FOUND,
        BrokerError::InvalidEvent { .. } | BrokerError::EventNotInflight { .. } => {
            StatusCode::BAD_REQUEST
        },
        BrokerError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<BrokerError> for ApiError {
    fn from(err: BrokerError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(BrokerError::invalid_event(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(BrokerError::invalid_event(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(BrokerError::invalid_event(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.0.code();
        if status.is_server_error() {
            error!(code, error = %self.0, "request failed");
        } else {
            warn!(code, error = %self.0, "request rejected");
        }

        let body = ErrorResponse {
            error: ErrorDetail { code: code.to_string(), message: self.0.to_string() },
        };
        let mut response = (status, Json(body)).into_response();
        if self.0.is_transient() {
            response.headers_mut().insert(RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}
