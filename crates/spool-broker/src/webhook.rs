//! Handler that treats each event payload as an HTTP request to perform.
//!
//! Payload shape:
//!
//! ```json
//! {
//!   "url": "https://example.com/hook",
//!   "method": "POST",
//!   "headers": {"X-Token": "abc"},
//!   "body": {"any": "json"},
//!   "timeout": 30000,
//!   "callbackUrl": "https://example.com/result"
//! }
//! ```
//!
//! Only `url` is required; `method` defaults to `GET` and `timeout` (ms) to
//! the configured default. A 2xx response completes the event. Any other
//! status, a transport failure or a timeout fails the cycle so the retry
//! policy takes over. When `callbackUrl` is present the outcome is POSTed
//! there, best effort, after every attempt.

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Method};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use spool_core::EventRecord;
use tracing::{debug, info_span, warn, Instrument};

use crate::{error::HandlerError, handler::EventHandler};

/// Webhook handler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Timeout applied when the payload does not set one.
    pub default_timeout: Duration,
    /// Timeout for result callbacks.
    pub callback_timeout: Duration,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Maximum redirects followed.
    pub max_redirects: usize,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            callback_timeout: Duration::from_secs(10),
            user_agent: concat!("spool/", env!("CARGO_PKG_VERSION")).to_string(),
            max_redirects: 5,
        }
    }
}

/// HTTP request described by an event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequestSpec {
    /// Target URL
    pub url: String,
    /// HTTP method, `GET` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Extra request headers
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    /// Body; strings are sent verbatim, anything else as JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Timeout in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Where to POST the outcome
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

impl HttpRequestSpec {
    /// Reads the request description out of an event payload.
    pub fn from_record(record: &EventRecord) -> Result<Self, HandlerError> {
        serde_json::from_value(Value::Object(record.payload.clone()))
            .map_err(|e| HandlerError::invalid_request(format!("payload is not a request: {e}")))
    }
}

/// Response received for a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponseSummary {
    /// Status code
    pub status_code: u16,
    /// Response headers, multi-valued headers joined with `, `
    pub headers: HashMap<String, String>,
    /// Parsed JSON when the response declares it, text otherwise
    pub body: Value,
    /// Time to full response, milliseconds
    pub duration: u64,
}

/// Outcome of one attempt, also the callback document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequestResult {
    /// Whether the response status was 2xx
    pub success: bool,
    /// The request that was attempted
    pub request: HttpRequestSpec,
    /// Response, when one arrived
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<HttpResponseSummary>,
    /// Failure description, when no response arrived
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Total attempt time, milliseconds
    pub duration: u64,
}

/// [`EventHandler`] performing the HTTP request each payload describes.
#[derive(Debug, Clone)]
pub struct WebhookHandler {
    client: reqwest::Client,
    config: WebhookConfig,
}

impl WebhookHandler {
    /// Builds the handler and its connection pool.
    pub fn new(config: WebhookConfig) -> Result<Self, HandlerError> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| HandlerError::failed(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Performs `target` and reports the outcome without interpreting it.
    pub async fn execute(&self, target: &HttpRequestSpec) -> HttpRequestResult {
        let started = std::time::Instant::now();
        let outcome = self.send(target, started).await;
        let duration = elapsed_ms(started);

        match outcome {
            Ok(response) => HttpRequestResult {
                success: (200..300).contains(&response.status_code),
                request: target.clone(),
                response: Some(response),
                error: None,
                duration,
            },
            Err(e) => HttpRequestResult {
                success: false,
                request: target.clone(),
                response: None,
                error: Some(e.to_string()),
                duration,
            },
        }
    }

    async fn send(
        &self,
        target: &HttpRequestSpec,
        started: std::time::Instant,
    ) -> Result<HttpResponseSummary, HandlerError> {
        let url = reqwest::Url::parse(&target.url)
            .map_err(|_| HandlerError::invalid_request(format!("invalid URL: {}", target.url)))?;
        let method_name = target.method.as_deref().unwrap_or("GET").to_ascii_uppercase();
        let method = Method::from_bytes(method_name.as_bytes())
            .map_err(|_| HandlerError::invalid_request(format!("invalid method: {method_name}")))?;
        let timeout = target.timeout.map_or(self.config.default_timeout, Duration::from_millis);

        let mut request = self.client.request(method, url).timeout(timeout);
        let has_content_type =
            target.headers.keys().any(|k| k.eq_ignore_ascii_case("content-type"));
        for (name, value) in &target.headers {
            request = request.header(name, value);
        }
        match &target.body {
            None | Some(Value::Null) => {},
            Some(Value::String(text)) => request = request.body(text.clone()),
            Some(other) => {
                if !has_content_type {
                    request = request.header(CONTENT_TYPE, "application/json");
                }
                request = request.body(other.to_string());
            },
        }

        let response = request.send().await.map_err(|e| classify(&e, timeout))?;

        let status_code = response.status().as_u16();
        let mut headers: HashMap<String, String> = HashMap::new();
        for (name, value) in response.headers() {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            headers
                .entry(name.as_str().to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert(value);
        }
        let is_json = headers.get("content-type").is_some_and(|ct| ct.contains("application/json"));

        let bytes = response.bytes().await.map_err(|e| classify(&e, timeout))?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let body = if is_json {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        } else {
            Value::String(text)
        };

        Ok(HttpResponseSummary { status_code, headers, body, duration: elapsed_ms(started) })
    }

    /// POSTs `result` to `callback_url`. Failures are logged, never raised.
    pub async fn send_callback(&self, callback_url: &str, result: &HttpRequestResult) {
        let sent = self
            .client
            .post(callback_url)
            .timeout(self.config.callback_timeout)
            .json(result)
            .send()
            .await;

        match sent {
            Ok(response) if response.status().is_success() => {
                debug!(callback_url, "callback delivered");
            },
            Ok(response) => {
                warn!(callback_url, status = response.status().as_u16(), "callback rejected");
            },
            Err(e) => warn!(callback_url, error = %e, "callback failed"),
        }
    }
}

#[async_trait]
impl EventHandler for WebhookHandler {
    async fn handle(&self, record: &EventRecord) -> Result<(), HandlerError> {
        let target = HttpRequestSpec::from_record(record)?;
        let span = info_span!(
            "webhook",
            event_id = %record.id,
            url = %target.url,
            retries = record.retries
        );

        async move {
            let result = self.execute(&target).await;

            if let Some(callback_url) = &target.callback_url {
                self.send_callback(callback_url, &result).await;
            }

            match (&result.response, &result.error) {
                (Some(response), _) if result.success => {
                    debug!(
                        status = response.status_code,
                        duration_ms = result.duration,
                        "request succeeded"
                    );
                    Ok(())
                },
                (Some(response), _) => Err(HandlerError::Http { status: response.status_code }),
                (None, Some(error)) => Err(HandlerError::failed(error.clone())),
                (None, None) => Err(HandlerError::failed("request produced no response")),
            }
        }
        .instrument(span)
        .await
    }
}

fn classify(error: &reqwest::Error, timeout: Duration) -> HandlerError {
    if error.is_timeout() {
        HandlerError::timeout(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX))
    } else if error.is_builder() {
        HandlerError::invalid_request(error.to_string())
    } else {
        HandlerError::network(error.to_string())
    }
}

fn elapsed_ms(started: std::time::Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;
    use spool_core::EventId;

    use super::*;

    fn record(payload: Value) -> EventRecord {
        let Value::Object(payload) = payload else { panic!("payload must be an object") };
        EventRecord::new(EventId::new("e"), payload, None, Utc::now())
    }

    #[test]
    fn spec_parses_camel_case_payload() {
        let target = HttpRequestSpec::from_record(&record(json!({
            "url": "http://localhost/hook",
            "method": "post",
            "timeout": 500,
            "callbackUrl": "http://localhost/cb"
        })))
        .unwrap();

        assert_eq!(target.method.as_deref(), Some("post"));
        assert_eq!(target.timeout, Some(500));
        assert_eq!(target.callback_url.as_deref(), Some("http://localhost/cb"));
        assert!(target.headers.is_empty());
    }

    #[test]
    fn payload_without_url_is_invalid() {
        let err = HttpRequestSpec::from_record(&record(json!({"method": "GET"}))).unwrap_err();

        assert!(matches!(err, HandlerError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn malformed_url_fails_without_network() {
        let handler = WebhookHandler::new(WebhookConfig::default()).unwrap();
        let target = HttpRequestSpec {
            url: "not a url".to_string(),
            method: None,
            headers: HashMap::new(),
            body: None,
            timeout: None,
            callback_url: None,
        };

        let result = handler.execute(&target).await;

        assert!(!result.success);
        assert!(result.response.is_none());
        assert!(result.error.unwrap().contains("invalid URL"));
    }
}
