//! HTTP request handlers.
//!
//! Handlers are thin: they parse the request, call one [`Broker`] operation
//! and serialize its result. Broker errors become responses through
//! [`ApiError`](crate::error::ApiError).
//!
//! [`Broker`]: spool_broker::Broker

pub mod dlq;
pub mod events;
pub mod health;
pub mod status;

pub use dlq::{list_dead_letters, reprocess_dead_letter};
pub use events::{acknowledge_events, consume_events, enqueue_event, nack_event};
pub use health::health_check;
pub use status::{metrics, status};
