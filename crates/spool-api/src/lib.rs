//! HTTP API for the spool event broker.
//!
//! Exposes producer, consumer, dead-letter and monitoring operations of a
//! [`Broker`] as JSON endpoints, plus the service configuration.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

use spool_broker::Broker;
use spool_core::Clock;

pub mod config;
pub mod error;
pub mod handlers;
pub mod server;

pub use config::{Config, HandlerKind};
pub use error::ApiError;
pub use server::{create_router, serve, shutdown_signal, start_server};

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The broker behind the API
    pub broker: Arc<Broker>,
    /// Clock for response timestamps
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Creates handler state around `broker`, sharing its clock.
    pub fn new(broker: Arc<Broker>) -> Self {
        let clock = broker.clock();
        Self { broker, clock }
    }
}
