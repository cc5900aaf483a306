//! Durable event broker engine.
//!
//! Producers enqueue JSON payloads, consumers poll for them and acknowledge
//! each delivery, and an optional pool of background workers hands events to
//! an [`EventHandler`]. Delivery is at-least-once.
//!
//! # Architecture
//!
//! An accepted event moves through these stages:
//!
//! 1. **Log** - appended to the durable event log before anything else
//! 2. **Queue** - pushed onto a bounded in-memory FIFO; a full queue
//!    dead-letters the event and reports `QueueFull`
//! 3. **Lease** - handed to a consumer (with a receipt) or a worker, with a
//!    visibility deadline
//! 4. **Outcome** - committed to the commit ledger on success; on failure,
//!    nack or lease expiry it is requeued after an exponential backoff, or
//!    dead-lettered once its retries run out
//!
//! On startup the event log is replayed minus committed and dead-lettered
//! records, so nothing accepted is lost across a crash.
//!
//! # Example
//!
//! ```no_run
//! use std::{sync::Arc, time::Duration};
//!
//! use serde_json::json;
//! use spool_broker::{Broker, BrokerConfig};
//! use spool_core::RealClock;
//!
//! # async fn example() -> spool_core::Result<()> {
//! let broker = Broker::open(BrokerConfig::default(), Arc::new(RealClock::new())).await?;
//! broker.start();
//!
//! broker.enqueue(json!({"id": "a", "n": 1}), Some("billing".to_string())).await?;
//!
//! let events = broker.consume(10, Some(Duration::from_secs(1)), Some("billing")).await;
//! let receipts: Vec<_> = events.iter().map(|e| e.receipt_id.to_string()).collect();
//! broker.acknowledge(&receipts).await?;
//!
//! broker.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod broker;
pub mod config;
pub mod error;
pub mod handler;
pub mod inflight;
pub mod metrics;
pub mod queue;
mod reaper;
pub mod report;
pub mod retry;
pub mod storage;
pub mod webhook;
mod worker;
mod worker_pool;

pub use broker::{Broker, MAX_DEAD_LETTER_PAGE, MAX_EVENTS_PER_CONSUME};
pub use config::BrokerConfig;
pub use error::HandlerError;
pub use handler::{EventHandler, LogHandler};
pub use metrics::MetricsSnapshot;
pub use queue::BoundedQueue;
pub use report::{AckFailure, AckOutcome, BrokerStatus, ConsumedEvent, EnqueueReceipt};
pub use retry::{FailureTrigger, RetryDecision, RetryPolicy};
pub use webhook::{WebhookConfig, WebhookHandler};

/// Default capacity of the in-memory queue.
pub const DEFAULT_QUEUE_MAX_SIZE: usize = 1000;

/// Default number of background workers.
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// Default batch size of a consume.
pub const DEFAULT_MAX_EVENTS_PER_POLL: usize = 10;
