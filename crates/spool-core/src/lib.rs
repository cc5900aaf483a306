//! Core domain types for the spool event broker.
//!
//! Holds the event and dead-letter record shapes persisted to disk, the
//! error taxonomy shared by every layer, and the clock abstraction that
//! keeps deadline and backoff logic testable.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod models;
pub mod time;

pub use error::{BrokerError, Result};
pub use models::{DeadLetterEntry, DeadLetterReason, EventId, EventRecord, Payload, ReceiptId};
pub use time::{Clock, RealClock, TestClock};
