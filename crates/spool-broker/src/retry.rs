//! Exponential backoff and the retry-or-dead-letter decision.
//!
//! A failed delivery cycle, whatever triggered it, increments the event's
//! retry count. Once the count exceeds the limit the event is dead-lettered;
//! otherwise it goes back to the queue after
//! `min(base * multiplier^retries, max)`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use spool_core::DeadLetterReason;

/// Retry limits and backoff shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Failed cycles tolerated before dead-lettering.
    pub max_retries: u32,

    /// Delay before the first retry is scaled from this.
    pub base_backoff: Duration,

    /// Upper bound on any retry delay.
    pub max_backoff: Duration,

    /// Growth factor per failed cycle.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_backoff: Duration::from_millis(1000),
            max_backoff: Duration::from_millis(30_000),
            multiplier: 2.0,
        }
    }
}

/// What ended a delivery cycle unsuccessfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureTrigger {
    /// A consumer negatively acknowledged it.
    Nack,
    /// The worker callback returned an error or panicked.
    Handler,
    /// Its visibility timeout expired.
    VisibilityTimeout,
}

impl FailureTrigger {
    /// Dead-letter reason used when this trigger exhausts the retries.
    pub const fn exhausted_reason(self) -> DeadLetterReason {
        match self {
            Self::Nack => DeadLetterReason::MaxRetriesExceeded,
            Self::Handler => DeadLetterReason::HandlerMaxRetries,
            Self::VisibilityTimeout => DeadLetterReason::VisibilityTimeoutMaxRetries,
        }
    }
}

/// Outcome of a failed cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetryDecision {
    /// Put the event back on the queue after `delay`.
    Requeue {
        /// Wait before re-admission
        delay: Duration,
    },
    /// Stop retrying and dead-letter the event.
    GiveUp {
        /// Tag recorded on the dead-letter entry
        reason: DeadLetterReason,
    },
}

impl RetryPolicy {
    /// Delay before re-admitting an event that has failed `retries` times.
    ///
    /// Non-decreasing in `retries` and never above `max_backoff`.
    pub fn backoff(&self, retries: u32) -> Duration {
        let base = self.base_backoff.as_secs_f64();
        let cap = self.max_backoff.as_secs_f64();
        let exponent = i32::try_from(retries).unwrap_or(i32::MAX);
        let scaled = base * self.multiplier.max(1.0).powi(exponent);

        if !scaled.is_finite() || scaled >= cap {
            return self.max_backoff;
        }
        Duration::from_secs_f64(scaled.max(0.0))
    }

    /// Decides the fate of an event whose retry count, already incremented
    /// for the current failure, is `retries`.
    pub fn decide(&self, retries: u32, trigger: FailureTrigger) -> RetryDecision {
        if retries > self.max_retries {
            RetryDecision::GiveUp { reason: trigger.exhausted_reason() }
        } else {
            RetryDecision::Requeue { delay: self.backoff(retries) }
        }
    }
}
