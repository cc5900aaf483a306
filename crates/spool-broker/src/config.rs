//! Broker tuning knobs.

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

/// Configuration for a [`Broker`](crate::Broker).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Directory holding the event, commit and dead-letter logs.
    pub data_dir: PathBuf,

    /// Capacity of the in-memory queue.
    pub queue_max_size: usize,

    /// Background workers started when a handler is configured.
    pub worker_count: usize,

    /// How long a delivery may stay unacknowledged before the reaper
    /// reclaims it.
    pub visibility_timeout: Duration,

    /// How often the reaper sweeps for expired deliveries.
    pub reaper_interval: Duration,

    /// Poll wait used when the consumer does not ask for one.
    pub default_poll_timeout: Duration,

    /// Upper bound on any consumer poll wait.
    pub max_poll_timeout: Duration,

    /// Batch size used when the consumer does not ask for one.
    pub max_events_per_poll: usize,

    /// How long an idle worker waits on the queue before re-checking for
    /// shutdown.
    pub worker_poll_timeout: Duration,

    /// Upper bound on the wait for inflight deliveries during shutdown.
    pub shutdown_timeout: Duration,

    /// Retry and dead-letter policy.
    pub retry_policy: RetryPolicy,

    /// Whether every append is followed by an fsync.
    pub sync_writes: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            queue_max_size: crate::DEFAULT_QUEUE_MAX_SIZE,
            worker_count: crate::DEFAULT_WORKER_COUNT,
            visibility_timeout: Duration::from_secs(10),
            reaper_interval: Duration::from_secs(1),
            default_poll_timeout: Duration::from_secs(5),
            max_poll_timeout: Duration::from_secs(30),
            max_events_per_poll: crate::DEFAULT_MAX_EVENTS_PER_POLL,
            worker_poll_timeout: Duration::from_secs(1),
            shutdown_timeout: Duration::from_secs(30),
            retry_policy: RetryPolicy::default(),
            sync_writes: true,
        }
    }
}
