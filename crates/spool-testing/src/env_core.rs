//! Builder for [`TestEnv`].

use std::time::Duration;

use anyhow::{Context, Result};
use spool_broker::{BrokerConfig, RetryPolicy};

use crate::{TestClock, TestEnv};

/// Builder for configuring a [`TestEnv`].
///
/// Defaults favour fast, deterministic tests: a small queue, one worker,
/// millisecond backoffs, no fsync and the test clock.
pub struct TestEnvBuilder {
    queue_max_size: usize,
    worker_count: usize,
    visibility_timeout: Duration,
    reaper_interval: Duration,
    default_poll_timeout: Duration,
    max_retries: u32,
    base_backoff: Duration,
    max_backoff: Duration,
    shutdown_timeout: Duration,
    real_clock: bool,
}

impl Default for TestEnvBuilder {
    fn default() -> Self {
        Self {
            queue_max_size: 100,
            worker_count: 1,
            visibility_timeout: Duration::from_secs(10),
            reaper_interval: Duration::from_millis(50),
            default_poll_timeout: Duration::from_millis(50),
            max_retries: 3,
            base_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(100),
            shutdown_timeout: Duration::from_secs(2),
            real_clock: false,
        }
    }
}

impl TestEnvBuilder {
    /// Creates a builder with test defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the queue capacity (default: 100).
    #[must_use]
    pub fn queue_max_size(mut self, size: usize) -> Self {
        self.queue_max_size = size;
        self
    }

    /// Sets the number of background workers (default: 1).
    #[must_use]
    pub fn worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    /// Sets the visibility timeout (default: 10s).
    #[must_use]
    pub fn visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = timeout;
        self
    }

    /// Sets the reaper interval (default: 50ms).
    #[must_use]
    pub fn reaper_interval(mut self, interval: Duration) -> Self {
        self.reaper_interval = interval;
        self
    }

    /// Sets the retry limit (default: 3).
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the first backoff delay (default: 10ms).
    #[must_use]
    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    /// Sets the shutdown drain timeout (default: 2s).
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Uses the system clock instead of [`TestClock`].
    ///
    /// Needed whenever the broker is started: the reaper sleeps on the
    /// broker's clock, and test-clock sleeps return immediately.
    #[must_use]
    pub fn real_clock(mut self) -> Self {
        self.real_clock = true;
        self
    }

    /// Builds the environment.
    pub fn build(self) -> Result<TestEnv> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("error")),
            )
            .with_test_writer()
            .try_init();

        let data_dir = tempfile::tempdir().context("failed to create temporary data directory")?;

        let config = BrokerConfig {
            data_dir: data_dir.path().to_path_buf(),
            queue_max_size: self.queue_max_size,
            worker_count: self.worker_count,
            visibility_timeout: self.visibility_timeout,
            reaper_interval: self.reaper_interval,
            default_poll_timeout: self.default_poll_timeout,
            max_poll_timeout: Duration::from_secs(5),
            max_events_per_poll: 10,
            worker_poll_timeout: Duration::from_millis(20),
            shutdown_timeout: self.shutdown_timeout,
            retry_policy: RetryPolicy {
                max_retries: self.max_retries,
                base_backoff: self.base_backoff,
                max_backoff: self.max_backoff,
                multiplier: 2.0,
            },
            sync_writes: false,
        };

        Ok(TestEnv { clock: TestClock::new(), data_dir, config, real_clock: self.real_clock })
    }
}
