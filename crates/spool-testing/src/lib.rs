//! Test infrastructure for deterministic broker testing.
//!
//! Provides a throwaway data directory, a controllable clock, broker
//! construction with test-friendly timings, handlers that record or fail on
//! demand, and helpers for seeding and inspecting the log files directly.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use spool_broker::{Broker, BrokerConfig, EventHandler};
use spool_core::{Clock, RealClock};
use tempfile::TempDir;

pub mod fixtures;
pub mod handlers;

mod env_core;

pub use env_core::TestEnvBuilder;
pub use fixtures::{event_log, payload, record};
pub use handlers::{wait_until, RecordingHandler, ScriptedHandler, SlowHandler};
pub use spool_core::TestClock;

/// Isolated broker environment.
///
/// Every environment owns a fresh temporary data directory that is removed
/// when the environment is dropped. Brokers opened from the same
/// environment share that directory, which is how restart scenarios are
/// written: shut one broker down, open another.
pub struct TestEnv {
    /// Deterministic clock handed to brokers unless the environment was
    /// built with a real clock
    pub clock: TestClock,
    data_dir: TempDir,
    config: BrokerConfig,
    real_clock: bool,
}

impl TestEnv {
    /// Creates an environment with default test settings.
    pub fn new() -> Result<Self> {
        TestEnvBuilder::new().build()
    }

    /// Starts configuring an environment.
    pub fn builder() -> TestEnvBuilder {
        TestEnvBuilder::new()
    }

    /// Directory holding the broker's log files.
    pub fn data_dir(&self) -> &Path {
        self.data_dir.path()
    }

    /// Broker configuration used by [`Self::open_broker`].
    pub fn config(&self) -> BrokerConfig {
        self.config.clone()
    }

    /// Clock handed to brokers.
    pub fn broker_clock(&self) -> Arc<dyn Clock> {
        if self.real_clock {
            Arc::new(RealClock::new())
        } else {
            Arc::new(self.clock.clone())
        }
    }

    /// Opens a broker over this environment's data directory. Nothing is
    /// started.
    pub async fn open_broker(&self) -> Result<Broker> {
        self.open_broker_with(self.config()).await
    }

    /// Opens a broker with a custom configuration. The data directory is
    /// always this environment's.
    pub async fn open_broker_with(&self, config: BrokerConfig) -> Result<Broker> {
        let config = BrokerConfig { data_dir: self.data_dir().to_path_buf(), ..config };
        Broker::open(config, self.broker_clock()).await.context("failed to open broker")
    }

    /// Opens a broker with `handler` and starts its reaper and workers.
    pub async fn start_broker(&self, handler: Arc<dyn EventHandler>) -> Result<Broker> {
        let broker = self.open_broker().await?.with_handler(handler);
        broker.start();
        Ok(broker)
    }

    /// Reads one of the broker's log files as trimmed, non-empty lines.
    pub fn read_lines(&self, file: &str) -> Result<Vec<String>> {
        let path = self.data_dir().join(file);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(contents.lines().map(str::trim).filter(|l| !l.is_empty()).map(String::from).collect())
    }

    /// Overwrites one of the broker's log files with `contents`.
    pub fn write_file(&self, file: &str, contents: &str) -> Result<()> {
        let path = self.data_dir().join(file);
        std::fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))
    }
}
