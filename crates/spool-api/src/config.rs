//! Configuration management for the spool broker service.

use std::{net::SocketAddr, path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use spool_broker::{
    BrokerConfig, EventHandler, LogHandler, RetryPolicy, WebhookConfig, WebhookHandler,
    DEFAULT_MAX_EVENTS_PER_POLL, DEFAULT_QUEUE_MAX_SIZE, DEFAULT_WORKER_COUNT,
    MAX_EVENTS_PER_CONSUME,
};

const CONFIG_FILE: &str = "config.toml";

/// Complete service configuration with defaults, file, and environment
/// overrides.
///
/// Configuration is loaded in priority order:
/// 1. Environment variables (highest priority)
/// 2. Configuration file (`config.toml`)
/// 3. Built-in defaults (lowest priority)
///
/// # Example
///
/// ```no_run
/// use spool_api::Config;
///
/// let config = Config::load().expect("Failed to load configuration");
///
/// println!("Server will bind to {}:{}", config.host, config.port);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server
    /// Server bind address.
    ///
    /// Environment variable: `HOST`
    #[serde(default = "default_host", alias = "HOST")]
    pub host: String,
    /// Server bind port.
    ///
    /// Environment variable: `PORT`
    #[serde(default = "default_port", alias = "PORT")]
    pub port: u16,
    /// Upper bound on any HTTP request, in milliseconds. Must exceed the
    /// longest consume poll.
    ///
    /// Environment variable: `REQUEST_TIMEOUT_MS`
    #[serde(default = "default_request_timeout_ms", alias = "REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: u64,

    // Storage
    /// Directory holding the event, commit and dead-letter logs.
    ///
    /// Environment variable: `DATA_DIR`
    #[serde(default = "default_data_dir", alias = "DATA_DIR")]
    pub data_dir: PathBuf,
    /// Whether each append is flushed to disk before returning.
    ///
    /// Environment variable: `SYNC_WRITES`
    #[serde(default = "default_sync_writes", alias = "SYNC_WRITES")]
    pub sync_writes: bool,

    // Queue
    /// Capacity of the in-memory queue.
    ///
    /// Environment variable: `QUEUE_MAX_SIZE`
    #[serde(default = "default_queue_max_size", alias = "QUEUE_MAX_SIZE")]
    pub queue_max_size: usize,
    /// Visibility timeout for leased events, in milliseconds.
    ///
    /// Environment variable: `VISIBILITY_TIMEOUT_MS`
    #[serde(default = "default_visibility_timeout_ms", alias = "VISIBILITY_TIMEOUT_MS")]
    pub visibility_timeout_ms: u64,
    /// Interval between reaper sweeps, in milliseconds.
    ///
    /// Environment variable: `REAPER_INTERVAL_MS`
    #[serde(default = "default_reaper_interval_ms", alias = "REAPER_INTERVAL_MS")]
    pub reaper_interval_ms: u64,

    // Consumers
    /// Poll wait when a consumer does not ask for one, in milliseconds.
    ///
    /// Environment variable: `DEFAULT_POLL_TIMEOUT_MS`
    #[serde(default = "default_poll_timeout_ms", alias = "DEFAULT_POLL_TIMEOUT_MS")]
    pub default_poll_timeout_ms: u64,
    /// Longest poll wait a consumer may ask for, in milliseconds.
    ///
    /// Environment variable: `MAX_POLL_TIMEOUT_MS`
    #[serde(default = "default_max_poll_timeout_ms", alias = "MAX_POLL_TIMEOUT_MS")]
    pub max_poll_timeout_ms: u64,
    /// Batch size when a consumer does not ask for one.
    ///
    /// Environment variable: `MAX_EVENTS_PER_POLL`
    #[serde(default = "default_max_events_per_poll", alias = "MAX_EVENTS_PER_POLL")]
    pub max_events_per_poll: usize,

    // Workers
    /// Number of background workers. Zero leaves every event to external
    /// consumers.
    ///
    /// Environment variable: `WORKER_COUNT`
    #[serde(default = "default_worker_count", alias = "WORKER_COUNT")]
    pub worker_count: usize,
    /// Callback the workers run.
    ///
    /// Environment variable: `HANDLER`
    #[serde(default, alias = "HANDLER")]
    pub handler: HandlerKind,

    // Retry
    /// Failed cycles tolerated before an event is dead-lettered.
    ///
    /// Environment variable: `MAX_RETRIES`
    #[serde(default = "default_max_retries", alias = "MAX_RETRIES")]
    pub max_retries: u32,
    /// Base delay for exponential backoff in milliseconds.
    ///
    /// Environment variable: `BASE_BACKOFF_MS`
    #[serde(default = "default_base_backoff_ms", alias = "BASE_BACKOFF_MS")]
    pub base_backoff_ms: u64,
    /// Maximum delay between retries in milliseconds.
    ///
    /// Environment variable: `MAX_BACKOFF_MS`
    #[serde(default = "default_max_backoff_ms", alias = "MAX_BACKOFF_MS")]
    pub max_backoff_ms: u64,
    /// Growth factor applied per failed cycle.
    ///
    /// Environment variable: `BACKOFF_MULTIPLIER`
    #[serde(default = "default_backoff_multiplier", alias = "BACKOFF_MULTIPLIER")]
    pub backoff_multiplier: f64,

    // Shutdown
    /// Longest wait for inflight events during shutdown, in milliseconds.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT_MS`
    #[serde(default = "default_shutdown_timeout_ms", alias = "SHUTDOWN_TIMEOUT_MS")]
    pub shutdown_timeout_ms: u64,
}

/// Callback run by the background workers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerKind {
    /// No workers run; every event waits for an external consumer.
    None,
    /// Log each event and commit it.
    #[default]
    Log,
    /// Perform the HTTP request each payload describes.
    Webhook,
}

impl HandlerKind {
    /// Builds the handler, `None` when workers should not run.
    pub fn build(self) -> Result<Option<Arc<dyn EventHandler>>> {
        Ok(match self {
            Self::None => None,
            Self::Log => Some(Arc::new(LogHandler)),
            Self::Webhook => {
                let handler = WebhookHandler::new(WebhookConfig::default())
                    .context("failed to build webhook handler")?;
                Some(Arc::new(handler))
            },
        })
    }
}

impl Config {
    /// Load configuration from defaults, config file, and environment variable
    /// overrides.
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(""));

        let config: Self = figment.extract().context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Convert to the broker's configuration.
    pub fn to_broker_config(&self) -> BrokerConfig {
        BrokerConfig {
            data_dir: self.data_dir.clone(),
            queue_max_size: self.queue_max_size,
            worker_count: self.worker_count,
            visibility_timeout: Duration::from_millis(self.visibility_timeout_ms),
            reaper_interval: Duration::from_millis(self.reaper_interval_ms),
            default_poll_timeout: Duration::from_millis(self.default_poll_timeout_ms),
            max_poll_timeout: Duration::from_millis(self.max_poll_timeout_ms),
            max_events_per_poll: self.max_events_per_poll,
            shutdown_timeout: Duration::from_millis(self.shutdown_timeout_ms),
            retry_policy: self.to_retry_policy(),
            sync_writes: self.sync_writes,
            ..BrokerConfig::default()
        }
    }

    /// Convert to retry policy.
    pub fn to_retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_backoff: Duration::from_millis(self.base_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            multiplier: self.backoff_multiplier,
        }
    }

    /// HTTP request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Parse server socket address from host and port configuration.
    pub fn parse_server_addr(&self) -> Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.host, self.port);
        SocketAddr::from_str(&addr_str).context("Invalid server address")
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("port must be greater than 0");
        }

        if self.queue_max_size == 0 {
            anyhow::bail!("queue_max_size must be greater than 0");
        }

        if self.visibility_timeout_ms == 0 {
            anyhow::bail!("visibility_timeout_ms must be greater than 0");
        }

        if self.reaper_interval_ms == 0 {
            anyhow::bail!("reaper_interval_ms must be greater than 0");
        }

        if self.default_poll_timeout_ms > self.max_poll_timeout_ms {
            anyhow::bail!("default_poll_timeout_ms cannot exceed max_poll_timeout_ms");
        }

        if self.max_events_per_poll == 0 || self.max_events_per_poll > MAX_EVENTS_PER_CONSUME {
            anyhow::bail!("max_events_per_poll must be between 1 and {MAX_EVENTS_PER_CONSUME}");
        }

        if self.base_backoff_ms == 0 {
            anyhow::bail!("base_backoff_ms must be greater than 0");
        }

        if self.base_backoff_ms > self.max_backoff_ms {
            anyhow::bail!("base_backoff_ms cannot exceed max_backoff_ms");
        }

        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            anyhow::bail!("backoff_multiplier must be at least 1.0");
        }

        if self.request_timeout_ms <= self.max_poll_timeout_ms {
            anyhow::bail!("request_timeout_ms must exceed max_poll_timeout_ms");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_ms: default_request_timeout_ms(),
            data_dir: default_data_dir(),
            sync_writes: default_sync_writes(),
            queue_max_size: default_queue_max_size(),
            visibility_timeout_ms: default_visibility_timeout_ms(),
            reaper_interval_ms: default_reaper_interval_ms(),
            default_poll_timeout_ms: default_poll_timeout_ms(),
            max_poll_timeout_ms: default_max_poll_timeout_ms(),
            max_events_per_poll: default_max_events_per_poll(),
            worker_count: default_worker_count(),
            handler: HandlerKind::default(),
            max_retries: default_max_retries(),
            base_backoff_ms: default_base_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_request_timeout_ms() -> u64 {
    35_000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_sync_writes() -> bool {
    true
}

fn default_queue_max_size() -> usize {
    DEFAULT_QUEUE_MAX_SIZE
}

fn default_visibility_timeout_ms() -> u64 {
    10_000
}

fn default_reaper_interval_ms() -> u64 {
    1000
}

fn default_poll_timeout_ms() -> u64 {
    5000
}

fn default_max_poll_timeout_ms() -> u64 {
    30_000
}

fn default_max_events_per_poll() -> usize {
    DEFAULT_MAX_EVENTS_PER_POLL
}

fn default_worker_count() -> usize {
    DEFAULT_WORKER_COUNT
}

fn default_max_retries() -> u32 {
    5
}

fn default_base_backoff_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_shutdown_timeout_ms() -> u64 {
    30_000
}
