//! Spool event broker service.
//!
//! Main entry point for the spool server. Loads configuration, recovers the
//! broker from its data directory, serves the HTTP API and coordinates
//! graceful shutdown.

use std::sync::Arc;

use anyhow::{Context, Result};
use spool_api::{start_server, AppState, Config};
use spool_broker::Broker;
use spool_core::RealClock;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("starting spool event broker");

    let config = Config::load()?;
    let addr = config.parse_server_addr()?;
    info!(
        %addr,
        data_dir = %config.data_dir.display(),
        queue_max_size = config.queue_max_size,
        worker_count = config.worker_count,
        handler = ?config.handler,
        "configuration loaded"
    );

    let handler = config.handler.build()?;
    let mut broker = Broker::open(config.to_broker_config(), Arc::new(RealClock::new()))
        .await
        .context("failed to open broker")?;
    if let Some(handler) = handler {
        broker = broker.with_handler(handler);
    }
    let broker = Arc::new(broker);
    broker.start();

    let status = broker.status().await;
    info!(
        queued = status.queue.size,
        committed = status.committed.count,
        dead_letters = status.dlq.count,
        "spool is ready to accept events"
    );

    let served =
        start_server(AppState::new(Arc::clone(&broker)), addr, config.request_timeout()).await;
    if let Err(e) = &served {
        error!(error = %e, "server failed");
    }

    broker.shutdown().await;
    info!("spool shutdown complete");

    served.context("HTTP server failed")
}

/// Initializes tracing with environment-based configuration.
fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,spool=debug,spool_broker=debug,spool_api=debug,tower_http=debug")
    });

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}
