//! Periodic sweep reclaiming deliveries whose visibility timeout passed.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::broker::BrokerCore;

/// Spawns the reaper. It stops when the core's timer token is cancelled.
pub(crate) fn spawn(core: Arc<BrokerCore>) -> JoinHandle<()> {
    tokio::spawn(async move { run(&core).await })
}

async fn run(core: &Arc<BrokerCore>) {
    let interval = core.config.reaper_interval;
    info!(
        interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
        "visibility reaper started"
    );

    loop {
        tokio::select! {
            () = core.clock.sleep(interval) => {},
            () = core.timers.cancelled() => break,
        }

        let reclaimed = core.reap_expired().await;
        if reclaimed > 0 {
            debug!(reclaimed, "reaper sweep complete");
        }
    }

    info!("visibility reaper stopped");
}
