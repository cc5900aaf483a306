//! Worker pool management with structured concurrency.
//!
//! Owns the worker tasks, tracks how many are still running and stops
//! them together on shutdown.

use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{broker::BrokerCore, handler::EventHandler, worker::Worker};

/// Fixed-size set of supervised worker tasks.
pub(crate) struct WorkerPool {
    core: Arc<BrokerCore>,
    handler: Arc<dyn EventHandler>,
    cancellation_token: CancellationToken,
    worker_handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub(crate) fn new(
        core: Arc<BrokerCore>,
        handler: Arc<dyn EventHandler>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self { core, handler, cancellation_token, worker_handles: Vec::new() }
    }

    /// Spawns the configured number of workers. They run until the
    /// cancellation token fires.
    pub(crate) fn spawn_workers(&mut self) {
        let worker_count = self.core.config.worker_count;
        info!(worker_count, handler = ?self.handler, "spawning workers");

        for worker_id in 0..worker_count {
            let worker = Worker::new(
                worker_id,
                Arc::clone(&self.core),
                Arc::clone(&self.handler),
                self.cancellation_token.clone(),
            );

            let handle = tokio::spawn(async move {
                info!(worker_id, "worker starting");
                worker.run().await;
            });

            self.worker_handles.push(handle);
        }
    }

    /// Number of workers spawned.
    pub(crate) fn len(&self) -> usize {
        self.worker_handles.len()
    }

    /// Number of workers still running.
    pub(crate) fn active_workers(&self) -> usize {
        self.worker_handles.iter().filter(|h| !h.is_finished()).count()
    }

    /// Cancels every worker and waits up to `timeout` for them to finish the
    /// event they hold.
    pub(crate) async fn shutdown_graceful(mut self, timeout: Duration) {
        info!(
            worker_count = self.worker_handles.len(),
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            "initiating graceful worker shutdown"
        );

        self.cancellation_token.cancel();

        let handles = std::mem::take(&mut self.worker_handles);
        let join_all = async {
            let mut panicked = 0usize;
            for (worker_id, handle) in handles.into_iter().enumerate() {
                if let Err(join_error) = handle.await {
                    error!(worker_id, error = %join_error, "worker task panicked during shutdown");
                    panicked += 1;
                }
            }
            panicked
        };

        match tokio::time::timeout(timeout, join_all).await {
            Ok(0) => info!("worker pool shutdown completed"),
            Ok(panicked) => warn!(panicked, "worker pool shutdown completed with failed workers"),
            Err(_elapsed) => {
                error!(
                    timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    "worker shutdown timed out, some workers may still be running"
                );
            },
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        let active = self.active_workers();
        if active > 0 && !self.cancellation_token.is_cancelled() {
            warn!(
                active_workers = active,
                "worker pool dropped without shutdown, cancelling workers"
            );
            self.cancellation_token.cancel();
        }
    }
}
