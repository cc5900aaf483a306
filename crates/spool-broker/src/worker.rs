//! Background worker pulling events from the queue into an
//! [`EventHandler`].
//!
//! Each worker loops: wait on the queue (bounded by the worker poll
//! timeout so shutdown is noticed), lease the event, run the handler, then
//! commit on success or feed the retry policy on failure. A panicking
//! handler counts as a failure. Queue space is signalled after every event,
//! whatever the outcome.

use std::{panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;
use spool_core::EventRecord;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{broker::BrokerCore, error::HandlerError, handler::EventHandler};

pub(crate) struct Worker {
    id: usize,
    core: Arc<BrokerCore>,
    handler: Arc<dyn EventHandler>,
    shutdown: CancellationToken,
}

impl Worker {
    pub(crate) fn new(
        id: usize,
        core: Arc<BrokerCore>,
        handler: Arc<dyn EventHandler>,
        shutdown: CancellationToken,
    ) -> Self {
        Self { id, core, handler, shutdown }
    }

    /// Runs until the shutdown token is cancelled. An event already in hand
    /// is finished first.
    pub(crate) async fn run(&self) {
        let poll_timeout = self.core.config.worker_poll_timeout;

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            let popped = tokio::select! {
                popped = self.core.queue.pop(Some(poll_timeout)) => popped,
                () = self.shutdown.cancelled() => break,
            };
            let Some(record) = popped else { continue };

            if self.shutdown.is_cancelled() {
                self.return_to_queue(record);
                break;
            }

            self.process(record).await;
        }

        info!(worker_id = self.id, "worker stopped");
    }

    async fn process(&self, record: EventRecord) {
        let Some(delivered_at) = self.core.lease_to_worker(&record, self.id) else {
            self.core.queue.notify_space();
            return;
        };

        let started = self.core.clock.now();
        let outcome = AssertUnwindSafe(self.handler.handle(&record))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(HandlerError::panicked(panic.as_ref())));
        let processing = self.core.clock.now().saturating_duration_since(started);

        match outcome {
            Ok(()) => {
                self.core
                    .complete_worker_delivery(&record.id, self.id, delivered_at, processing)
                    .await;
            },
            Err(error) => {
                warn!(
                    worker_id = self.id,
                    event_id = %record.id,
                    retries = record.retries,
                    error = %error,
                    "handler failed"
                );
                self.core
                    .fail_worker_delivery(&record.id, self.id, delivered_at, error.to_string())
                    .await;
            },
        }

        self.core.queue.notify_space();
    }

    /// Puts an event popped during shutdown back at the head of the queue.
    fn return_to_queue(&self, record: EventRecord) {
        if let Err(record) = self.core.queue.unshift(record) {
            warn!(
                worker_id = self.id,
                event_id = %record.id,
                "queue full at shutdown, event will be replayed from the log"
            );
        }
    }
}
