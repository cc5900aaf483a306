//! Broker facade coordinating storage, queue, leases and background tasks.
//!
//! Every accepted event is appended to the event log before it becomes
//! visible in the queue. From there it is leased either to an external
//! consumer (through [`Broker::consume`]) or to a background worker, and
//! each lease ends in exactly one of three ways: a commit, a delayed
//! requeue, or a dead-letter entry.
//!
//! Shared mutable state (leases, the commit set and the metrics) lives
//! behind a single lock that is never held across an await point. Log
//! appends happen outside the lock. A lease is removed before its follow-up
//! is written, so two paths racing for the same delivery (an acknowledge
//! and the reaper, say) can never both act on it.

use std::{
    collections::HashSet,
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use spool_core::{
    BrokerError, Clock, DeadLetterEntry, DeadLetterReason, EventId, EventRecord, Payload,
    ReceiptId, Result,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    config::BrokerConfig,
    handler::EventHandler,
    inflight::InflightTracker,
    metrics::{BrokerMetrics, MetricsSnapshot},
    queue::BoundedQueue,
    reaper,
    report::{
        AckFailure, AckOutcome, BrokerStatus, ConsumedEvent, CountStatus, EnqueueReceipt,
        InflightStatus, QueueStatus, WorkerStatus,
    },
    retry::{FailureTrigger, RetryDecision},
    storage::Storage,
    worker_pool::WorkerPool,
};

/// Largest batch a single consume may return.
pub const MAX_EVENTS_PER_CONSUME: usize = 100;

/// Largest page of dead-letter entries a single read may return.
pub const MAX_DEAD_LETTER_PAGE: usize = 1000;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

struct BrokerState {
    inflight: InflightTracker,
    committed: HashSet<EventId>,
    metrics: BrokerMetrics,
}

/// State shared between the facade, the workers and the reaper.
pub(crate) struct BrokerCore {
    pub(crate) config: BrokerConfig,
    pub(crate) queue: BoundedQueue<EventRecord>,
    pub(crate) storage: Storage,
    pub(crate) clock: Arc<dyn Clock>,
    /// Cancels the reaper and pending requeue timers.
    pub(crate) timers: CancellationToken,
    state: Mutex<BrokerState>,
    opened_at: Instant,
}

#[derive(Default)]
struct Runtime {
    workers: Option<WorkerPool>,
    reaper: Option<JoinHandle<()>>,
}

/// Durable single-node event broker.
///
/// ```no_run
/// use std::sync::Arc;
///
/// use serde_json::json;
/// use spool_broker::{Broker, BrokerConfig, LogHandler};
/// use spool_core::RealClock;
///
/// # async fn example() -> spool_core::Result<()> {
/// let broker = Broker::open(BrokerConfig::default(), Arc::new(RealClock::new()))
///     .await?
///     .with_handler(Arc::new(LogHandler));
/// broker.start();
///
/// broker.enqueue(json!({"id": "order-1", "total": 42}), None).await?;
///
/// broker.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct Broker {
    core: Arc<BrokerCore>,
    handler: Option<Arc<dyn EventHandler>>,
    worker_token: CancellationToken,
    runtime: Mutex<Runtime>,
}

impl std::fmt::Debug for Broker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broker")
            .field("data_dir", &self.core.config.data_dir)
            .field("queued", &self.core.queue.len())
            .field("has_handler", &self.handler.is_some())
            .finish_non_exhaustive()
    }
}

impl Broker {
    /// Opens the data directory and rebuilds the queue from the event log.
    ///
    /// Events already committed or already dead-lettered are skipped. Events
    /// that no longer fit in the queue are dead-lettered with
    /// [`DeadLetterReason::StartupQueueFull`]. Unreadable commit or
    /// dead-letter logs degrade to empty sets with a warning.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the data directory or a log file cannot
    /// be opened.
    pub async fn open(config: BrokerConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let opened_at = clock.now();
        let storage = Storage::open(&config.data_dir, config.sync_writes).await?;
        let queue = BoundedQueue::new(config.queue_max_size);
        let mut metrics = BrokerMetrics::new(clock.now_utc());

        let committed = match storage.commits.load().await {
            Ok(committed) => committed,
            Err(e) => {
                warn!(error = %e, "failed to load commit ledger, replaying without it");
                HashSet::new()
            },
        };
        let dead_lettered: HashSet<(EventId, i64)> = match storage.dead_letters.all().await {
            Ok(entries) => entries
                .into_iter()
                .map(|entry| (entry.record.id, entry.record.enqueued_at.timestamp_millis()))
                .collect(),
            Err(e) => {
                warn!(error = %e, "failed to read dead letters, replaying without them");
                HashSet::new()
            },
        };

        let mut overflow = Vec::new();
        let mut skipped_dead_lettered = 0usize;
        let stats = storage
            .events
            .replay(&committed, |record| {
                let key = (record.id.clone(), record.enqueued_at.timestamp_millis());
                if dead_lettered.contains(&key) {
                    skipped_dead_lettered += 1;
                    return true;
                }
                match queue.push(record) {
                    Ok(()) => true,
                    Err(record) => {
                        overflow.push(record);
                        false
                    },
                }
            })
            .await;
        let admitted = stats.admitted.saturating_sub(skipped_dead_lettered);
        metrics.record_replay(admitted, stats.rejected);

        info!(
            admitted,
            rejected = stats.rejected,
            skipped_committed = stats.skipped_committed,
            skipped_dead_lettered,
            malformed = stats.malformed,
            committed = committed.len(),
            "event log replay complete"
        );

        let core = Arc::new(BrokerCore {
            config,
            queue,
            storage,
            clock,
            timers: CancellationToken::new(),
            state: Mutex::new(BrokerState { inflight: InflightTracker::new(), committed, metrics }),
            opened_at,
        });

        for record in overflow {
            let id = record.id.clone();
            if let Err(e) =
                core.dead_letter(record, DeadLetterReason::StartupQueueFull, None).await
            {
                error!(event_id = %id, error = %e, "failed to dead-letter replay overflow");
            }
        }

        Ok(Self {
            core,
            handler: None,
            worker_token: CancellationToken::new(),
            runtime: Mutex::new(Runtime::default()),
        })
    }

    /// Sets the callback run by background workers.
    #[must_use]
    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Starts the visibility reaper and, when a handler is set, the worker
    /// pool. Calling it again is a no-op.
    pub fn start(&self) {
        let mut runtime = self.runtime.lock();
        if runtime.reaper.is_some() {
            return;
        }

        runtime.reaper = Some(reaper::spawn(Arc::clone(&self.core)));

        if let Some(handler) = &self.handler {
            if self.core.config.worker_count > 0 {
                let mut pool = WorkerPool::new(
                    Arc::clone(&self.core),
                    Arc::clone(handler),
                    self.worker_token.clone(),
                );
                pool.spawn_workers();
                runtime.workers = Some(pool);
            }
        }

        info!(
            queue_max_size = self.core.config.queue_max_size,
            workers = runtime.workers.as_ref().map_or(0, WorkerPool::len),
            visibility_timeout_ms = duration_ms(self.core.config.visibility_timeout),
            "broker started"
        );
    }

    /// Broker configuration.
    pub fn config(&self) -> &BrokerConfig {
        &self.core.config
    }

    /// Clock the broker timestamps events with.
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.core.clock)
    }

    /// Logs an event and queues it.
    ///
    /// The event id comes from the payload's `id` field when present.
    ///
    /// # Errors
    ///
    /// - `InvalidEvent` when `payload` is not a JSON object or its `id` is
    ///   unusable
    /// - `Storage` when the event could not be logged; nothing was accepted
    /// - `QueueFull` when the queue is at capacity; the event was
    ///   dead-lettered
    pub async fn enqueue(&self, payload: Value, topic: Option<String>) -> Result<EnqueueReceipt> {
        let Value::Object(payload) = payload else {
            return Err(BrokerError::invalid_event("payload must be a JSON object"));
        };
        self.core.enqueue(payload, topic).await
    }

    /// Leases up to `max_events` queued events to the caller.
    ///
    /// Waits up to `timeout` (the configured default when `None`, never
    /// more than the configured maximum) for the batch to fill, then returns
    /// whatever was collected. With a `topic`, only events carrying that
    /// topic are taken and the rest keep their queue position.
    pub async fn consume(
        &self,
        max_events: usize,
        timeout: Option<Duration>,
        topic: Option<&str>,
    ) -> Vec<ConsumedEvent> {
        let max_events = max_events.clamp(1, MAX_EVENTS_PER_CONSUME);
        let timeout = timeout
            .unwrap_or(self.core.config.default_poll_timeout)
            .min(self.core.config.max_poll_timeout);
        let deadline = tokio::time::Instant::now() + timeout;

        let mut events = Vec::new();
        while events.len() < max_events {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let popped = self
                .core
                .queue
                .pop_where(|record| record.matches_topic(topic), Some(remaining))
                .await;
            let Some(record) = popped else { break };

            if let Some(event) = self.core.lease_to_consumer(record) {
                events.push(event);
            }
        }

        if !events.is_empty() {
            debug!(count = events.len(), topic = topic.unwrap_or(""), "events consumed");
        }
        events
    }

    /// Commits the events behind `receipt_ids`.
    ///
    /// Receipts that do not resolve to a live delivery are reported in
    /// [`AckOutcome::failed`] without failing the call.
    ///
    /// # Errors
    ///
    /// Returns a storage error when a commit cannot be persisted. That
    /// receipt's lease is put back so it can be acknowledged again or
    /// reclaimed; receipts before it stay committed.
    pub async fn acknowledge<S: AsRef<str>>(&self, receipt_ids: &[S]) -> Result<AckOutcome> {
        let mut outcome = AckOutcome::default();

        for receipt in receipt_ids {
            let receipt = receipt.as_ref();
            let taken = self.core.state.lock().inflight.take_by_receipt(&ReceiptId::from(receipt));
            let info = match taken {
                Ok(info) => info,
                Err(e) => {
                    debug!(receipt_id = receipt, code = e.code(), "acknowledge rejected");
                    outcome.failed.push(AckFailure::new(receipt, &e));
                    continue;
                },
            };

            if let Err(e) = self.core.storage.commits.append(&info.record.id).await {
                error!(event_id = %info.record.id, error = %e, "failed to persist commit");
                self.core.state.lock().inflight.restore(info);
                return Err(e);
            }

            let now = self.core.clock.now_utc();
            let processing = (now - info.delivered_at).to_std().ok();
            {
                let mut state = self.core.state.lock();
                state.committed.insert(info.record.id.clone());
                state.metrics.record_acknowledged(now, processing);
            }
            debug!(event_id = %info.record.id, receipt_id = receipt, "event acknowledged");
            outcome.acknowledged.push(receipt.to_string());
        }

        Ok(outcome)
    }

    /// Ends a delivery without committing it.
    ///
    /// With `requeue` the failure goes through the retry policy. Without it
    /// the event is dead-lettered straight away.
    ///
    /// # Errors
    ///
    /// - `EventNotFound` for a receipt that was never issued
    /// - `EventNotInflight` for a receipt whose delivery already ended
    /// - `Storage` when the resulting dead-letter entry cannot be written
    pub async fn nack(&self, receipt_id: &str, requeue: bool) -> Result<()> {
        let taken = self.core.state.lock().inflight.take_by_receipt(&ReceiptId::from(receipt_id));
        let info = taken?;
        debug!(event_id = %info.record.id, receipt_id, requeue, "event nacked");

        if requeue {
            self.core.handle_failure(info.record, FailureTrigger::Nack, None).await
        } else {
            self.core.dead_letter(info.record, DeadLetterReason::RejectedByConsumer, None).await
        }
    }

    /// Reclaims every lease whose visibility deadline has passed and returns
    /// how many there were. The reaper calls this on its interval.
    pub async fn reap_expired(&self) -> usize {
        self.core.reap_expired().await
    }

    /// Point-in-time view of queue, leases, commits, dead letters and
    /// workers.
    pub async fn status(&self) -> BrokerStatus {
        let dlq = self.dead_letter_count().await;
        let active = self.runtime.lock().workers.as_ref().map_or(0, WorkerPool::active_workers);
        let total = if self.handler.is_some() { self.core.config.worker_count } else { 0 };
        let uptime =
            duration_ms(self.core.clock.now().saturating_duration_since(self.core.opened_at));

        let state = self.core.state.lock();
        BrokerStatus {
            queue: QueueStatus::new(self.core.queue.len(), self.core.queue.capacity()),
            inflight: InflightStatus {
                count: state.inflight.len(),
                events: state.inflight.summaries(),
            },
            committed: CountStatus { count: state.committed.len() },
            dlq: CountStatus { count: dlq },
            workers: WorkerStatus { active, total },
            uptime,
        }
    }

    /// Lifetime counters and latency.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.core.state.lock().metrics.snapshot()
    }

    /// Reads a page of dead-letter entries in the order they were written.
    /// `limit` is capped at [`MAX_DEAD_LETTER_PAGE`]. Read failures yield an
    /// empty page.
    pub async fn dead_letters(&self, limit: usize, offset: usize) -> Vec<DeadLetterEntry> {
        let limit = limit.min(MAX_DEAD_LETTER_PAGE);
        match self.core.storage.dead_letters.read(limit, offset).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, limit, offset, "failed to read dead letters");
                Vec::new()
            },
        }
    }

    /// Number of dead-letter entries. Read failures count as zero.
    pub async fn dead_letter_count(&self) -> usize {
        match self.core.storage.dead_letters.count().await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "failed to count dead letters");
                0
            },
        }
    }

    /// Enqueues the payload and topic of a dead-lettered event as a new
    /// event. The entry itself stays in the store.
    ///
    /// # Errors
    ///
    /// `EventNotFound` when no entry has `receipt_id`, otherwise the same
    /// errors as [`Broker::enqueue`].
    pub async fn reprocess_dead_letter(&self, receipt_id: &str) -> Result<EnqueueReceipt> {
        let entry = self
            .core
            .storage
            .dead_letters
            .find(&ReceiptId::from(receipt_id))
            .await?
            .ok_or_else(|| BrokerError::not_found(receipt_id))?;

        info!(
            receipt_id,
            event_id = %entry.record.id,
            reason = %entry.reason,
            "reprocessing dead letter"
        );
        self.core.enqueue(entry.record.payload, entry.record.topic).await
    }

    /// Stops the broker.
    ///
    /// Workers stop taking new events and finish the one they hold. Then
    /// the call waits, up to the configured shutdown timeout, for every
    /// outstanding lease to end while the reaper keeps running. Finally the
    /// reaper and pending requeue timers are cancelled; events whose requeue
    /// was cancelled come back from the log on the next start.
    pub async fn shutdown(&self) {
        let timeout = self.core.config.shutdown_timeout;
        info!(
            queued = self.core.queue.len(),
            inflight = self.core.state.lock().inflight.len(),
            timeout_ms = duration_ms(timeout),
            "broker shutting down"
        );

        self.worker_token.cancel();
        let (workers, reaper) = {
            let mut runtime = self.runtime.lock();
            (runtime.workers.take(), runtime.reaper.take())
        };

        let deadline = self.core.clock.now() + timeout;
        if let Some(pool) = workers {
            pool.shutdown_graceful(timeout).await;
        }

        loop {
            let remaining = self.core.state.lock().inflight.len();
            if remaining == 0 {
                break;
            }
            if self.core.clock.now() >= deadline {
                warn!(
                    remaining,
                    timeout_ms = duration_ms(timeout),
                    "shutdown timed out with events still inflight"
                );
                break;
            }
            self.core.clock.sleep(DRAIN_POLL_INTERVAL).await;
        }

        self.core.timers.cancel();
        if let Some(reaper) = reaper {
            if let Err(e) = reaper.await {
                error!(error = %e, "visibility reaper terminated abnormally");
            }
        }

        info!("broker stopped");
    }
}

impl Drop for Broker {
    fn drop(&mut self) {
        self.worker_token.cancel();
        self.core.timers.cancel();
    }
}

impl BrokerCore {
    async fn enqueue(&self, payload: Payload, topic: Option<String>) -> Result<EnqueueReceipt> {
        let id = EventId::from_payload(&payload)?;
        let topic = topic.filter(|t| !t.is_empty());
        let now = self.clock.now_utc();
        let record = EventRecord::new(id.clone(), payload, topic, now);

        self.storage.events.append(&record).await?;

        match self.queue.push(record) {
            Ok(()) => {
                self.state.lock().metrics.record_enqueued(now);
                debug!(event_id = %id, queued = self.queue.len(), "event enqueued");
                Ok(EnqueueReceipt::queued(id, now.timestamp_millis()))
            },
            Err(record) => {
                self.dead_letter(record, DeadLetterReason::QueueFullOnEnqueue, None).await?;
                Err(BrokerError::queue_full(id.as_str(), self.queue.capacity()))
            },
        }
    }

    /// Leases `record` to an external consumer unless it is already
    /// committed or already leased.
    fn lease_to_consumer(&self, record: EventRecord) -> Option<ConsumedEvent> {
        let mut state = self.state.lock();
        if state.committed.contains(&record.id) || state.inflight.contains(&record.id) {
            debug!(event_id = %record.id, "skipping duplicate delivery");
            return None;
        }

        let now = self.clock.now_utc();
        let id = record.id.clone();
        let payload = record.payload.clone();
        let timestamp = record.enqueued_at.timestamp_millis();
        let retries = record.retries;
        let topic = record.topic.clone();
        let deadline = deadline_after(now, self.config.visibility_timeout);
        let receipt_id = state.inflight.lease_to_consumer(record, now, deadline);
        state.metrics.record_consumed();

        Some(ConsumedEvent {
            receipt_id,
            id,
            payload,
            timestamp,
            retries,
            topic,
            delivered_at: now.timestamp_millis(),
        })
    }

    /// Leases `record` to worker `worker_id`, returning the delivery time
    /// that identifies the lease, or `None` when the record is a duplicate.
    pub(crate) fn lease_to_worker(
        &self,
        record: &EventRecord,
        worker_id: usize,
    ) -> Option<DateTime<Utc>> {
        let mut state = self.state.lock();
        if state.committed.contains(&record.id) || state.inflight.contains(&record.id) {
            debug!(event_id = %record.id, worker_id, "skipping duplicate delivery");
            return None;
        }

        let now = self.clock.now_utc();
        state.inflight.lease_to_worker(
            record.clone(),
            worker_id,
            now,
            deadline_after(now, self.config.visibility_timeout),
        );
        state.metrics.record_consumed();
        Some(now)
    }

    /// Commits an event a worker handled successfully.
    ///
    /// Nothing is committed when the reaper already reclaimed the lease. The
    /// reaper's requeue or dead letter stands and the event may be handled
    /// again.
    pub(crate) async fn complete_worker_delivery(
        self: &Arc<Self>,
        id: &EventId,
        worker_id: usize,
        delivered_at: DateTime<Utc>,
        processing: Duration,
    ) {
        let lease = self.state.lock().inflight.take_worker_lease(id, worker_id, delivered_at);
        let Some(lease) = lease else {
            warn!(event_id = %id, worker_id, "lease reclaimed before commit");
            return;
        };

        match self.storage.commits.append(id).await {
            Ok(()) => {
                let now = self.clock.now_utc();
                let mut state = self.state.lock();
                state.committed.insert(id.clone());
                state.metrics.record_acknowledged(now, Some(processing));
                debug!(
                    event_id = %id,
                    worker_id,
                    processing_ms = duration_ms(processing),
                    "event processed"
                );
            },
            Err(e) => {
                error!(event_id = %id, worker_id, error = %e, "failed to persist commit");
                self.fail_logged(lease.record, FailureTrigger::Handler, Some(e.to_string())).await;
            },
        }
    }

    /// Routes a handler failure through the retry policy, unless the reaper
    /// already took the lease.
    pub(crate) async fn fail_worker_delivery(
        self: &Arc<Self>,
        id: &EventId,
        worker_id: usize,
        delivered_at: DateTime<Utc>,
        error: String,
    ) {
        let lease = self.state.lock().inflight.take_worker_lease(id, worker_id, delivered_at);
        match lease {
            Some(info) => self.fail_logged(info.record, FailureTrigger::Handler, Some(error)).await,
            None => debug!(event_id = %id, worker_id, "lease reclaimed before handler failed"),
        }
    }

    pub(crate) async fn reap_expired(self: &Arc<Self>) -> usize {
        let now = self.clock.now_utc();
        let expired = self.state.lock().inflight.take_expired(now);
        let count = expired.len();

        for info in expired {
            info!(
                event_id = %info.record.id,
                worker_id = info.worker_id,
                retries = info.record.retries,
                overdue_ms = (now - info.deadline).num_milliseconds(),
                "visibility timeout expired"
            );
            self.fail_logged(info.record, FailureTrigger::VisibilityTimeout, None).await;
        }

        count
    }

    async fn fail_logged(
        self: &Arc<Self>,
        record: EventRecord,
        trigger: FailureTrigger,
        error: Option<String>,
    ) {
        let id = record.id.clone();
        if let Err(e) = self.handle_failure(record, trigger, error).await {
            error!(event_id = %id, error = %e, "failed to dead-letter event");
        }
    }

    /// Counts one failed cycle against `record` and either schedules its
    /// requeue or dead-letters it.
    async fn handle_failure(
        self: &Arc<Self>,
        mut record: EventRecord,
        trigger: FailureTrigger,
        error: Option<String>,
    ) -> Result<()> {
        record.retries = record.retries.saturating_add(1);
        self.state.lock().metrics.record_failed(self.clock.now_utc());

        match self.config.retry_policy.decide(record.retries, trigger) {
            RetryDecision::GiveUp { reason } => self.dead_letter(record, reason, error).await,
            RetryDecision::Requeue { delay } => {
                debug!(
                    event_id = %record.id,
                    retries = record.retries,
                    delay_ms = duration_ms(delay),
                    "requeue scheduled"
                );
                self.schedule_requeue(record, delay);
                Ok(())
            },
        }
    }

    fn schedule_requeue(self: &Arc<Self>, record: EventRecord, delay: Duration) {
        let core = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                () = core.clock.sleep(delay) => {},
                () = core.timers.cancelled() => {
                    debug!(event_id = %record.id, "requeue cancelled by shutdown");
                    return;
                },
            }

            let id = record.id.clone();
            match core.queue.push(record) {
                Ok(()) => debug!(event_id = %id, "event requeued"),
                Err(record) => {
                    if let Err(e) =
                        core.dead_letter(record, DeadLetterReason::QueueFullOnRequeue, None).await
                    {
                        error!(
                            event_id = %id,
                            error = %e,
                            "failed to dead-letter requeue overflow"
                        );
                    }
                },
            }
        });
    }

    async fn dead_letter(
        &self,
        record: EventRecord,
        reason: DeadLetterReason,
        error: Option<String>,
    ) -> Result<()> {
        let entry = DeadLetterEntry::new(record, reason, error, self.clock.now_utc());
        self.storage.dead_letters.append(&entry).await?;
        self.state.lock().metrics.record_dead_lettered();

        warn!(
            event_id = %entry.record.id,
            receipt_id = %entry.receipt_id,
            reason = %reason,
            retries = entry.record.retries,
            error = entry.error.as_deref().unwrap_or(""),
            "event dead-lettered"
        );
        Ok(())
    }
}

fn deadline_after(now: DateTime<Utc>, timeout: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(timeout)
        .ok()
        .and_then(|timeout| now.checked_add_signed(timeout))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
