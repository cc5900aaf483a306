//! Leases on delivered-but-unfinished events.
//!
//! An event is in flight from the moment a consumer or worker takes it off
//! the queue until it is acknowledged, negatively acknowledged, handled, or
//! reclaimed by the visibility reaper. Removing an entry is the single point
//! where one of those outcomes wins; whoever removes it owns what happens
//! next, so a delivery is never both acknowledged and retried.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;
use spool_core::{BrokerError, EventId, EventRecord, ReceiptId, Result};

/// Default number of consumed receipts remembered for error reporting.
pub const RETIRED_RECEIPT_CAPACITY: usize = 10_000;

/// Lease held on one in-flight event.
#[derive(Debug, Clone)]
pub struct InflightInfo {
    /// The event being processed
    pub record: EventRecord,
    /// When the lease expires and the reaper reclaims it
    pub deadline: DateTime<Utc>,
    /// When the lease started
    pub delivered_at: DateTime<Utc>,
    /// Holder, for worker leases
    pub worker_id: Option<usize>,
    /// Receipt, for consumer leases
    pub receipt_id: Option<ReceiptId>,
}

/// Status view of one lease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InflightSummary {
    /// Event id
    pub id: EventId,
    /// Lease expiry, epoch milliseconds
    pub deadline: i64,
    /// Failed cycles so far
    pub retries: u32,
}

/// Tracks leases and the receipts pointing at them.
#[derive(Debug)]
pub struct InflightTracker {
    entries: HashMap<EventId, InflightInfo>,
    receipts: HashMap<ReceiptId, EventId>,
    retired: RetiredReceipts,
}

impl Default for InflightTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl InflightTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::with_retired_capacity(RETIRED_RECEIPT_CAPACITY)
    }

    /// Creates an empty tracker remembering up to `capacity` consumed
    /// receipts.
    pub fn with_retired_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            receipts: HashMap::new(),
            retired: RetiredReceipts::new(capacity),
        }
    }

    /// Whether `id` is currently leased.
    pub fn contains(&self, id: &EventId) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of leases.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is leased.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Leases `record` to an external consumer and returns the receipt that
    /// identifies this delivery.
    pub fn lease_to_consumer(
        &mut self,
        record: EventRecord,
        delivered_at: DateTime<Utc>,
        deadline: DateTime<Utc>,
    ) -> ReceiptId {
        let receipt_id = ReceiptId::generate();
        self.receipts.insert(receipt_id.clone(), record.id.clone());
        self.entries.insert(
            record.id.clone(),
            InflightInfo {
                record,
                deadline,
                delivered_at,
                worker_id: None,
                receipt_id: Some(receipt_id.clone()),
            },
        );
        receipt_id
    }

    /// Leases `record` to an internal worker.
    pub fn lease_to_worker(
        &mut self,
        record: EventRecord,
        worker_id: usize,
        delivered_at: DateTime<Utc>,
        deadline: DateTime<Utc>,
    ) {
        self.entries.insert(
            record.id.clone(),
            InflightInfo {
                record,
                deadline,
                delivered_at,
                worker_id: Some(worker_id),
                receipt_id: None,
            },
        );
    }

    /// Ends the lease named by `receipt_id` and returns it.
    ///
    /// Fails with `EventNotFound` for receipts never issued (or forgotten)
    /// and with `EventNotInflight` for receipts whose delivery already ended.
    pub fn take_by_receipt(&mut self, receipt_id: &ReceiptId) -> Result<InflightInfo> {
        let Some(event_id) = self.receipts.get(receipt_id).cloned() else {
            return Err(match self.retired.event_for(receipt_id) {
                Some(event_id) => BrokerError::not_inflight(event_id.as_str()),
                None => BrokerError::not_found(receipt_id.as_str()),
            });
        };

        let current = self.entries.get(&event_id).and_then(|info| info.receipt_id.as_ref());
        if current != Some(receipt_id) {
            self.receipts.remove(receipt_id);
            self.retired.insert(receipt_id.clone(), event_id.clone());
            return Err(BrokerError::not_inflight(event_id.as_str()));
        }

        self.take(&event_id).ok_or_else(|| BrokerError::not_inflight(event_id.as_str()))
    }

    /// Ends the lease on `id`, whoever holds it.
    pub fn take(&mut self, id: &EventId) -> Option<InflightInfo> {
        let info = self.entries.remove(id)?;
        if let Some(receipt_id) = &info.receipt_id {
            self.receipts.remove(receipt_id);
            self.retired.insert(receipt_id.clone(), id.clone());
        }
        Some(info)
    }

    /// Ends the lease on `id` only if it is still the worker delivery that
    /// started at `delivered_at`. A lease the reaper reclaimed and handed
    /// out again is left alone.
    pub fn take_worker_lease(
        &mut self,
        id: &EventId,
        worker_id: usize,
        delivered_at: DateTime<Utc>,
    ) -> Option<InflightInfo> {
        let owned = self
            .entries
            .get(id)
            .is_some_and(|info| {
                info.worker_id == Some(worker_id) && info.delivered_at == delivered_at
            });
        if owned {
            self.take(id)
        } else {
            None
        }
    }

    /// Puts back a lease taken by [`Self::take_by_receipt`] or
    /// [`Self::take`] when the follow-up could not be persisted.
    pub fn restore(&mut self, info: InflightInfo) {
        if let Some(receipt_id) = &info.receipt_id {
            self.retired.forget(receipt_id);
            self.receipts.insert(receipt_id.clone(), info.record.id.clone());
        }
        self.entries.insert(info.record.id.clone(), info);
    }

    /// Ends and returns every lease whose deadline is at or before `now`,
    /// earliest deadline first.
    pub fn take_expired(&mut self, now: DateTime<Utc>) -> Vec<InflightInfo> {
        let mut expired: Vec<EventId> = self
            .entries
            .iter()
            .filter(|(_, info)| info.deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();
        expired.sort_by_key(|id| self.entries.get(id).map(|info| info.deadline));

        expired.iter().filter_map(|id| self.take(id)).collect()
    }

    /// Status view of every lease, earliest deadline first.
    pub fn summaries(&self) -> Vec<InflightSummary> {
        let mut summaries: Vec<InflightSummary> = self
            .entries
            .values()
            .map(|info| InflightSummary {
                id: info.record.id.clone(),
                deadline: info.deadline.timestamp_millis(),
                retries: info.record.retries,
            })
            .collect();
        summaries.sort_by(|a, b| a.deadline.cmp(&b.deadline).then_with(|| a.id.cmp(&b.id)));
        summaries
    }
}

/// Bounded memory of receipts whose delivery ended.
#[derive(Debug)]
struct RetiredReceipts {
    order: VecDeque<ReceiptId>,
    events: HashMap<ReceiptId, EventId>,
    capacity: usize,
}

impl RetiredReceipts {
    fn new(capacity: usize) -> Self {
        Self { order: VecDeque::new(), events: HashMap::new(), capacity }
    }

    fn insert(&mut self, receipt_id: ReceiptId, event_id: EventId) {
        if self.capacity == 0 {
            return;
        }
        if self.events.insert(receipt_id.clone(), event_id).is_none() {
            self.order.push_back(receipt_id);
        }
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.events.remove(&oldest);
            }
        }
    }

    fn forget(&mut self, receipt_id: &ReceiptId) {
        if self.events.remove(receipt_id).is_some() {
            self.order.retain(|r| r != receipt_id);
        }
    }

    fn event_for(&self, receipt_id: &ReceiptId) -> Option<&EventId> {
        self.events.get(receipt_id)
    }
}
