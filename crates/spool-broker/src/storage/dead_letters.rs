//! Append-only store of events that were given up on.

use std::path::Path;

use spool_core::{BrokerError, DeadLetterEntry, ReceiptId, Result};
use tracing::warn;

use super::line_log::LineLog;

/// Durable dead-letter queue, oldest entry first.
#[derive(Debug)]
pub struct DeadLetterStore {
    log: LineLog,
}

impl DeadLetterStore {
    pub(crate) async fn open(path: impl AsRef<Path>, sync_writes: bool) -> Result<Self> {
        let log = LineLog::open(path, sync_writes)
            .await
            .map_err(|e| BrokerError::storage("open dead-letter store", e))?;
        Ok(Self { log })
    }

    /// Durably appends `entry`.
    pub async fn append(&self, entry: &DeadLetterEntry) -> Result<()> {
        let line = serde_json::to_vec(entry)
            .map_err(|e| BrokerError::storage("encode dead letter", e))?;
        self.log.append(&line).await.map_err(|e| BrokerError::storage("append dead letter", e))
    }

    /// Returns up to `limit` entries after skipping the first `offset`.
    pub async fn read(&self, limit: usize, offset: usize) -> Result<Vec<DeadLetterEntry>> {
        let mut entries = Vec::new();
        if limit == 0 {
            return Ok(entries);
        }

        let mut index = 0usize;
        self.scan_entries(|entry| {
            if index >= offset {
                entries.push(entry);
            }
            index += 1;
            entries.len() < limit
        })
        .await?;

        Ok(entries)
    }

    /// Every readable entry, oldest first.
    pub async fn all(&self) -> Result<Vec<DeadLetterEntry>> {
        self.read(usize::MAX, 0).await
    }

    /// Number of readable entries.
    pub async fn count(&self) -> Result<usize> {
        let mut count = 0usize;
        self.scan_entries(|_| {
            count += 1;
            true
        })
        .await?;
        Ok(count)
    }

    /// Looks an entry up by its receipt.
    pub async fn find(&self, receipt_id: &ReceiptId) -> Result<Option<DeadLetterEntry>> {
        let mut found = None;
        self.scan_entries(|entry| {
            if &entry.receipt_id == receipt_id {
                found = Some(entry);
                return false;
            }
            true
        })
        .await?;
        Ok(found)
    }

    async fn scan_entries<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(DeadLetterEntry) -> bool,
    {
        self.log
            .scan(|line| match serde_json::from_slice::<DeadLetterEntry>(line) {
                Ok(entry) => visit(entry),
                Err(e) => {
                    warn!(error = %e, "skipping malformed dead-letter line");
                    true
                },
            })
            .await
            .map_err(|e| BrokerError::storage("read dead letters", e))
    }
}
