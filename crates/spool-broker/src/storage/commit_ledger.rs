//! Append-only record of completed event ids.
//!
//! Each line is one JSON-encoded event id. Plain unquoted lines are also
//! accepted on load so hand-edited ledgers keep working.

use std::{collections::HashSet, path::Path};

use spool_core::{BrokerError, EventId, Result};
use tracing::warn;

use super::line_log::LineLog;

/// Durable set of committed event ids.
#[derive(Debug)]
pub struct CommitLedger {
    log: LineLog,
}

impl CommitLedger {
    pub(crate) async fn open(path: impl AsRef<Path>, sync_writes: bool) -> Result<Self> {
        let log = LineLog::open(path, sync_writes)
            .await
            .map_err(|e| BrokerError::storage("open commit ledger", e))?;
        Ok(Self { log })
    }

    /// Durably records `id` as completed.
    pub async fn append(&self, id: &EventId) -> Result<()> {
        let line = serde_json::to_vec(id).map_err(|e| BrokerError::storage("encode commit", e))?;
        self.log.append(&line).await.map_err(|e| BrokerError::storage("append commit", e))
    }

    /// Loads every committed id.
    pub async fn load(&self) -> Result<HashSet<EventId>> {
        let mut committed = HashSet::new();

        self.log
            .scan(|line| {
                match serde_json::from_slice::<EventId>(line) {
                    Ok(id) => {
                        committed.insert(id);
                    },
                    Err(_) => match std::str::from_utf8(line) {
                        Ok(raw) if !raw.starts_with('"') => {
                            committed.insert(EventId::new(raw));
                        },
                        _ => warn!("skipping unreadable commit ledger line"),
                    },
                }
                true
            })
            .await
            .map_err(|e| BrokerError::storage("load commit ledger", e))?;

        Ok(committed)
    }
}
