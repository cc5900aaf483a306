//! Write-ahead log of accepted events.
//!
//! Every event is appended here before it becomes visible in the queue.
//! The file is never rewritten: completed events stay in it and are skipped
//! on replay by consulting the commit ledger.

use std::{collections::HashSet, path::Path};

use spool_core::{BrokerError, EventId, EventRecord, Result};
use tracing::{debug, warn};

use super::line_log::LineLog;

/// Outcome of replaying the event log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Records handed to the visitor and accepted
    pub admitted: usize,
    /// Records handed to the visitor and refused
    pub rejected: usize,
    /// Records skipped because they were already committed
    pub skipped_committed: usize,
    /// Lines that did not parse as an event record
    pub malformed: usize,
}

/// Parses one log line into an event record.
pub fn parse_event_line(line: &[u8]) -> serde_json::Result<EventRecord> {
    serde_json::from_slice(line)
}

/// Append-only durable event log.
#[derive(Debug)]
pub struct EventLog {
    log: LineLog,
}

impl EventLog {
    pub(crate) async fn open(path: impl AsRef<Path>, sync_writes: bool) -> Result<Self> {
        let log = LineLog::open(path, sync_writes)
            .await
            .map_err(|e| BrokerError::storage("open event log", e))?;
        Ok(Self { log })
    }

    /// Durably appends `record`. Returns once the line is on disk.
    pub async fn append(&self, record: &EventRecord) -> Result<()> {
        let line =
            serde_json::to_vec(record).map_err(|e| BrokerError::storage("encode event", e))?;
        self.log.append(&line).await.map_err(|e| BrokerError::storage("append event", e))
    }

    /// Replays every uncommitted record in log order.
    ///
    /// Malformed lines are logged and skipped. A read failure part way
    /// through is logged and ends the replay with whatever was visited so
    /// far. `visit` returns `false` when it could not admit the record; such
    /// records are counted, not treated as errors.
    pub async fn replay<F>(&self, committed: &HashSet<EventId>, mut visit: F) -> ReplayStats
    where
        F: FnMut(EventRecord) -> bool,
    {
        let mut stats = ReplayStats::default();
        let mut line_no = 0usize;

        let scanned = self
            .log
            .scan(|line| {
                line_no += 1;
                match parse_event_line(line) {
                    Ok(record) if committed.contains(&record.id) => {
                        stats.skipped_committed += 1;
                    },
                    Ok(record) => {
                        if visit(record) {
                            stats.admitted += 1;
                        } else {
                            stats.rejected += 1;
                        }
                    },
                    Err(e) => {
                        stats.malformed += 1;
                        warn!(line = line_no, error = %e, "skipping malformed event log line");
                    },
                }
                true
            })
            .await;

        if let Err(e) = scanned {
            warn!(
                path = %self.log.path().display(),
                error = %e,
                lines_read = line_no,
                "event log replay stopped early"
            );
        }

        debug!(?stats, "event log replayed");
        stats
    }
}
