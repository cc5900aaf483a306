//! File-backed persistence for the broker.
//!
//! Three append-only JSON-lines files live under the data directory:
//!
//! - `events.log` - every accepted event, written before it is queued
//! - `committed.log` - ids of acknowledged or successfully handled events
//! - `dlq.log` - dead-letter entries
//!
//! Nothing is ever rewritten in place. Recovery is a replay of `events.log`
//! minus the ids in `committed.log`.

mod commit_ledger;
mod dead_letters;
mod event_log;
mod line_log;

use std::path::{Path, PathBuf};

pub use commit_ledger::CommitLedger;
pub use dead_letters::DeadLetterStore;
pub use event_log::{parse_event_line, EventLog, ReplayStats};
use spool_core::{BrokerError, Result};
use tracing::info;

/// File name of the durable event log.
pub const EVENTS_FILE: &str = "events.log";
/// File name of the commit ledger.
pub const COMMITTED_FILE: &str = "committed.log";
/// File name of the dead-letter store.
pub const DEAD_LETTER_FILE: &str = "dlq.log";

/// The broker's three logs, opened together over one data directory.
#[derive(Debug)]
pub struct Storage {
    /// Write-ahead event log
    pub events: EventLog,
    /// Completed event ids
    pub commits: CommitLedger,
    /// Given-up events
    pub dead_letters: DeadLetterStore,
    data_dir: PathBuf,
}

impl Storage {
    /// Opens (creating if needed) the data directory and its log files.
    ///
    /// With `sync_writes` every append is fsynced before it returns.
    pub async fn open(data_dir: impl AsRef<Path>, sync_writes: bool) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .map_err(|e| BrokerError::storage("create data directory", e))?;

        let events = EventLog::open(data_dir.join(EVENTS_FILE), sync_writes).await?;
        let commits = CommitLedger::open(data_dir.join(COMMITTED_FILE), sync_writes).await?;
        let dead_letters =
            DeadLetterStore::open(data_dir.join(DEAD_LETTER_FILE), sync_writes).await?;

        info!(data_dir = %data_dir.display(), sync_writes, "storage opened");
        Ok(Self { events, commits, dead_letters, data_dir })
    }

    /// Directory holding the log files.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
