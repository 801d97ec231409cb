// backlog.rs
// Catch-up phase: stream every actionable audit record above the checkpoint.

use std::sync::atomic::{AtomicBool, Ordering};

use postgres::Client;
use postgres::fallible_iterator::FallibleIterator;
use tracing::info;

use crate::audit::{AuditRecord, EventId, select_columns};
use crate::error::{Error, Result};
use crate::replayer::{Phase, Replayer};
use crate::sink::Sink;
use crate::table::Table;

pub const DEFAULT_PROGRESS_INTERVAL: u64 = 10_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BacklogSummary {
    pub processed: u64,
    pub last_event_id: Option<EventId>,
    /// Stopped by a shutdown request before the backlog was exhausted.
    pub interrupted: bool,
}

#[derive(Debug, Clone)]
pub struct BacklogReader {
    pub audit_table: Table,
    pub progress_interval: u64,
}

impl BacklogReader {
    pub fn new(audit_table: Table, progress_interval: u64) -> Self {
        BacklogReader {
            audit_table,
            progress_interval: progress_interval.max(1),
        }
    }

    pub fn query(&self) -> String {
        format!(
            "{} WHERE event_id > $1::bigint AND action IN ('I', 'U', 'D') ORDER BY event_id ASC",
            select_columns(&self.audit_table)
        )
    }

    /// Streams the backlog row by row in a single query and replays each record.
    pub fn drain<S: Sink>(
        &self,
        client: &mut Client,
        start: EventId,
        replayer: &mut Replayer<S>,
        stop: &AtomicBool,
    ) -> Result<BacklogSummary> {
        info!(audit_table = %self.audit_table, start_event_id = %start, "replaying backlog");
        let query = self.query();
        let rows = client.query_raw(query.as_str(), [start.0])?;
        let records = rows
            .iterator()
            .map(|row| row.map_err(Error::from).and_then(|row| AuditRecord::from_row(&row)));
        self.replay_records(records, replayer, stop)
    }

    /// Replays records in the order given, reporting progress every `progress_interval`.
    pub fn replay_records<I, S>(
        &self,
        records: I,
        replayer: &mut Replayer<S>,
        stop: &AtomicBool,
    ) -> Result<BacklogSummary>
    where
        I: IntoIterator<Item = Result<AuditRecord>>,
        S: Sink,
    {
        let mut summary = BacklogSummary::default();
        for record in records {
            if stop.load(Ordering::Relaxed) {
                summary.interrupted = true;
                break;
            }
            let record = record?;
            replayer.replay(&record, Phase::Backlog)?;
            if summary.processed % self.progress_interval == 0 {
                info!(
                    timestamp = %record.timestamp,
                    event_id = %record.event_id,
                    "{} events synced",
                    summary.processed
                );
            }
            summary.processed += 1;
            summary.last_event_id = Some(record.event_id);
        }
        if summary.interrupted {
            info!(processed = summary.processed, "backlog replay interrupted");
        } else {
            info!(
                processed = summary.processed,
                last_event_id = ?summary.last_event_id.map(|id| id.0),
                "backlog exhausted"
            );
        }
        Ok(summary)
    }
}
