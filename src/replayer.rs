// replayer.rs
// Shared per-record path for both phases: build, emit, advance the checkpoint.

use tracing::{debug, warn};

use crate::args::InvalidRecordPolicy;
use crate::audit::{AuditRecord, Checkpoint, EventId, UnseenIds};
use crate::error::Result;
use crate::sink::Sink;
use crate::statement::StatementBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Backlog,
    Live,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Emitted,
    /// Action kind that is never replayed.
    Ignored,
    /// Record could not be turned into a statement and the skip policy is active.
    Skipped,
    /// Live record below the checkpoint whose id was skipped earlier; emitted late.
    OutOfOrder,
    /// Live record already replayed in this session.
    AlreadyReplayed,
    /// Live record at or below the starting checkpoint; left to the operator.
    BeforeStart,
}

pub struct Replayer<S: Sink> {
    builder: StatementBuilder,
    sink: S,
    checkpoint: Checkpoint,
    start: EventId,
    unseen: UnseenIds,
    on_invalid_record: InvalidRecordPolicy,
}

impl<S: Sink> Replayer<S> {
    pub fn new(
        builder: StatementBuilder,
        sink: S,
        checkpoint: Checkpoint,
        on_invalid_record: InvalidRecordPolicy,
    ) -> Self {
        Replayer {
            builder,
            sink,
            start: checkpoint.last(),
            checkpoint,
            unseen: UnseenIds::default(),
            on_invalid_record,
        }
    }

    pub fn checkpoint(&self) -> Checkpoint {
        self.checkpoint
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Backlog records are replayed in delivery order. A live record at or below the
    /// checkpoint is only replayed if its id was skipped when the checkpoint moved past it.
    pub fn replay(&mut self, record: &AuditRecord, phase: Phase) -> Result<Outcome> {
        let late = if self.checkpoint.covers(record.event_id) {
            let unseen = self.unseen.take(record.event_id);
            if phase == Phase::Live && !unseen {
                let outcome = if record.event_id <= self.start {
                    Outcome::BeforeStart
                } else {
                    Outcome::AlreadyReplayed
                };
                debug!(
                    event_id = %record.event_id,
                    checkpoint = %self.checkpoint.last(),
                    ?outcome,
                    "not replaying live event"
                );
                return Ok(outcome);
            }
            unseen
        } else {
            self.unseen
                .skip_between(self.checkpoint.last(), record.event_id);
            false
        };
        let outcome = match self.builder.build(record) {
            Ok(Some(statement)) => {
                self.sink.emit(&statement)?;
                if late {
                    Outcome::OutOfOrder
                } else {
                    Outcome::Emitted
                }
            }
            Ok(None) => {
                debug!(event_id = %record.event_id, action = ?record.action, "ignoring action");
                Outcome::Ignored
            }
            Err(e) if e.is_record_error() && self.on_invalid_record == InvalidRecordPolicy::Skip => {
                warn!(event_id = %record.event_id, error = %e, "skipping record");
                Outcome::Skipped
            }
            Err(e) => return Err(e),
        };
        self.checkpoint.advance(record.event_id);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn record(event_id: i64, action: &str, row_data: &str) -> AuditRecord {
        AuditRecord::from_parts(
            EventId(event_id),
            String::new(),
            "users".to_string(),
            action,
            Some(row_data),
            None,
        )
    }

    fn replayer(start: i64, policy: InvalidRecordPolicy) -> Replayer<Vec<String>> {
        Replayer::new(
            StatementBuilder::default(),
            Vec::new(),
            Checkpoint::new(EventId(start)),
            policy,
        )
    }

    #[test]
    fn test_live_records_at_or_below_start_are_not_replayed() {
        let mut replayer = replayer(10, InvalidRecordPolicy::Abort);
        let outcome = replayer
            .replay(&record(10, "D", r#"{"id":1}"#), Phase::Live)
            .unwrap();
        assert_eq!(outcome, Outcome::BeforeStart);
        let outcome = replayer
            .replay(&record(11, "D", r#"{"id":1}"#), Phase::Live)
            .unwrap();
        assert_eq!(outcome, Outcome::Emitted);
        assert_eq!(replayer.checkpoint().last(), EventId(11));
        assert_eq!(replayer.into_sink().len(), 1);
    }

    #[test]
    fn test_live_record_seen_by_backlog_is_dropped() {
        let mut replayer = replayer(0, InvalidRecordPolicy::Abort);
        replayer
            .replay(&record(4, "D", r#"{"id":4}"#), Phase::Backlog)
            .unwrap();
        let outcome = replayer
            .replay(&record(4, "D", r#"{"id":4}"#), Phase::Live)
            .unwrap();
        assert_eq!(outcome, Outcome::AlreadyReplayed);
        assert_eq!(replayer.into_sink().len(), 1);
    }

    #[test]
    fn test_late_commit_below_checkpoint_is_replayed_once() {
        let mut replayer = replayer(0, InvalidRecordPolicy::Abort);
        for id in [1, 2, 4] {
            replayer
                .replay(&record(id, "D", &format!(r#"{{"id":{id}}}"#)), Phase::Backlog)
                .unwrap();
        }
        let late = record(3, "I", r#"{"id":3}"#);
        assert_eq!(
            replayer.replay(&late, Phase::Live).unwrap(),
            Outcome::OutOfOrder
        );
        assert_eq!(
            replayer.replay(&late, Phase::Live).unwrap(),
            Outcome::AlreadyReplayed
        );
        assert_eq!(replayer.checkpoint().last(), EventId(4));
        assert_eq!(
            replayer.into_sink().last().map(String::as_str),
            Some(r#"INSERT INTO "users" ("id") VALUES (3);"#)
        );
    }

    #[test]
    fn test_skip_policy_advances_past_bad_record() {
        let mut replayer = replayer(0, InvalidRecordPolicy::Skip);
        let outcome = replayer
            .replay(&record(3, "U", r#"{"name":"no id"}"#), Phase::Backlog)
            .unwrap();
        assert_eq!(outcome, Outcome::Skipped);
        assert_eq!(replayer.checkpoint().last(), EventId(3));
        assert!(replayer.into_sink().is_empty());
    }

    #[test]
    fn test_abort_policy_surfaces_error() {
        let mut replayer = replayer(0, InvalidRecordPolicy::Abort);
        let err = replayer
            .replay(&record(3, "D", "{}"), Phase::Backlog)
            .unwrap_err();
        assert!(matches!(err, Error::MissingKey { .. }));
        assert_eq!(replayer.checkpoint().last(), EventId(0));
    }

    #[test]
    fn test_ignored_action_still_advances() {
        let mut replayer = replayer(0, InvalidRecordPolicy::Abort);
        let outcome = replayer
            .replay(&record(4, "T", "{}"), Phase::Live)
            .unwrap();
        assert_eq!(outcome, Outcome::Ignored);
        assert_eq!(replayer.checkpoint().last(), EventId(4));
    }
}
