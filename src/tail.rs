// tail.rs
// Live phase: react to audit notifications until shutdown is requested.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::notification::{ChannelMessage, NotificationPayload};
use crate::replayer::{Outcome, Phase, Replayer};
use crate::sink::Sink;
use crate::subscription::AuditSource;
use crate::table::Table;

/// How often the wait for notifications wakes up to check for a shutdown request.
pub const DEFAULT_STOP_POLL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TailSummary {
    pub received: u64,
    pub replayed: u64,
    pub missing: u64,
    pub ignored: u64,
}

#[derive(Debug, Clone)]
pub struct LiveTailer {
    pub audit_table: Table,
    pub channel: String,
    pub stop_poll: Duration,
}

impl LiveTailer {
    pub fn new(audit_table: Table, channel: &str) -> Self {
        LiveTailer {
            audit_table,
            channel: channel.to_string(),
            stop_poll: DEFAULT_STOP_POLL,
        }
    }

    /// Runs until `stop` is set. Only store errors end the loop early.
    pub fn run<A, S>(
        &self,
        source: &mut A,
        replayer: &mut Replayer<S>,
        stop: &AtomicBool,
    ) -> Result<TailSummary>
    where
        A: AuditSource,
        S: Sink,
    {
        info!(channel = %self.channel, "tailing live audit events");
        let mut summary = TailSummary::default();
        while !stop.load(Ordering::Relaxed) {
            let Some(message) = source.next_notification(self.stop_poll)? else {
                continue;
            };
            summary.received += 1;
            self.handle(&message, source, replayer, &mut summary)?;
        }
        info!(
            received = summary.received,
            replayed = summary.replayed,
            missing = summary.missing,
            ignored = summary.ignored,
            "live tailing stopped"
        );
        Ok(summary)
    }

    fn handle<A, S>(
        &self,
        message: &ChannelMessage,
        source: &mut A,
        replayer: &mut Replayer<S>,
        summary: &mut TailSummary,
    ) -> Result<()>
    where
        A: AuditSource,
        S: Sink,
    {
        if message.channel != self.channel {
            debug!(channel = %message.channel, "ignoring notification on foreign channel");
            summary.ignored += 1;
            return Ok(());
        }
        let payload = match NotificationPayload::parse(&message.payload) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "ignoring malformed notification");
                summary.ignored += 1;
                return Ok(());
            }
        };
        if !self.audit_table.matches(&payload.audit_table) {
            debug!(
                audit_table = %payload.audit_table,
                "ignoring notification for another audit table"
            );
            summary.ignored += 1;
            return Ok(());
        }
        match source.fetch_event(&self.audit_table, payload.event_id)? {
            Some(record) => match replayer.replay(&record, Phase::Live)? {
                Outcome::Emitted => {
                    summary.replayed += 1;
                    info!("sync event for payload: {}", message.payload);
                }
                Outcome::OutOfOrder => {
                    summary.replayed += 1;
                    warn!(
                        event_id = %record.event_id,
                        checkpoint = %replayer.checkpoint().last(),
                        "replayed event committed out of id order: {}",
                        message.payload
                    );
                }
                Outcome::BeforeStart => {
                    summary.ignored += 1;
                    warn!(
                        event_id = %record.event_id,
                        "event at or below the start checkpoint was not replayed: {}",
                        message.payload
                    );
                }
                Outcome::AlreadyReplayed | Outcome::Ignored | Outcome::Skipped => {
                    summary.ignored += 1
                }
            },
            None => {
                summary.missing += 1;
                warn!("could not find event for payload: {}", message.payload);
            }
        }
        Ok(())
    }
}
