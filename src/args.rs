use clap::{Parser, ValueEnum};

use crate::audit::EventId;
use crate::backlog::DEFAULT_PROGRESS_INTERVAL;
use crate::error::Result;
use crate::notification::DEFAULT_CHANNEL;
use crate::table::Table;

/// What to do with an update/delete lacking its key, or an insert with no columns.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidRecordPolicy {
    /// Stop with a non-zero exit status
    #[default]
    Abort,
    /// Log a warning and move on to the next record
    Skip,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// [Re]-start after this event id
    #[arg(short = 'e', long, default_value_t = 0, allow_negative_numbers = true)]
    pub start_event_id: i64,

    /// Audit table to read from (`table` or `schema.table`)
    #[arg(short, long)]
    pub audit_table: String,

    /// Connection string for the source event database
    #[arg(short, long, env = "AUDIT_REPLAY_CONNECTION", hide_env_values = true)]
    pub connection: String,

    /// Notification channel the audit trigger publishes on
    #[arg(long, default_value = DEFAULT_CHANNEL)]
    pub channel: String,

    /// Primary key column used in UPDATE/DELETE predicates (repeat for composite keys)
    #[arg(short, long = "key-column", default_values_t = vec!["id".to_string()])]
    pub key_columns: Vec<String>,

    /// Handling of records that cannot be turned into a statement
    #[arg(long, value_enum, default_value_t = InvalidRecordPolicy::Abort)]
    pub on_invalid_record: InvalidRecordPolicy,

    /// Report backlog progress every N events
    #[arg(long, default_value_t = DEFAULT_PROGRESS_INTERVAL)]
    pub progress_interval: u64,

    /// Exit once the backlog is exhausted instead of tailing live events
    #[arg(long)]
    pub no_follow: bool,
}

/// Validated settings for one replay session.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    pub audit_table: Table,
    pub start_event_id: EventId,
    pub channel: String,
    pub key_columns: Vec<String>,
    pub on_invalid_record: InvalidRecordPolicy,
    pub progress_interval: u64,
    pub follow: bool,
}

impl ReplayConfig {
    pub fn new(audit_table: Table) -> Self {
        ReplayConfig {
            audit_table,
            start_event_id: EventId::default(),
            channel: DEFAULT_CHANNEL.to_string(),
            key_columns: vec!["id".to_string()],
            on_invalid_record: InvalidRecordPolicy::default(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            follow: true,
        }
    }
}

impl Args {
    pub fn config(&self) -> Result<ReplayConfig> {
        Ok(ReplayConfig {
            audit_table: self.audit_table.parse()?,
            start_event_id: EventId(self.start_event_id),
            channel: self.channel.clone(),
            key_columns: self.key_columns.clone(),
            on_invalid_record: self.on_invalid_record,
            progress_interval: self.progress_interval,
            follow: !self.no_follow,
        })
    }
}

pub fn get_args() -> std::result::Result<Args, clap::Error> {
    Args::try_parse()
}
