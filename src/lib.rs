//! Replays a trigger-populated audit table as a stream of INSERT/UPDATE/DELETE statements.

pub mod args;
pub mod audit;
pub mod backlog;
pub mod encode;
pub mod error;
pub mod notification;
pub mod orchestrator;
pub mod replayer;
pub mod sink;
pub mod statement;
pub mod subscription;
pub mod table;
pub mod tail;
pub mod value;

#[cfg(test)]
mod test_support;

// Re-export key types for ergonomic access

pub use self::table::*;
pub use args::{InvalidRecordPolicy, ReplayConfig};
pub use audit::{Action, AuditRecord, Checkpoint, EventId, UnseenIds};
pub use backlog::{BacklogReader, BacklogSummary};
pub use encode::{encode_literal, quote_identifier, quote_literal};
pub use error::{Error, Result};
pub use notification::{ChannelMessage, NotificationPayload};
pub use orchestrator::ReplayOrchestrator;
pub use replayer::{Outcome, Phase, Replayer};
pub use sink::{Sink, WriteSink};
pub use statement::StatementBuilder;
pub use subscription::{AuditSource, Subscription};
pub use tail::{LiveTailer, TailSummary};
pub use value::{RowData, TypedValue};
