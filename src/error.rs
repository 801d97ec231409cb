use thiserror::Error;

use crate::audit::EventId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Postgres error: {0}")]
    Postgres(#[from] postgres::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("event {event_id} on {table}: row_data has no value for key column {column:?}")]
    MissingKey {
        table: String,
        event_id: EventId,
        column: String,
    },

    #[error("event {event_id} on {table}: row_data has no columns to insert")]
    EmptyRow { table: String, event_id: EventId },

    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Unsupported value: {0}")]
    UnsupportedValue(String),

    #[error("Invalid notification payload {payload:?}: {reason}")]
    InvalidNotification { payload: String, reason: String },

    #[error("replay halted after event {last_event_id}; restart with --start-event-id {last_event_id}")]
    Halted {
        last_event_id: EventId,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// True for errors confined to a single record, which the skip policy may pass over.
    pub fn is_record_error(&self) -> bool {
        matches!(self, Error::MissingKey { .. } | Error::EmptyRow { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
