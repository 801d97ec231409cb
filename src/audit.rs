// audit.rs
// Audit records as read from the trigger-populated audit table.

use std::collections::BTreeMap;
use std::fmt;

use tracing::warn;

use crate::error::Result;
use crate::table::Table;
use crate::value::RowData;

/// Ordering key of the audit table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EventId(pub i64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for EventId {
    fn from(val: i64) -> Self {
        EventId(val)
    }
}

/// Kind of change recorded by the audit trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Insert,
    Update,
    Delete,
    /// Any other code (truncate, snapshot markers, ...); never replayed.
    Ignored(String),
}

impl From<&str> for Action {
    fn from(code: &str) -> Self {
        match code {
            "I" => Action::Insert,
            "U" => Action::Update,
            "D" => Action::Delete,
            other => Action::Ignored(other.to_string()),
        }
    }
}

/// One observed change.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub event_id: EventId,
    pub timestamp: String,
    pub table_name: String,
    pub action: Action,
    pub row_data: RowData,
    pub changed_fields: RowData,
}

impl AuditRecord {
    /// Builds a record from raw column text. Unparseable payloads decode as empty rows.
    pub fn from_parts(
        event_id: EventId,
        timestamp: String,
        table_name: String,
        action: &str,
        row_data: Option<&str>,
        changed_fields: Option<&str>,
    ) -> Self {
        AuditRecord {
            event_id,
            row_data: decode_payload(event_id, "row_data", row_data),
            changed_fields: decode_payload(event_id, "changed_fields", changed_fields),
            timestamp,
            table_name,
            action: Action::from(action),
        }
    }

    /// Reads a record from a row selected with [`select_columns`].
    pub fn from_row(row: &postgres::Row) -> Result<Self> {
        let event_id: i64 = row.try_get("event_id")?;
        let timestamp: Option<String> = row.try_get("action_tstamp_clk")?;
        let table_name: String = row.try_get("table_name")?;
        let action: String = row.try_get("action")?;
        let row_data: Option<String> = row.try_get("row_data")?;
        let changed_fields: Option<String> = row.try_get("changed_fields")?;
        Ok(AuditRecord::from_parts(
            EventId(event_id),
            timestamp.unwrap_or_default(),
            table_name,
            &action,
            row_data.as_deref(),
            changed_fields.as_deref(),
        ))
    }
}

fn decode_payload(event_id: EventId, column: &str, text: Option<&str>) -> RowData {
    RowData::parse(text).unwrap_or_else(|e| {
        warn!(%event_id, column, error = %e, "malformed payload, using empty row");
        RowData::default()
    })
}

/// Select list shared by the backlog and live queries. Casts keep json, jsonb and text
/// payload columns decoding identically.
pub fn select_columns(audit_table: &Table) -> String {
    format!(
        "SELECT event_id::bigint AS event_id, \
                action_tstamp_clk::text AS action_tstamp_clk, \
                table_name::text AS table_name, \
                action::text AS action, \
                row_data::text AS row_data, \
                changed_fields::text AS changed_fields \
         FROM {audit_table}"
    )
}

/// Highest event id replayed so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Checkpoint(EventId);

impl Checkpoint {
    pub fn new(start: EventId) -> Self {
        Checkpoint(start)
    }

    pub fn last(&self) -> EventId {
        self.0
    }

    /// True if `event_id` lies at or below the checkpoint.
    pub fn covers(&self, event_id: EventId) -> bool {
        event_id <= self.0
    }

    pub fn advance(&mut self, event_id: EventId) {
        if event_id > self.0 {
            self.0 = event_id;
        }
    }
}

/// Ids skipped over while the checkpoint moved forward. A `BIGSERIAL` id is assigned at
/// insert but only becomes visible at commit, so an id below the checkpoint can still
/// show up later. Kept as inclusive ranges keyed by their first id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnseenIds(BTreeMap<i64, i64>);

impl UnseenIds {
    /// Records every id strictly between `last` and `next` as unseen.
    pub fn skip_between(&mut self, last: EventId, next: EventId) {
        let (Some(first), Some(end)) = (last.0.checked_add(1), next.0.checked_sub(1)) else {
            return;
        };
        if first <= end {
            self.0.insert(first, end);
        }
    }

    /// Removes `event_id` from the unseen set, returning whether it was there.
    pub fn take(&mut self, event_id: EventId) -> bool {
        let id = event_id.0;
        let Some((&first, &end)) = self.0.range(..=id).next_back() else {
            return false;
        };
        if id > end {
            return false;
        }
        self.0.remove(&first);
        if first < id {
            self.0.insert(first, id - 1);
        }
        if id < end {
            self.0.insert(id + 1, end);
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
