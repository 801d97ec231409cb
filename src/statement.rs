// statement.rs
// Turns one audit record into the DML statement that reproduces it.

use itertools::Itertools;

use crate::audit::{Action, AuditRecord};
use crate::encode::{encode_literal, quote_identifier};
use crate::error::{Error, Result};
use crate::value::TypedValue;

/// Builds INSERT/UPDATE/DELETE text. Performs no I/O.
#[derive(Debug, Clone)]
pub struct StatementBuilder {
    key_columns: Vec<String>,
}

impl Default for StatementBuilder {
    fn default() -> Self {
        StatementBuilder {
            key_columns: vec!["id".to_string()],
        }
    }
}

impl StatementBuilder {
    /// Update/delete predicates match on every column in `key_columns`.
    pub fn new(key_columns: Vec<String>) -> Self {
        if key_columns.is_empty() {
            return StatementBuilder::default();
        }
        StatementBuilder { key_columns }
    }

    /// Returns `None` for actions that are not replayed.
    pub fn build(&self, record: &AuditRecord) -> Result<Option<String>> {
        let table = quote_identifier(&record.table_name);
        let statement = match &record.action {
            Action::Insert => {
                if record.row_data.is_empty() {
                    return Err(Error::EmptyRow {
                        table: record.table_name.clone(),
                        event_id: record.event_id,
                    });
                }
                let columns = record
                    .row_data
                    .iter()
                    .map(|(column, _)| quote_identifier(column))
                    .join(", ");
                let values = record
                    .row_data
                    .iter()
                    .map(|(_, value)| encode_literal(value))
                    .collect::<Result<Vec<_>>>()?
                    .join(", ");
                format!("INSERT INTO {table} ({columns}) VALUES ({values});")
            }
            Action::Update => {
                let predicate = self.key_predicate(record)?;
                let assignments = record
                    .row_data
                    .iter()
                    .map(|(column, value)| {
                        encode_literal(value)
                            .map(|literal| format!("{} = {}", quote_identifier(column), literal))
                    })
                    .collect::<Result<Vec<_>>>()?
                    .join(", ");
                format!("UPDATE {table} SET {assignments} WHERE {predicate};")
            }
            Action::Delete => {
                let predicate = self.key_predicate(record)?;
                format!("DELETE FROM {table} WHERE {predicate};")
            }
            Action::Ignored(_) => return Ok(None),
        };
        Ok(Some(statement))
    }

    fn key_predicate(&self, record: &AuditRecord) -> Result<String> {
        self.key_columns
            .iter()
            .map(|column| match record.row_data.get(column) {
                None | Some(TypedValue::Null) => Err(Error::MissingKey {
                    table: record.table_name.clone(),
                    event_id: record.event_id,
                    column: column.clone(),
                }),
                Some(value) => encode_literal(value)
                    .map(|literal| format!("{} = {}", quote_identifier(column), literal)),
            })
            .collect::<Result<Vec<_>>>()
            .map(|parts| parts.join(" AND "))
    }
}
