// src/table.rs
// Audit table identifier, validated before it is interpolated into queries.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Table {
    pub schema: Option<String>,
    pub name: String,
}

impl FromStr for Table {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let table = if let Some((schema, name)) = s.split_once('.') {
            Table {
                schema: Some(schema.to_string()),
                name: name.to_string(),
            }
        } else {
            Table {
                schema: None,
                name: s.to_string(),
            }
        };
        let parts = table.schema.iter().chain(std::iter::once(&table.name));
        for part in parts {
            if !is_plain_identifier(part) {
                return Err(Error::InvalidIdentifier(s.to_string()));
            }
        }
        Ok(table)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl Table {
    /// Whether a table reference from a notification payload names this table.
    /// An unqualified reference on either side matches on the bare name.
    pub fn matches(&self, reference: &str) -> bool {
        match reference.parse::<Table>() {
            Ok(other) => {
                let same_schema = match (&self.schema, &other.schema) {
                    (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                    _ => true,
                };
                same_schema && self.name.eq_ignore_ascii_case(&other.name)
            }
            Err(_) => false,
        }
    }
}

fn is_plain_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}
