// value.rs
// Typed representation of the values carried in an audit payload.

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Value;

use crate::error::{Error, Result};

/// A decoded payload value. Every JSON shape maps onto exactly one variant.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Null,
    /// Wide enough to hold both the i64 and u64 ranges JSON numbers decode into.
    Integer(i128),
    Float(f64),
    Boolean(bool),
    String(String),
    Array(Vec<TypedValue>),
    /// Nested object, keys kept in payload order.
    Structure(Vec<(String, TypedValue)>),
}

impl TypedValue {
    /// Canonical JSON text for this value.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl TryFrom<Value> for TypedValue {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        Ok(match value {
            Value::Null => TypedValue::Null,
            Value::Bool(b) => TypedValue::Boolean(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    TypedValue::Integer(i.into())
                } else if let Some(u) = n.as_u64() {
                    TypedValue::Integer(u.into())
                } else if let Some(f) = n.as_f64() {
                    TypedValue::Float(f)
                } else {
                    return Err(Error::UnsupportedValue(format!("number {n}")));
                }
            }
            Value::String(s) => TypedValue::String(s),
            Value::Array(items) => TypedValue::Array(
                items
                    .into_iter()
                    .map(TypedValue::try_from)
                    .collect::<Result<_>>()?,
            ),
            Value::Object(map) => TypedValue::Structure(
                map.into_iter()
                    .map(|(k, v)| TypedValue::try_from(v).map(|v| (k, v)))
                    .collect::<Result<_>>()?,
            ),
        })
    }
}

impl Serialize for TypedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            TypedValue::Null => serializer.serialize_unit(),
            TypedValue::Integer(n) => serializer.serialize_i128(*n),
            TypedValue::Float(f) => serializer.serialize_f64(*f),
            TypedValue::Boolean(b) => serializer.serialize_bool(*b),
            TypedValue::String(s) => serializer.serialize_str(s),
            TypedValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            TypedValue::Structure(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, value) in fields {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

/// Ordered column -> value mapping decoded from `row_data` / `changed_fields`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowData(Vec<(String, TypedValue)>);

impl RowData {
    /// Decodes a serialized payload. Absent or empty text yields an empty row.
    /// Anything that is not a JSON object is an error for the caller to recover from.
    pub fn parse(text: Option<&str>) -> Result<Self> {
        let text = match text.map(str::trim) {
            None | Some("") => return Ok(RowData::default()),
            Some(text) => text,
        };
        match serde_json::from_str::<Value>(text)? {
            Value::Object(map) => Ok(RowData(
                map.into_iter()
                    .map(|(k, v)| TypedValue::try_from(v).map(|v| (k, v)))
                    .collect::<Result<_>>()?,
            )),
            Value::Null => Ok(RowData::default()),
            other => Err(Error::UnsupportedValue(format!(
                "payload is not an object: {other}"
            ))),
        }
    }

    pub fn get(&self, column: &str) -> Option<&TypedValue> {
        self.0.iter().find(|(k, _)| k == column).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypedValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
