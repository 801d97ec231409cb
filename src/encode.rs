// encode.rs
// Renders typed payload values as PostgreSQL literals.

use itertools::Itertools;

use crate::error::Result;
use crate::value::TypedValue;

/// Base tag for dollar-quoted array literals.
pub const ARRAY_QUOTE_TAG: &str = "_audit_replication_";

/// Encodes a value as a literal that parses back to an equivalent value.
pub fn encode_literal(value: &TypedValue) -> Result<String> {
    Ok(match value {
        TypedValue::Null => "NULL".to_string(),
        TypedValue::Integer(n) => n.to_string(),
        TypedValue::Float(f) => encode_float(*f),
        TypedValue::Boolean(true) => "'t'".to_string(),
        TypedValue::Boolean(false) => "'f'".to_string(),
        TypedValue::Array(items) => match encode_array(items) {
            Some(literal) => literal,
            None => quote_literal(&value.to_json()?),
        },
        TypedValue::Structure(_) => quote_literal(&value.to_json()?),
        TypedValue::String(s) => quote_literal(s),
    })
}

fn encode_float(f: f64) -> String {
    if f.is_nan() {
        "'NaN'".to_string()
    } else if f.is_infinite() && f > 0.0 {
        "'Infinity'".to_string()
    } else if f.is_infinite() {
        "'-Infinity'".to_string()
    } else {
        f.to_string()
    }
}

/// Array body in `{...}` form, wrapped in a dollar-quote tag absent from the body.
/// Returns `None` unless every element is an integer or a string.
fn encode_array(items: &[TypedValue]) -> Option<String> {
    let elements = items
        .iter()
        .map(|item| match item {
            TypedValue::String(s) => Some(quote_array_element(s)),
            TypedValue::Integer(n) => Some(n.to_string()),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    let body = format!("{{{}}}", elements.iter().join(","));
    let tag = dollar_quote_tag(&body);
    Some(format!("{tag}{body}{tag}"))
}

fn quote_array_element(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Picks `$_audit_replication_$`, or a numbered variant when the body already contains it.
pub fn dollar_quote_tag(body: &str) -> String {
    let mut tag = format!("${ARRAY_QUOTE_TAG}$");
    let mut suffix = 0u32;
    while body.contains(&tag) {
        suffix += 1;
        tag = format!("${ARRAY_QUOTE_TAG}{suffix}$");
    }
    tag
}

/// Quotes a string literal the way PostgreSQL's `quote_literal` does: quotes are doubled,
/// and a string holding a backslash switches to the `E'...'` form with backslashes doubled.
pub fn quote_literal(s: &str) -> String {
    let escaped = s.replace('\'', "''");
    if s.contains('\\') {
        format!("E'{}'", escaped.replace('\\', "\\\\"))
    } else {
        format!("'{escaped}'")
    }
}

/// Quotes an identifier so reserved words and mixed case survive.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
