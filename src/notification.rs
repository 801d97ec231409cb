// notification.rs
// Payload sent by the audit trigger on the replication channel.

use serde::Deserialize;

use crate::audit::EventId;
use crate::error::{Error, Result};

/// Default channel the audit trigger notifies on.
pub const DEFAULT_CHANNEL: &str = "audit_replication";

/// A notification as delivered by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    pub channel: String,
    pub payload: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPayload {
    pub audit_table: String,
    pub event_id: EventId,
}

#[derive(Deserialize)]
struct RawPayload {
    audit_table: String,
    event_id: RawEventId,
}

/// Triggers send the id either as a JSON number or as text.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawEventId {
    Number(i64),
    Text(String),
}

impl NotificationPayload {
    pub fn parse(payload: &str) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidNotification {
            payload: payload.to_string(),
            reason,
        };
        let raw: RawPayload = serde_json::from_str(payload).map_err(|e| invalid(e.to_string()))?;
        let event_id = match raw.event_id {
            RawEventId::Number(n) => n,
            RawEventId::Text(text) => text
                .trim()
                .parse::<i64>()
                .map_err(|e| invalid(format!("event_id {text:?}: {e}")))?,
        };
        Ok(NotificationPayload {
            audit_table: raw.audit_table,
            event_id: EventId(event_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numeric_event_id() {
        let payload =
            NotificationPayload::parse(r#"{"audit_table":"audit.logged_actions","event_id":42}"#)
                .unwrap();
        assert_eq!(payload.audit_table, "audit.logged_actions");
        assert_eq!(payload.event_id, EventId(42));
    }

    #[test]
    fn test_parse_text_event_id() {
        let payload =
            NotificationPayload::parse(r#"{"audit_table":"logged_actions","event_id":"1337"}"#)
                .unwrap();
        assert_eq!(payload.event_id, EventId(1337));
    }

    #[test]
    fn test_parse_rejects_bad_payloads() {
        for bad in [
            "",
            "not json",
            r#"{"audit_table":"t"}"#,
            r#"{"event_id":1}"#,
            r#"{"audit_table":"t","event_id":"abc"}"#,
            r#"{"audit_table":"t","event_id":1.5}"#,
        ] {
            let err = NotificationPayload::parse(bad).unwrap_err();
            assert!(matches!(err, Error::InvalidNotification { .. }), "{bad:?}");
        }
    }
}
