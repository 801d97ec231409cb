// subscription.rs
// Scoped LISTEN on the replication channel, released on every exit path.

use std::time::Duration;

use postgres::Client;
use postgres::fallible_iterator::FallibleIterator;
use tracing::{info, warn};

use crate::audit::{AuditRecord, EventId, select_columns};
use crate::encode::quote_identifier;
use crate::error::Result;
use crate::notification::ChannelMessage;
use crate::table::Table;

/// What the live tailer needs from the store.
pub trait AuditSource {
    /// Waits up to `wait` for the next notification; `Ok(None)` when none arrived.
    fn next_notification(&mut self, wait: Duration) -> Result<Option<ChannelMessage>>;

    /// Point lookup of a single audit record.
    fn fetch_event(&mut self, audit_table: &Table, event_id: EventId)
    -> Result<Option<AuditRecord>>;
}

/// Holds the session's LISTEN. UNLISTEN runs on `release` or, failing that, on drop.
pub struct Subscription<'a> {
    client: &'a mut Client,
    channel: String,
    active: bool,
}

impl<'a> Subscription<'a> {
    pub fn listen(client: &'a mut Client, channel: &str) -> Result<Self> {
        client.batch_execute(&format!("LISTEN {}", quote_identifier(channel)))?;
        info!(channel, "listening for audit notifications");
        Ok(Subscription {
            client,
            channel: channel.to_string(),
            active: true,
        })
    }

    /// The underlying session, for queries issued while subscribed.
    pub fn client(&mut self) -> &mut Client {
        &mut *self.client
    }

    pub fn release(mut self) -> Result<()> {
        self.unlisten()
    }

    fn unlisten(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        self.client
            .batch_execute(&format!("UNLISTEN {}", quote_identifier(&self.channel)))?;
        info!(channel = %self.channel, "released notification subscription");
        Ok(())
    }
}

impl Drop for Subscription<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.unlisten() {
            warn!(channel = %self.channel, error = %e, "failed to release notification subscription");
        }
    }
}

impl AuditSource for Subscription<'_> {
    fn next_notification(&mut self, wait: Duration) -> Result<Option<ChannelMessage>> {
        let mut notifications = self.client.notifications();
        let next = notifications.timeout_iter(wait).next()?;
        Ok(next.map(|n| ChannelMessage {
            channel: n.channel().to_string(),
            payload: n.payload().to_string(),
        }))
    }

    fn fetch_event(
        &mut self,
        audit_table: &Table,
        event_id: EventId,
    ) -> Result<Option<AuditRecord>> {
        let query = format!("{} WHERE event_id = $1::bigint", select_columns(audit_table));
        let rows = self.client.query(query.as_str(), &[&event_id.0])?;
        rows.first().map(AuditRecord::from_row).transpose()
    }
}
