use sqlx::SqlitePool;

use crate::{
    chat::{frame::ServerFrame, history},
    db::Message,
    error::{self, Error},
    presence::{ConnectionHandle, PresenceRegistry},
};

/// Outcome of the live half of a relay. Either way the message is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// Recipient offline, or its connection closed or backed up.
    Missed,
}

/// Persists inbound messages and forwards them to live recipients.
#[derive(Clone)]
pub struct Relay {
    db_pool: SqlitePool,
    registry: PresenceRegistry,
}

impl Relay {
    pub fn new(db_pool: SqlitePool, registry: PresenceRegistry) -> Self {
        Self { db_pool, registry }
    }

    pub fn registry(&self) -> &PresenceRegistry {
        &self.registry
    }

    #[cfg(test)]
    pub(crate) fn db_pool(&self) -> &SqlitePool {
        &self.db_pool
    }

    /// Stores `text` from `sender` to `to`, then makes one non-blocking
    /// attempt to push it to `to`'s live connection.
    pub async fn relay(&self, sender: &str, to: &str, text: &str) -> error::Result<(Message, Delivery)> {
        error::require("to", to)?;
        error::require("text", text)?;
        if sender.is_empty() {
            return Err(Error::validation("sender is not authenticated"));
        }

        let message = history::append(&self.db_pool, sender, to, text).await?;

        let delivery = match self.registry.lookup(to).filter(ConnectionHandle::is_open) {
            Some(connection) => {
                let frame = ServerFrame::Message {
                    from: message.sender.clone(),
                    text: message.text.clone(),
                };
                match connection.try_send(frame) {
                    Ok(()) => Delivery::Delivered,
                    Err(_) => {
                        tracing::debug!(from = sender, to, connection = %connection.id(), "forward failed, left in history");
                        Delivery::Missed
                    }
                }
            }
            None => {
                tracing::debug!(from = sender, to, "recipient offline or closed, left in history");
                Delivery::Missed
            }
        };

        Ok((message, delivery))
    }
}
