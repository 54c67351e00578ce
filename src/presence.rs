//! Presence registry: which identity is reachable over which connection.
//!
//! Each identity maps to at most one live connection. Registering a second
//! connection for the same identity replaces the first and hands the old
//! handle back so the caller can shut it down.

use std::{fmt, sync::Arc};

use dashmap::DashMap;
use time::OffsetDateTime;
use tokio::sync::{Notify, mpsc};
use uuid::Uuid;

use crate::chat::frame::ServerFrame;

/// Cloneable reference to one open connection.
///
/// Two handles are equal only if they refer to the same connection.
#[derive(Clone)]
pub struct ConnectionHandle {
    id: Uuid,
    outbound: mpsc::Sender<ServerFrame>,
    shutdown: Arc<Notify>,
}

impl ConnectionHandle {
    /// Creates a handle and the receiving end its writer task drains.
    pub fn new(capacity: usize) -> (ConnectionHandle, mpsc::Receiver<ServerFrame>) {
        let (outbound, rx) = mpsc::channel(capacity);
        let handle = ConnectionHandle {
            id: Uuid::now_v7(),
            outbound,
            shutdown: Arc::new(Notify::new()),
        };
        (handle, rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }

    /// Queues a frame without waiting. Fails if the connection is gone or
    /// its buffer is full.
    pub fn try_send(&self, frame: ServerFrame) -> Result<(), ServerFrame> {
        self.outbound.try_send(frame).map_err(|err| err.into_inner())
    }

    /// Asks the owning session to end. The signal is kept until observed.
    pub fn close(&self) {
        self.shutdown.notify_one();
    }

    pub async fn closed(&self) {
        self.shutdown.notified().await;
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConnectionHandle {}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("open", &self.is_open())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct LiveSession {
    pub identity: String,
    pub connection: ConnectionHandle,
    pub established_at: OffsetDateTime,
}

#[derive(Clone, Default)]
pub struct PresenceRegistry {
    sessions: Arc<DashMap<String, LiveSession>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `connection` for `identity`, returning the connection it
    /// replaced, if any.
    pub fn register(&self, identity: &str, connection: ConnectionHandle) -> Option<ConnectionHandle> {
        let session = LiveSession {
            identity: identity.to_owned(),
            connection,
            established_at: OffsetDateTime::now_utc(),
        };
        let superseded = self
            .sessions
            .insert(identity.to_owned(), session)
            .map(|old| old.connection);

        tracing::debug!(
            identity,
            superseded = superseded.as_ref().map(|c| c.id().to_string()),
            "session registered"
        );
        superseded
    }

    /// Removes the session for `identity` only while it still belongs to
    /// `connection`. Returns whether anything was removed.
    pub fn deregister(&self, identity: &str, connection: &ConnectionHandle) -> bool {
        let removed = self
            .sessions
            .remove_if(identity, |_, session| session.connection == *connection)
            .is_some();

        tracing::debug!(identity, connection = %connection.id(), removed, "session deregistered");
        removed
    }

    pub fn lookup(&self, identity: &str) -> Option<ConnectionHandle> {
        self.sessions.get(identity).map(|session| session.connection.clone())
    }

    #[cfg(test)]
    fn session(&self, identity: &str) -> Option<LiveSession> {
        self.sessions.get(identity).map(|session| session.clone())
    }

    /// Whether `connection` is registered under any identity.
    pub fn holds(&self, connection: &ConnectionHandle) -> bool {
        self.sessions.iter().any(|session| session.connection == *connection)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
