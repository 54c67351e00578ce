use crate::{
    chat::{Delivery, Relay, frame::ClientFrame},
    error::{self, Error},
    presence::ConnectionHandle,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated { identity: String },
    Closed,
}

/// What handling one inbound frame did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    Authenticated { identity: String },
    Relayed(Delivery),
}

/// Transport-independent lifecycle of one connection.
///
/// The socket actor feeds every inbound text frame through [`Session::handle`]
/// and calls [`Session::close`] exactly when the connection ends.
pub struct Session {
    state: SessionState,
    connection: ConnectionHandle,
    relay: Relay,
}

impl Session {
    pub fn new(connection: ConnectionHandle, relay: Relay) -> Self {
        Self {
            state: SessionState::Unauthenticated,
            connection,
            relay,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn identity(&self) -> Option<&str> {
        match &self.state {
            SessionState::Authenticated { identity } => Some(identity),
            _ => None,
        }
    }

    pub fn connection(&self) -> &ConnectionHandle {
        &self.connection
    }

    pub async fn handle(&mut self, raw: &str) -> error::Result<FrameOutcome> {
        match ClientFrame::parse(raw)? {
            ClientFrame::Auth { id } => self.authenticate(id),
            ClientFrame::Message { to, text } => {
                let Some(sender) = self.identity() else {
                    return Err(Error::validation("authenticate before sending messages"));
                };
                let (_, delivery) = self.relay.relay(sender, &to, &text).await?;
                Ok(FrameOutcome::Relayed(delivery))
            }
        }
    }

    fn authenticate(&mut self, identity: String) -> error::Result<FrameOutcome> {
        match &self.state {
            SessionState::Closed => return Err(Error::validation("session is closed")),
            SessionState::Authenticated { identity: current } if *current == identity => {
                return Ok(FrameOutcome::Authenticated { identity });
            }
            _ => {}
        }
        error::require("id", &identity)?;

        // the new entry goes in before the old one comes out, so a connection
        // moving between identities is never seen as unregistered
        let registry = self.relay.registry();
        let superseded = registry.register(&identity, self.connection.clone());
        if let SessionState::Authenticated { identity: previous } = &self.state {
            registry.deregister(previous, &self.connection);
        }
        if let Some(superseded) = superseded {
            if registry.holds(&superseded) {
                tracing::debug!(identity, superseded = %superseded.id(), "superseded connection moved to another identity");
            } else {
                tracing::info!(identity, superseded = %superseded.id(), "closing superseded connection");
                superseded.close();
            }
        }

        tracing::info!(identity, connection = %self.connection.id(), "session authenticated");
        self.state = SessionState::Authenticated { identity: identity.clone() };
        Ok(FrameOutcome::Authenticated { identity })
    }

    /// Enters `Closed`, releasing the registry entry if it is still ours.
    pub fn close(&mut self) {
        if let SessionState::Authenticated { identity } = &self.state {
            self.relay.registry().deregister(identity, &self.connection);
        }
        self.state = SessionState::Closed;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.state != SessionState::Closed {
            self.close();
        }
    }
}
