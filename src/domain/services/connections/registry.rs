//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name                | Description                                      | Key Methods          |
// |---------------------|--------------------------------------------------|----------------------|
// | Connection          | Handle to one live duplex client session         | send                 |
// | ConnectionRegistry  | Identity -> connection map, shared across tasks  | register, lookup,    |
// |                     |                                                  | reverse_lookup, send |
//--------------------------------------------------------------------------------------------------

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::models::events::OutboundEvent;
use crate::domain::models::types::ParticipantId;

/// Handle to a single live duplex client session.
///
/// The transport layer owns the socket; this handle only carries the
/// outbound half as a channel sender plus the session id used for
/// reverse lookup.
#[derive(Debug, Clone)]
pub struct Connection {
    id: Uuid,
    sender: UnboundedSender<OutboundEvent>,
}

impl Connection {
    pub fn new(id: Uuid, sender: UnboundedSender<OutboundEvent>) -> Self {
        Self { id, sender }
    }

    /// Returns the transport session id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Sends an event to the client behind this connection.
    ///
    /// # Returns
    /// `false` if the session's receive side is gone (client torn down
    /// without a disconnect event).
    pub fn send(&self, event: OutboundEvent) -> bool {
        self.sender.send(event).is_ok()
    }
}

/// Registry of live connections keyed by participant identity.
///
/// Riders and customers share one identity space; the registry carries no
/// role tag, so identity uniqueness across the two roles is the caller's
/// invariant. Accessed concurrently from socket tasks, bus consumers and
/// dispatch calls, so the map sits behind an `RwLock`.
///
/// A reconnect for the same identity replaces the prior entry wholesale;
/// a disconnect removes it.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<HashMap<ParticipantId, Connection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection for an identity, overwriting any prior
    /// mapping for that identity.
    pub fn register(&self, identity: ParticipantId, connection: Connection) {
        let mut inner = self.inner.write();
        if let Some(previous) = inner.insert(identity, connection) {
            debug!(
                "replaced connection {} for participant {}",
                previous.id(),
                identity
            );
        }
    }

    /// Removes the mapping for an identity, if present.
    ///
    /// Wired to the disconnect inbound event so the map does not grow
    /// unbounded with identity churn.
    pub fn remove(&self, identity: &ParticipantId) -> Option<Connection> {
        self.inner.write().remove(identity)
    }

    /// Removes the mapping only if it still belongs to the given session.
    ///
    /// A late disconnect from a replaced session must not evict the
    /// connection that replaced it.
    ///
    /// # Returns
    /// `true` if the mapping was removed.
    pub fn remove_session(&self, identity: &ParticipantId, connection_id: Uuid) -> bool {
        let mut inner = self.inner.write();
        match inner.get(identity) {
            Some(current) if current.id() == connection_id => {
                inner.remove(identity);
                true
            }
            _ => false,
        }
    }

    /// Returns the connection currently registered for an identity.
    pub fn lookup(&self, identity: &ParticipantId) -> Option<Connection> {
        self.inner.read().get(identity).cloned()
    }

    /// Finds the identity bound to a transport session id. Linear scan;
    /// the registry is sized by concurrently connected participants.
    pub fn reverse_lookup(&self, connection_id: Uuid) -> Option<ParticipantId> {
        self.inner
            .read()
            .iter()
            .find(|(_, conn)| conn.id() == connection_id)
            .map(|(identity, _)| *identity)
    }

    /// Sends an event to the identity's connection.
    ///
    /// A no-op when the identity has no live connection: disconnected
    /// recipients are silently dropped, never an error.
    ///
    /// # Returns
    /// `true` if the event was handed to a live connection.
    pub fn send(&self, identity: &ParticipantId, event: OutboundEvent) -> bool {
        match self.lookup(identity) {
            Some(connection) => {
                let delivered = connection.send(event);
                if !delivered {
                    warn!("connection for participant {} is dead", identity);
                }
                delivered
            }
            None => {
                debug!("no live connection for participant {}, dropping event", identity);
                false
            }
        }
    }

    /// Returns the number of live connections.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
