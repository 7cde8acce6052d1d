pub mod actor;
pub mod fanout;
pub mod handler;
pub mod keepalive;

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Type alias for the sender half of a WebSocket connection's channel.
/// Other parts of the system can clone this to push messages to a specific client.
pub type ConnectionSender = mpsc::UnboundedSender<axum::extract::ws::Message>;

/// Connection registry: tracks all active WebSocket connections, keyed by a
/// UUID assigned when the connection is accepted.
///
/// Constructed once at startup and shared behind an Arc; both the
/// per-connection keepalive loop and the dispense fanout mutate it, so all
/// operations go through the concurrent map. A connection is present iff it
/// is open and has not yet signaled failure. Registration and removal are
/// idempotent by key — the keepalive loop and the fanout may race to remove
/// the same dead connection.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<Uuid, ConnectionSender>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Add a connection. Replaces any existing entry with the same id.
    pub fn register(&self, id: Uuid, sender: ConnectionSender) {
        self.connections.insert(id, sender);
        tracing::debug!(conn_id = %id, connections = self.connections.len(), "Connection registered");
    }

    /// Remove a connection. No-op if the id is not present.
    pub fn unregister(&self, id: Uuid) {
        self.connections.remove(&id);
        tracing::debug!(conn_id = %id, connections = self.connections.len(), "Connection unregistered");
    }

    /// Independent copy of the current membership. A broadcast iterates the
    /// snapshot so that concurrent register/unregister calls cannot
    /// invalidate its iteration or skip/duplicate members.
    pub fn snapshot(&self) -> Vec<(Uuid, ConnectionSender)> {
        self.connections
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
