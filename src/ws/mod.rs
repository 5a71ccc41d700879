pub mod actor;
pub mod broadcast;
pub mod handler;
pub mod protocol;

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Type alias for the sender half of a WebSocket connection's channel.
/// Other parts of the system can clone this to push messages to a specific client.
pub type ConnectionSender = mpsc::UnboundedSender<axum::extract::ws::Message>;

/// Identifies one transport session, so a stale connection can tell whether it
/// still owns its user's registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered connection: its id plus the channel feeding its writer task.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub sender: ConnectionSender,
}

impl Connection {
    pub fn new(sender: ConnectionSender) -> Self {
        Self {
            id: ConnectionId::new(),
            sender,
        }
    }
}

/// Connection registry: maps each user to its single live connection.
///
/// Last writer wins: registering a second connection for a user replaces the
/// first. The user id doubles as the private notification channel for direct
/// pushes outside any room.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<DashMap<String, Connection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `connection` for `user_id`, returning the connection it superseded.
    pub fn register(&self, user_id: &str, connection: Connection) -> Option<Connection> {
        let previous = self.connections.insert(user_id.to_string(), connection);
        tracing::debug!(
            user_id = %user_id,
            superseded = previous.is_some(),
            "Connection registered"
        );
        previous
    }

    /// Remove the entry for `user_id` if it still belongs to `connection_id`.
    ///
    /// Returns true when the entry was removed. A superseded connection gets
    /// false and must leave cleanup to the connection that replaced it.
    pub fn unregister(&self, user_id: &str, connection_id: ConnectionId) -> bool {
        let removed = self
            .connections
            .remove_if(user_id, |_, conn| conn.id == connection_id)
            .is_some();
        tracing::debug!(user_id = %user_id, removed, "Connection unregistered");
        removed
    }

    pub fn lookup(&self, user_id: &str) -> Option<ConnectionSender> {
        self.connections
            .get(user_id)
            .map(|entry| entry.value().sender.clone())
    }

    pub fn is_connected(&self, user_id: &str) -> bool {
        self.connections.contains_key(user_id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> (Connection, mpsc::UnboundedReceiver<axum::extract::ws::Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Connection::new(tx), rx)
    }

    #[test]
    fn test_later_registration_supersedes_earlier() {
        let registry = ConnectionRegistry::new();
        let (a, _rx_a) = connection();
        let (b, mut rx_b) = connection();
        let a_id = a.id;

        assert!(registry.register("alice", a).is_none());
        let previous = registry.register("alice", b).expect("a superseded");
        assert_eq!(previous.id, a_id);
        assert_eq!(registry.len(), 1);

        let sender = registry.lookup("alice").expect("alice registered");
        sender
            .send(axum::extract::ws::Message::Text("ping".into()))
            .unwrap();
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn test_stale_unregister_keeps_newer_connection() {
        let registry = ConnectionRegistry::new();
        let (a, _rx_a) = connection();
        let (b, _rx_b) = connection();
        let (a_id, b_id) = (a.id, b.id);

        registry.register("alice", a);
        registry.register("alice", b);

        assert!(!registry.unregister("alice", a_id));
        assert!(registry.is_connected("alice"));
        assert!(registry.unregister("alice", b_id));
        assert!(!registry.is_connected("alice"));
        // Idempotent
        assert!(!registry.unregister("alice", b_id));
    }
}
