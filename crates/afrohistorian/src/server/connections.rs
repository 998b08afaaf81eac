//! Registry of live WebSocket connections keyed by user id

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::types::ServerEvent;

/// Identifier of one accepted socket
pub type ConnectionId = Uuid;

/// Handle for pushing events to one socket's writer task
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

impl Connection {
    /// Create a handle and the receiving end the writer task drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                id: Uuid::new_v4(),
                tx,
            },
            rx,
        )
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue an event; false when the socket is gone
    pub fn send(&self, event: ServerEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Admin view of the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionsSnapshot {
    pub active_connections: usize,
    pub user_connections: Vec<String>,
}

#[derive(Default)]
struct Registry {
    active: HashSet<ConnectionId>,
    users: HashMap<String, Connection>,
}

/// Tracks which socket serves each user; the latest registration for a user wins
#[derive(Default)]
pub struct ConnectionManager {
    registry: RwLock<Registry>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `connection` for `user_id`, replacing any earlier registration
    pub fn connect(&self, connection: Connection, user_id: &str) {
        let mut registry = self.registry.write();
        registry.active.insert(connection.id);
        if let Some(previous) = registry.users.insert(user_id.to_string(), connection) {
            tracing::debug!("User {} re-registered, replacing connection {}", user_id, previous.id);
        }
        tracing::info!("User {} connected ({} active)", user_id, registry.active.len());
    }

    /// Forget a closed connection.
    ///
    /// The user mapping is only removed while it still points at this connection, so a
    /// stale socket closing cannot unregister a newer one.
    pub fn disconnect(&self, connection_id: ConnectionId, user_id: &str) {
        let mut registry = self.registry.write();
        registry.active.remove(&connection_id);
        if registry
            .users
            .get(user_id)
            .is_some_and(|c| c.id == connection_id)
        {
            registry.users.remove(user_id);
        }
        tracing::info!("User {} disconnected ({} active)", user_id, registry.active.len());
    }

    /// Deliver an event to the user's registered connection; no-op when there is none
    pub fn send_personal_message(&self, event: ServerEvent, user_id: &str) {
        let connection = self.registry.read().users.get(user_id).cloned();
        match connection {
            Some(connection) => {
                if !connection.send(event) {
                    tracing::debug!("Connection for user {} already closed", user_id);
                }
            }
            None => tracing::debug!("No connection registered for user {}", user_id),
        }
    }

    pub fn snapshot(&self) -> ConnectionsSnapshot {
        let registry = self.registry.read();
        let mut user_connections: Vec<String> = registry.users.keys().cloned().collect();
        user_connections.sort();

        ConnectionsSnapshot {
            active_connections: registry.active.len(),
            user_connections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(text: &str) -> ServerEvent {
        ServerEvent::stream_chunk(text, "c-1")
    }

    #[test]
    fn test_last_registration_wins() {
        let manager = ConnectionManager::new();
        let (first, mut first_rx) = Connection::channel();
        let (second, mut second_rx) = Connection::channel();

        manager.connect(first, "u1");
        manager.connect(second, "u1");
        manager.send_personal_message(event("hello"), "u1");

        assert_eq!(second_rx.try_recv().unwrap(), event("hello"));
        assert!(first_rx.try_recv().is_err());
    }

    #[test]
    fn test_send_after_disconnect_is_noop() {
        let manager = ConnectionManager::new();
        let (conn, mut rx) = Connection::channel();
        let id = conn.id();

        manager.connect(conn, "u1");
        manager.disconnect(id, "u1");
        manager.send_personal_message(event("late"), "u1");

        assert!(rx.try_recv().is_err());
        assert_eq!(
            manager.snapshot(),
            ConnectionsSnapshot {
                active_connections: 0,
                user_connections: vec![],
            }
        );
    }

    #[test]
    fn test_stale_disconnect_keeps_newer_registration() {
        let manager = ConnectionManager::new();
        let (first, _first_rx) = Connection::channel();
        let (second, mut second_rx) = Connection::channel();
        let first_id = first.id();

        manager.connect(first, "u1");
        manager.connect(second, "u1");
        manager.disconnect(first_id, "u1");
        manager.send_personal_message(event("still here"), "u1");

        assert_eq!(second_rx.try_recv().unwrap(), event("still here"));
        assert_eq!(manager.snapshot().active_connections, 1);
    }

    #[test]
    fn test_unknown_user_is_noop() {
        let manager = ConnectionManager::new();
        manager.send_personal_message(event("nobody"), "ghost");
        assert_eq!(manager.snapshot().user_connections.len(), 0);
    }

    #[test]
    fn test_snapshot_counts_all_active_sockets() {
        let manager = ConnectionManager::new();
        let (a, _a_rx) = Connection::channel();
        let (b, _b_rx) = Connection::channel();
        let (c, _c_rx) = Connection::channel();

        manager.connect(a, "ama");
        manager.connect(b, "kofi");
        manager.connect(c, "kofi");

        let snapshot = manager.snapshot();
        assert_eq!(snapshot.active_connections, 3);
        assert_eq!(snapshot.user_connections, vec!["ama", "kofi"]);
    }
}
