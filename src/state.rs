use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::auth::handshake::HandshakeVerifier;
use crate::chat::ordering::SendOrder;
use crate::chat::rooms::RoomTracker;
use crate::config::Keepalive;
use crate::db::store::ConversationStore;
use crate::ws::ConnectionRegistry;

/// Shared application state passed to all handlers via axum State extractor.
///
/// Built once at process start; tests build their own isolated instance.
#[derive(Clone)]
pub struct AppState {
    /// Live connection per user
    pub connections: ConnectionRegistry,
    /// Users currently present in each conversation
    pub rooms: RoomTracker,
    /// Per-conversation send serialization
    pub send_order: SendOrder,
    /// External conversation/message store
    pub store: Arc<dyn ConversationStore>,
    /// Turns the upgrade query into a user identity
    pub verifier: Arc<dyn HandshakeVerifier>,
    /// Bound on the conversation lookup gating joins and sends
    pub lookup_timeout: Duration,
    /// Ping/pong settings for connection actors
    pub keepalive: Keepalive,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(store: Arc<dyn ConversationStore>, verifier: Arc<dyn HandshakeVerifier>) -> Self {
        Self {
            connections: ConnectionRegistry::new(),
            rooms: RoomTracker::new(),
            send_order: SendOrder::new(),
            store,
            verifier,
            lookup_timeout: Duration::from_secs(8),
            keepalive: Keepalive::default(),
            started_at: Instant::now(),
        }
    }

    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub fn with_keepalive(mut self, keepalive: Keepalive) -> Self {
        self.keepalive = keepalive;
        self
    }
}
