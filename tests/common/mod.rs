//! Shared helpers for dispatcher-level tests: in-process clients backed by
//! plain channels instead of sockets.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::ws::Message as WsMessage;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use parley_server::auth::handshake::TrustedHandshake;
use parley_server::db::init_memory_db;
use parley_server::db::models::{Conversation, Message, NewMessage};
use parley_server::db::store::{ConversationStore, SqliteStore};
use parley_server::error::StoreError;
use parley_server::state::AppState;
use parley_server::ws::actor;
use parley_server::ws::protocol::{self, ClientEvent, ServerEvent};
use parley_server::ws::{ConnectionId, ConnectionSender};

pub fn sqlite_store() -> SqliteStore {
    SqliteStore::new(init_memory_db().expect("in-memory db"))
}

pub fn state_with(store: Arc<dyn ConversationStore>) -> AppState {
    AppState::new(store, Arc::new(TrustedHandshake))
}

/// A connected user driven directly through the dispatcher.
pub struct TestClient {
    pub user_id: String,
    pub connection_id: ConnectionId,
    tx: ConnectionSender,
    rx: mpsc::UnboundedReceiver<WsMessage>,
}

impl TestClient {
    pub fn connect(state: &AppState, user_id: &str) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection_id = actor::open_session(state, user_id, tx.clone());
        Self {
            user_id: user_id.to_string(),
            connection_id,
            tx,
            rx,
        }
    }

    pub async fn send(&self, state: &AppState, event: ClientEvent) {
        protocol::dispatch_event(event, &self.tx, state, &self.user_id).await;
    }

    pub async fn send_raw(&self, state: &AppState, text: &str) {
        protocol::handle_text_message(text, &self.tx, state, &self.user_id).await;
    }

    pub fn disconnect(&self, state: &AppState) -> Vec<String> {
        actor::close_session(state, &self.user_id, self.connection_id)
    }

    /// Everything queued for this client so far, decoded.
    pub fn events(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            if let WsMessage::Text(text) = msg {
                events.push(serde_json::from_str(text.as_str()).expect("valid server event"));
            }
        }
        events
    }

    /// Raw frames queued so far (including close frames).
    pub fn frames(&mut self) -> Vec<WsMessage> {
        let mut frames = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            frames.push(msg);
        }
        frames
    }
}

pub fn join(conversation_id: &str) -> ClientEvent {
    serde_json::from_value(serde_json::json!({
        "event": "join_conversation",
        "data": { "conversationId": conversation_id }
    }))
    .unwrap()
}

pub fn leave(conversation_id: &str) -> ClientEvent {
    serde_json::from_value(serde_json::json!({
        "event": "leave_conversation",
        "data": { "conversationId": conversation_id }
    }))
    .unwrap()
}

pub fn text(conversation_id: &str, content: &str) -> ClientEvent {
    serde_json::from_value(serde_json::json!({
        "event": "send_message",
        "data": { "conversationId": conversation_id, "content": content, "type": "text" }
    }))
    .unwrap()
}

pub fn mark_read(conversation_id: &str, message_ids: &[&str]) -> ClientEvent {
    serde_json::from_value(serde_json::json!({
        "event": "mark_messages_read",
        "data": { "conversationId": conversation_id, "messageIds": message_ids }
    }))
    .unwrap()
}

pub fn typing(conversation_id: &str, is_typing: bool) -> ClientEvent {
    serde_json::from_value(serde_json::json!({
        "event": "typing",
        "data": { "conversationId": conversation_id, "isTyping": is_typing }
    }))
    .unwrap()
}

pub fn call_event(name: &str, conversation_id: &str, call_id: &str, extra: serde_json::Value) -> ClientEvent {
    let mut data = serde_json::json!({ "conversationId": conversation_id, "callId": call_id });
    if let (Some(data), Some(extra)) = (data.as_object_mut(), extra.as_object()) {
        for (k, v) in extra {
            data.insert(k.clone(), v.clone());
        }
    }
    serde_json::from_value(serde_json::json!({ "event": name, "data": data })).unwrap()
}

pub fn error_code(event: &ServerEvent) -> Option<&str> {
    match event {
        ServerEvent::Error { code, .. } => Some(code.as_str()),
        _ => None,
    }
}

/// Store double whose writes always fail; reads go to a real store.
pub struct FailingWrites {
    pub inner: SqliteStore,
}

#[async_trait]
impl ConversationStore for FailingWrites {
    async fn conversation(&self, conversation_id: &str) -> Result<Conversation, StoreError> {
        self.inner.conversation(conversation_id).await
    }

    async fn append_message(&self, _message: NewMessage) -> Result<Message, StoreError> {
        Err(StoreError::Task("disk full".to_string()))
    }

    async fn mark_delivered(&self, _message_id: &str) -> Result<bool, StoreError> {
        Err(StoreError::Task("disk full".to_string()))
    }

    async fn mark_read(
        &self,
        _conversation_id: &str,
        _message_ids: &[String],
        _reader_id: &str,
    ) -> Result<Vec<String>, StoreError> {
        Err(StoreError::Task("disk full".to_string()))
    }

    async fn message(&self, message_id: &str) -> Result<Message, StoreError> {
        self.inner.message(message_id).await
    }
}

/// Store double whose conversation lookup hangs for `delay`.
pub struct SlowLookups {
    pub inner: SqliteStore,
    pub delay: Duration,
}

#[async_trait]
impl ConversationStore for SlowLookups {
    async fn conversation(&self, conversation_id: &str) -> Result<Conversation, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.conversation(conversation_id).await
    }

    async fn append_message(&self, message: NewMessage) -> Result<Message, StoreError> {
        self.inner.append_message(message).await
    }

    async fn mark_delivered(&self, message_id: &str) -> Result<bool, StoreError> {
        self.inner.mark_delivered(message_id).await
    }

    async fn mark_read(
        &self,
        conversation_id: &str,
        message_ids: &[String],
        reader_id: &str,
    ) -> Result<Vec<String>, StoreError> {
        self.inner.mark_read(conversation_id, message_ids, reader_id).await
    }

    async fn message(&self, message_id: &str) -> Result<Message, StoreError> {
        self.inner.message(message_id).await
    }
}

/// Store double whose `sent -> delivered` upgrade never happens: it either
/// errors or reports the message as already past `sent`.
pub struct StuckDelivery {
    pub inner: SqliteStore,
    pub fail: bool,
}

#[async_trait]
impl ConversationStore for StuckDelivery {
    async fn conversation(&self, conversation_id: &str) -> Result<Conversation, StoreError> {
        self.inner.conversation(conversation_id).await
    }

    async fn append_message(&self, message: NewMessage) -> Result<Message, StoreError> {
        self.inner.append_message(message).await
    }

    async fn mark_delivered(&self, _message_id: &str) -> Result<bool, StoreError> {
        if self.fail {
            Err(StoreError::Task("replica unavailable".to_string()))
        } else {
            Ok(false)
        }
    }

    async fn mark_read(
        &self,
        conversation_id: &str,
        message_ids: &[String],
        reader_id: &str,
    ) -> Result<Vec<String>, StoreError> {
        self.inner.mark_read(conversation_id, message_ids, reader_id).await
    }

    async fn message(&self, message_id: &str) -> Result<Message, StoreError> {
        self.inner.message(message_id).await
    }
}

/// Store double that returns from `append_message` after the row is written,
/// with earlier calls lingering longer than later ones.
pub struct StaggeredAppends {
    pub inner: SqliteStore,
    pub calls: AtomicUsize,
    pub step: Duration,
    pub slots: u32,
}

impl StaggeredAppends {
    pub fn new(inner: SqliteStore, step: Duration, slots: u32) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            step,
            slots,
        }
    }
}

#[async_trait]
impl ConversationStore for StaggeredAppends {
    async fn conversation(&self, conversation_id: &str) -> Result<Conversation, StoreError> {
        self.inner.conversation(conversation_id).await
    }

    async fn append_message(&self, message: NewMessage) -> Result<Message, StoreError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) as u32;
        let stored = self.inner.append_message(message).await?;
        tokio::time::sleep(self.step * self.slots.saturating_sub(call)).await;
        Ok(stored)
    }

    async fn mark_delivered(&self, message_id: &str) -> Result<bool, StoreError> {
        self.inner.mark_delivered(message_id).await
    }

    async fn mark_read(
        &self,
        conversation_id: &str,
        message_ids: &[String],
        reader_id: &str,
    ) -> Result<Vec<String>, StoreError> {
        self.inner.mark_read(conversation_id, message_ids, reader_id).await
    }

    async fn message(&self, message_id: &str) -> Result<Message, StoreError> {
        self.inner.message(message_id).await
    }
}
