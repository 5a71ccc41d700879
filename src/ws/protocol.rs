//! JSON event protocol and per-event dispatch.
//!
//! Frames are `{"event": "<name>", "data": {...}}`. Each inbound event is
//! handled to completion before the next one from the same connection, and any
//! failure is reported to that connection alone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chat::{messages, presence};
use crate::db::models::{Message, MessageType};
use crate::error::ChatError;
use crate::state::AppState;
use crate::voice::signaling;
use crate::ws::broadcast::send_event;
use crate::ws::ConnectionSender;

// --- Inbound ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRef {
    pub conversation_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub conversation_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
    pub file_extension: Option<String>,
    pub duration: Option<i64>,
    pub audio_call_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub conversation_id: String,
    pub message_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingRequest {
    pub conversation_id: String,
    pub is_typing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallOffer {
    pub conversation_id: String,
    pub call_id: String,
    pub offer: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallAnswer {
    pub conversation_id: String,
    pub call_id: String,
    pub answer: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRef {
    pub conversation_id: String,
    pub call_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidateRequest {
    pub conversation_id: String,
    pub call_id: String,
    pub ice_candidate: Value,
}

/// Client → server events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinConversation(ConversationRef),
    LeaveConversation(ConversationRef),
    SendMessage(SendMessageRequest),
    MarkMessagesRead(MarkReadRequest),
    Typing(TypingRequest),
    AudioCallInitiate(CallOffer),
    AudioCallAnswer(CallAnswer),
    AudioCallReject(CallRef),
    AudioCallEnd(CallRef),
    IceCandidate(IceCandidateRequest),
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinConversation(_) => "join_conversation",
            Self::LeaveConversation(_) => "leave_conversation",
            Self::SendMessage(_) => "send_message",
            Self::MarkMessagesRead(_) => "mark_messages_read",
            Self::Typing(_) => "typing",
            Self::AudioCallInitiate(_) => "audio_call_initiate",
            Self::AudioCallAnswer(_) => "audio_call_answer",
            Self::AudioCallReject(_) => "audio_call_reject",
            Self::AudioCallEnd(_) => "audio_call_end",
            Self::IceCandidate(_) => "ice_candidate",
        }
    }

    pub fn conversation_id(&self) -> &str {
        match self {
            Self::JoinConversation(r) | Self::LeaveConversation(r) => &r.conversation_id,
            Self::SendMessage(r) => &r.conversation_id,
            Self::MarkMessagesRead(r) => &r.conversation_id,
            Self::Typing(r) => &r.conversation_id,
            Self::AudioCallInitiate(r) => &r.conversation_id,
            Self::AudioCallAnswer(r) => &r.conversation_id,
            Self::AudioCallReject(r) | Self::AudioCallEnd(r) => &r.conversation_id,
            Self::IceCandidate(r) => &r.conversation_id,
        }
    }
}

// --- Outbound ---

/// Server → client events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    ConversationJoined {
        conversation_id: String,
    },
    OnlineUsers {
        conversation_id: String,
        members: Vec<String>,
    },
    UserJoined {
        conversation_id: String,
        user_id: String,
        timestamp: DateTime<Utc>,
    },
    UserLeft {
        conversation_id: String,
        user_id: String,
        timestamp: DateTime<Utc>,
    },
    NewMessage(Message),
    MessageDelivered {
        message_id: String,
        conversation_id: String,
    },
    MessagesRead {
        user_id: String,
        conversation_id: String,
        message_ids: Vec<String>,
    },
    UserTyping {
        user_id: String,
        conversation_id: String,
        is_typing: bool,
    },
    AudioCallIncoming {
        conversation_id: String,
        call_id: String,
        caller_id: String,
        offer: Value,
    },
    AudioCallAnswered {
        conversation_id: String,
        call_id: String,
        user_id: String,
        answer: Value,
    },
    AudioCallRejected {
        conversation_id: String,
        call_id: String,
        user_id: String,
    },
    AudioCallEnded {
        conversation_id: String,
        call_id: String,
        user_id: String,
    },
    IceCandidate {
        conversation_id: String,
        call_id: String,
        user_id: String,
        ice_candidate: Value,
    },
    Error {
        code: String,
        message: String,
        retryable: bool,
    },
}

impl ServerEvent {
    pub fn error(err: &ChatError) -> Self {
        Self::Error {
            code: err.code().to_string(),
            message: err.client_message(),
            retryable: err.retryable(),
        }
    }
}

// --- Dispatch ---

/// Handle an incoming text frame: decode the event and dispatch it.
pub async fn handle_text_message(
    text: &str,
    tx: &ConnectionSender,
    state: &AppState,
    user_id: &str,
) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(
                user_id = %user_id,
                error = %e,
                "Failed to decode client event"
            );
            send_error(tx, &ChatError::BadRequest(format!("Invalid event: {}", e)));
            return;
        }
    };

    dispatch_event(event, tx, state, user_id).await;
}

/// Dispatch a decoded event to its handler and report any failure to the sender.
pub async fn dispatch_event(
    event: ClientEvent,
    tx: &ConnectionSender,
    state: &AppState,
    user_id: &str,
) {
    let name = event.name();
    let conversation_id = event.conversation_id().to_string();

    let result = match event {
        ClientEvent::JoinConversation(req) => presence::handle_join(req, tx, state, user_id).await,
        ClientEvent::LeaveConversation(req) => presence::handle_leave(req, state, user_id),
        ClientEvent::Typing(req) => presence::handle_typing(req, state, user_id),
        ClientEvent::SendMessage(req) => messages::handle_send_message(req, state, user_id).await,
        ClientEvent::MarkMessagesRead(req) => messages::handle_mark_read(req, state, user_id).await,
        ClientEvent::AudioCallInitiate(req) => {
            signaling::handle_call_initiate(req, state, user_id).await
        }
        ClientEvent::AudioCallAnswer(req) => signaling::handle_call_answer(req, state, user_id),
        ClientEvent::AudioCallReject(req) => {
            signaling::handle_call_reject(req, state, user_id).await
        }
        ClientEvent::AudioCallEnd(req) => signaling::handle_call_end(req, state, user_id),
        ClientEvent::IceCandidate(req) => signaling::handle_ice_candidate(req, state, user_id),
    };

    if let Err(err) = result {
        match &err {
            ChatError::Internal(detail) => tracing::error!(
                user_id = %user_id,
                conversation_id = %conversation_id,
                event = name,
                detail = %detail,
                "Event handler failed"
            ),
            other => tracing::warn!(
                user_id = %user_id,
                conversation_id = %conversation_id,
                event = name,
                error = %other,
                "Event rejected"
            ),
        }
        send_error(tx, &err);
    }
}

/// Send an `error` event to the requesting connection only.
pub fn send_error(tx: &ConnectionSender, err: &ChatError) {
    send_event(tx, &ServerEvent::error(err));
}
