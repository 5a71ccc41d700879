/// Record types for the external conversation store.
/// These correspond to the SQLite schema defined in migrations.rs.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A one-to-one conversation between a seeker and a guide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: String,
    pub seeker_id: String,
    pub guide_id: String,
    pub last_message_id: Option<String>,
}

impl Conversation {
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.seeker_id == user_id || self.guide_id == user_id
    }
}

/// Message type tag, matches the `message_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Text,
    Image,
    Audio,
    File,
    System,
    AudioInvite,
    AudioAccept,
    AudioReject,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::File => "file",
            Self::System => "system",
            Self::AudioInvite => "audio_invite",
            Self::AudioAccept => "audio_accept",
            Self::AudioReject => "audio_reject",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            "audio" => Some(Self::Audio),
            "file" => Some(Self::File),
            "system" => Some(Self::System),
            "audio_invite" => Some(Self::AudioInvite),
            "audio_accept" => Some(Self::AudioAccept),
            "audio_reject" => Some(Self::AudioReject),
            _ => None,
        }
    }

    /// Types whose payload is an uploaded file rather than text.
    pub fn carries_file(&self) -> bool {
        matches!(self, Self::Image | Self::Audio | Self::File)
    }
}

/// Delivery status. Ordered so that status only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Read,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Read => "read",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sent" => Some(Self::Sent),
            "delivered" => Some(Self::Delivered),
            "read" => Some(Self::Read),
            _ => None,
        }
    }
}

/// A persisted chat message as broadcast in `new_message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub content: String,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
    pub file_extension: Option<String>,
    /// Call duration in seconds
    pub duration: Option<i64>,
    pub audio_call_id: Option<String>,
    pub status: MessageStatus,
    pub read_by: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by the sender; the store assigns id, status and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub conversation_id: String,
    pub sender_id: String,
    pub message_type: MessageType,
    pub content: String,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
    pub file_extension: Option<String>,
    pub duration: Option<i64>,
    pub audio_call_id: Option<String>,
}

impl NewMessage {
    /// One-line system record (call invite/reject) kept for chat history.
    pub fn call_record(
        conversation_id: &str,
        sender_id: &str,
        message_type: MessageType,
        call_id: &str,
        content: &str,
    ) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            sender_id: sender_id.to_string(),
            message_type,
            content: content.to_string(),
            file_url: None,
            file_name: None,
            file_size: None,
            file_extension: None,
            duration: None,
            audio_call_id: Some(call_id.to_string()),
        }
    }
}
