//! Message send and read-receipt handling.
//!
//! A send is authorized against the store on every call, persisted, and only
//! then fanned out. "Delivered" is a presence heuristic: it means another
//! member was in the room at send time, not that a client acknowledged it.

use crate::chat::access;
use crate::chat::broadcast::{broadcast_to_room, broadcast_to_room_and};
use crate::db::models::NewMessage;
use crate::error::ChatError;
use crate::state::AppState;
use crate::ws::protocol::{MarkReadRequest, SendMessageRequest, ServerEvent};

/// Maximum message content length in characters.
pub const MAX_CONTENT_CHARS: usize = 5000;

/// Check the type-specific payload before anything is stored.
pub fn validate_message(req: &SendMessageRequest) -> Result<(), ChatError> {
    if req.content.chars().count() > MAX_CONTENT_CHARS {
        return Err(ChatError::BadRequest(format!(
            "Message content exceeds {} characters",
            MAX_CONTENT_CHARS
        )));
    }

    if req.message_type.carries_file() {
        let has_url = req
            .file_url
            .as_deref()
            .map(|url| !url.trim().is_empty())
            .unwrap_or(false);
        if !has_url {
            return Err(ChatError::BadRequest(format!(
                "{} messages require a fileUrl",
                req.message_type.as_str()
            )));
        }
    } else if req.content.trim().is_empty() {
        return Err(ChatError::BadRequest("Message content is empty".to_string()));
    }

    Ok(())
}

/// SendMessage: authorize → persist → broadcast `new_message` → best-effort
/// `delivered` upgrade. Nothing is broadcast if persistence fails.
pub async fn handle_send_message(
    req: SendMessageRequest,
    state: &AppState,
    user_id: &str,
) -> Result<(), ChatError> {
    access::require_participant(state, &req.conversation_id, user_id).await?;
    validate_message(&req)?;

    let conversation_id = req.conversation_id.clone();
    let new_message = NewMessage {
        conversation_id: req.conversation_id,
        sender_id: user_id.to_string(),
        message_type: req.message_type,
        content: req.content,
        file_url: req.file_url,
        file_name: req.file_name,
        file_size: req.file_size,
        file_extension: req.file_extension,
        duration: req.duration,
        audio_call_id: req.audio_call_id,
    };

    // Held through broadcast so fan-out order matches persistence order
    let order = state.send_order.acquire(&conversation_id).await;
    let result = persist_and_fan_out(new_message, state, &conversation_id, user_id).await;
    drop(order);

    // Senders outside any room would otherwise leave their lock entry behind
    if !state.rooms.contains_room(&conversation_id) {
        state.send_order.prune(&conversation_id);
    }

    result
}

/// Store the message, broadcast it, then try the `delivered` upgrade.
/// Caller holds the conversation's send-order lock.
async fn persist_and_fan_out(
    new_message: NewMessage,
    state: &AppState,
    conversation_id: &str,
    user_id: &str,
) -> Result<(), ChatError> {
    let message = state.store.append_message(new_message).await?;
    let message_id = message.id.clone();

    broadcast_to_room_and(state, conversation_id, user_id, &ServerEvent::NewMessage(message));

    tracing::info!(
        user_id = %user_id,
        conversation_id = %conversation_id,
        message_id = %message_id,
        "Message sent"
    );

    if state.rooms.member_count(conversation_id) > 1 {
        match state.store.mark_delivered(&message_id).await {
            Ok(true) => {
                let delivered = ServerEvent::MessageDelivered {
                    message_id: message_id.clone(),
                    conversation_id: conversation_id.to_string(),
                };
                broadcast_to_room_and(state, conversation_id, user_id, &delivered);
            }
            Ok(false) => {
                tracing::debug!(
                    message_id = %message_id,
                    "Message already past sent, skipping delivered event"
                );
            }
            Err(e) => {
                tracing::warn!(
                    message_id = %message_id,
                    error = %e,
                    "Failed to mark message delivered"
                );
            }
        }
    }

    Ok(())
}

/// MarkRead: record the caller in `readBy` for each named message they did not
/// send, then tell the room. Repeating the call changes nothing.
pub async fn handle_mark_read(
    req: MarkReadRequest,
    state: &AppState,
    user_id: &str,
) -> Result<(), ChatError> {
    access::require_member(state, &req.conversation_id, user_id)?;

    if req.message_ids.is_empty() {
        return Ok(());
    }

    let newly_read = state
        .store
        .mark_read(&req.conversation_id, &req.message_ids, user_id)
        .await?;

    tracing::debug!(
        user_id = %user_id,
        conversation_id = %req.conversation_id,
        requested = req.message_ids.len(),
        newly_read = newly_read.len(),
        "Messages marked read"
    );

    let event = ServerEvent::MessagesRead {
        user_id: user_id.to_string(),
        conversation_id: req.conversation_id.clone(),
        message_ids: req.message_ids,
    };
    broadcast_to_room(state, &req.conversation_id, &event);
    Ok(())
}
