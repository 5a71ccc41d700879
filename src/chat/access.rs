//! Authorization checks shared by the event handlers.

use crate::db::models::Conversation;
use crate::error::ChatError;
use crate::state::AppState;

/// Look up a conversation, bounded by the configured lookup timeout.
pub async fn lookup_conversation(
    state: &AppState,
    conversation_id: &str,
) -> Result<Conversation, ChatError> {
    match tokio::time::timeout(state.lookup_timeout, state.store.conversation(conversation_id))
        .await
    {
        Ok(result) => Ok(result?),
        Err(_) => Err(ChatError::Timeout(
            "Conversation lookup timed out, please retry".to_string(),
        )),
    }
}

/// Look up a conversation and require `user_id` to be one of its participants.
pub async fn require_participant(
    state: &AppState,
    conversation_id: &str,
    user_id: &str,
) -> Result<Conversation, ChatError> {
    let conversation = lookup_conversation(state, conversation_id).await?;
    if !conversation.has_participant(user_id) {
        return Err(ChatError::Unauthorized(
            "Not a participant of this conversation".to_string(),
        ));
    }
    Ok(conversation)
}

/// Require `user_id` to be currently present in the conversation's room.
pub fn require_member(
    state: &AppState,
    conversation_id: &str,
    user_id: &str,
) -> Result<(), ChatError> {
    if state.rooms.is_member(conversation_id, user_id) {
        Ok(())
    } else {
        Err(ChatError::Unauthorized(
            "Join the conversation first".to_string(),
        ))
    }
}
