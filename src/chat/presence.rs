//! Room presence: joining, leaving, typing indicators and disconnect cleanup.

use chrono::Utc;

use crate::chat::access;
use crate::chat::broadcast::{broadcast_to_others, broadcast_user_left};
use crate::error::ChatError;
use crate::state::AppState;
use crate::ws::broadcast::send_event;
use crate::ws::protocol::{ConversationRef, ServerEvent, TypingRequest};
use crate::ws::ConnectionSender;

/// JoinConversation: verify participation, enter the room, announce the join
/// to the others, then acknowledge with the current occupant snapshot.
pub async fn handle_join(
    req: ConversationRef,
    tx: &ConnectionSender,
    state: &AppState,
    user_id: &str,
) -> Result<(), ChatError> {
    let conversation_id = req.conversation_id;
    access::require_participant(state, &conversation_id, user_id).await?;

    let newly_joined = state.rooms.join(&conversation_id, user_id);
    if newly_joined {
        let joined = ServerEvent::UserJoined {
            conversation_id: conversation_id.clone(),
            user_id: user_id.to_string(),
            timestamp: Utc::now(),
        };
        broadcast_to_others(state, &conversation_id, user_id, &joined);
    }

    send_event(
        tx,
        &ServerEvent::ConversationJoined {
            conversation_id: conversation_id.clone(),
        },
    );
    send_event(
        tx,
        &ServerEvent::OnlineUsers {
            conversation_id: conversation_id.clone(),
            members: state.rooms.members(&conversation_id),
        },
    );

    tracing::info!(
        user_id = %user_id,
        conversation_id = %conversation_id,
        rejoin = !newly_joined,
        "Joined conversation"
    );
    Ok(())
}

/// LeaveConversation: a no-op when the user is not in the room.
pub fn handle_leave(
    req: ConversationRef,
    state: &AppState,
    user_id: &str,
) -> Result<(), ChatError> {
    if state.rooms.leave(&req.conversation_id, user_id) {
        broadcast_user_left(state, &req.conversation_id, user_id);
        state.send_order.prune(&req.conversation_id);
        tracing::info!(
            user_id = %user_id,
            conversation_id = %req.conversation_id,
            "Left conversation"
        );
    }
    Ok(())
}

/// Typing: ephemeral relay to the other occupants. Nothing is stored.
pub fn handle_typing(req: TypingRequest, state: &AppState, user_id: &str) -> Result<(), ChatError> {
    access::require_member(state, &req.conversation_id, user_id)?;

    let event = ServerEvent::UserTyping {
        user_id: user_id.to_string(),
        conversation_id: req.conversation_id.clone(),
        is_typing: req.is_typing,
    };
    broadcast_to_others(state, &req.conversation_id, user_id, &event);
    Ok(())
}

/// Remove a disconnected user from every room and notify the remaining members.
/// Returns the conversations the user was removed from.
pub fn leave_all_rooms(state: &AppState, user_id: &str) -> Vec<String> {
    let left = state.rooms.leave_all(user_id);
    for conversation_id in &left {
        broadcast_user_left(state, conversation_id, user_id);
        state.send_order.prune(conversation_id);
    }
    left
}
