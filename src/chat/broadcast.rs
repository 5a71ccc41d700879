//! Room-scoped fan-out helpers.
//! Resolve a room's current members and push an event to their connections.

use chrono::Utc;

use crate::state::AppState;
use crate::ws::broadcast::send_to_users;
use crate::ws::protocol::ServerEvent;

/// Send to every member of the room.
pub fn broadcast_to_room(state: &AppState, conversation_id: &str, event: &ServerEvent) {
    let members = state.rooms.members(conversation_id);
    send_to_users(&state.connections, members.iter().map(String::as_str), event);
}

/// Send to every member of the room plus `user_id`, even if that user is not
/// present (a sender always gets its own echo).
pub fn broadcast_to_room_and(
    state: &AppState,
    conversation_id: &str,
    user_id: &str,
    event: &ServerEvent,
) {
    let mut members = state.rooms.members(conversation_id);
    if !members.iter().any(|m| m == user_id) {
        members.push(user_id.to_string());
    }
    send_to_users(&state.connections, members.iter().map(String::as_str), event);
}

/// Send to every member of the room except `except_user_id`.
pub fn broadcast_to_others(
    state: &AppState,
    conversation_id: &str,
    except_user_id: &str,
    event: &ServerEvent,
) {
    let members = state.rooms.members(conversation_id);
    send_to_users(
        &state.connections,
        members
            .iter()
            .map(String::as_str)
            .filter(|member| *member != except_user_id),
        event,
    );
}

/// Tell the remaining members that `user_id` left.
pub fn broadcast_user_left(state: &AppState, conversation_id: &str, user_id: &str) {
    let event = ServerEvent::UserLeft {
        conversation_id: conversation_id.to_string(),
        user_id: user_id.to_string(),
        timestamp: Utc::now(),
    };
    broadcast_to_others(state, conversation_id, user_id, &event);
}
