//! Audio call signaling relay.
//!
//! The server does not track call state: offers, answers and ICE candidates
//! are forwarded opaquely to the other occupants of the conversation's room,
//! never echoed to the sender. Invite and reject leave a one-line system
//! message in the chat history.

use crate::chat::access;
use crate::db::models::{MessageType, NewMessage};
use crate::error::ChatError;
use crate::state::AppState;
use crate::ws::broadcast::send_to_users;
use crate::ws::protocol::{CallAnswer, CallOffer, CallRef, IceCandidateRequest, ServerEvent};

/// Recipients of a relayed signal: the room's members minus the sender.
pub fn recipients<'a>(members: &'a [String], sender_id: &str) -> Vec<&'a str> {
    members
        .iter()
        .map(String::as_str)
        .filter(|member| *member != sender_id)
        .collect()
}

fn relay(state: &AppState, conversation_id: &str, sender_id: &str, event: &ServerEvent) {
    let members = state.rooms.members(conversation_id);
    send_to_users(&state.connections, recipients(&members, sender_id), event);
}

/// Persist a call record for chat history. Failure is logged; the relay
/// itself is not held back by it.
async fn record_call_event(
    state: &AppState,
    conversation_id: &str,
    user_id: &str,
    call_id: &str,
    message_type: MessageType,
    content: &str,
) {
    let record = NewMessage::call_record(conversation_id, user_id, message_type, call_id, content);
    if let Err(e) = state.store.append_message(record).await {
        tracing::warn!(
            conversation_id = %conversation_id,
            call_id = %call_id,
            error = %e,
            "Failed to record call event"
        );
    }
}

/// InitiateCall: record the invite, relay the offer as `audio_call_incoming`.
pub async fn handle_call_initiate(
    req: CallOffer,
    state: &AppState,
    user_id: &str,
) -> Result<(), ChatError> {
    access::require_member(state, &req.conversation_id, user_id)?;

    record_call_event(
        state,
        &req.conversation_id,
        user_id,
        &req.call_id,
        MessageType::AudioInvite,
        "Audio call started",
    )
    .await;

    tracing::info!(
        user_id = %user_id,
        conversation_id = %req.conversation_id,
        call_id = %req.call_id,
        "Audio call initiated"
    );

    let event = ServerEvent::AudioCallIncoming {
        conversation_id: req.conversation_id.clone(),
        call_id: req.call_id,
        caller_id: user_id.to_string(),
        offer: req.offer,
    };
    relay(state, &req.conversation_id, user_id, &event);
    Ok(())
}

/// AnswerCall: pure relay of the SDP answer.
pub fn handle_call_answer(req: CallAnswer, state: &AppState, user_id: &str) -> Result<(), ChatError> {
    access::require_member(state, &req.conversation_id, user_id)?;

    let event = ServerEvent::AudioCallAnswered {
        conversation_id: req.conversation_id.clone(),
        call_id: req.call_id,
        user_id: user_id.to_string(),
        answer: req.answer,
    };
    relay(state, &req.conversation_id, user_id, &event);
    Ok(())
}

/// RejectCall: record the rejection, relay `audio_call_rejected`.
pub async fn handle_call_reject(
    req: CallRef,
    state: &AppState,
    user_id: &str,
) -> Result<(), ChatError> {
    access::require_member(state, &req.conversation_id, user_id)?;

    record_call_event(
        state,
        &req.conversation_id,
        user_id,
        &req.call_id,
        MessageType::AudioReject,
        "Audio call declined",
    )
    .await;

    tracing::info!(
        user_id = %user_id,
        conversation_id = %req.conversation_id,
        call_id = %req.call_id,
        "Audio call rejected"
    );

    let event = ServerEvent::AudioCallRejected {
        conversation_id: req.conversation_id.clone(),
        call_id: req.call_id,
        user_id: user_id.to_string(),
    };
    relay(state, &req.conversation_id, user_id, &event);
    Ok(())
}

/// EndCall: pure relay.
pub fn handle_call_end(req: CallRef, state: &AppState, user_id: &str) -> Result<(), ChatError> {
    access::require_member(state, &req.conversation_id, user_id)?;

    let event = ServerEvent::AudioCallEnded {
        conversation_id: req.conversation_id.clone(),
        call_id: req.call_id,
        user_id: user_id.to_string(),
    };
    relay(state, &req.conversation_id, user_id, &event);
    Ok(())
}

/// IceCandidate: pure relay.
pub fn handle_ice_candidate(
    req: IceCandidateRequest,
    state: &AppState,
    user_id: &str,
) -> Result<(), ChatError> {
    access::require_member(state, &req.conversation_id, user_id)?;

    let event = ServerEvent::IceCandidate {
        conversation_id: req.conversation_id.clone(),
        call_id: req.call_id,
        user_id: user_id.to_string(),
        ice_candidate: req.ice_candidate,
    };
    relay(state, &req.conversation_id, user_id, &event);
    Ok(())
}
