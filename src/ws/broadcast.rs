use axum::extract::ws::{CloseFrame, Message};

use super::protocol::ServerEvent;
use super::{ConnectionRegistry, ConnectionSender};

/// Encode an event as a JSON text frame.
pub fn encode_event(event: &ServerEvent) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode server event");
            None
        }
    }
}

/// Send an event on one connection's channel.
pub fn send_event(tx: &ConnectionSender, event: &ServerEvent) {
    if let Some(msg) = encode_event(event) {
        let _ = tx.send(msg);
    }
}

/// Send an event to a specific user over their registered connection.
/// Returns false if the user has no live connection.
pub fn send_to_user(registry: &ConnectionRegistry, user_id: &str, event: &ServerEvent) -> bool {
    match (registry.lookup(user_id), encode_event(event)) {
        (Some(sender), Some(msg)) => sender.send(msg).is_ok(),
        _ => false,
    }
}

/// Send one event to each listed user, encoding it once.
/// Users without a live connection are skipped.
pub fn send_to_users<'a, I>(registry: &ConnectionRegistry, user_ids: I, event: &ServerEvent)
where
    I: IntoIterator<Item = &'a str>,
{
    let Some(msg) = encode_event(event) else {
        return;
    };

    for user_id in user_ids {
        if let Some(sender) = registry.lookup(user_id) {
            let _ = sender.send(msg.clone());
        }
    }
}

/// Ask a connection's writer to close the socket with the given code.
pub fn force_close(sender: &ConnectionSender, close_code: u16, reason: &str) {
    let close_frame = CloseFrame {
        code: close_code,
        reason: reason.to_string().into(),
    };
    let _ = sender.send(Message::Close(Some(close_frame)));
}
