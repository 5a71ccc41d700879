use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};

use crate::auth::handshake::Handshake;
use crate::state::AppState;
use crate::ws::actor;

/// WebSocket close code for a refused handshake.
pub const CLOSE_AUTH_FAILED: u16 = 4001;

/// GET /ws?userId=...&token=...
/// WebSocket upgrade endpoint. The configured verifier resolves the identity.
/// On failure, upgrades then immediately closes with CLOSE_AUTH_FAILED and
/// emits no events. On success, spawns an actor for the connection.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(handshake): Query<Handshake>,
    ws: WebSocketUpgrade,
) -> Response {
    match state.verifier.verify(&handshake) {
        Ok(user_id) => {
            tracing::info!(user_id = %user_id, "WebSocket connection authenticated");
            ws.on_upgrade(move |socket| handle_authenticated(socket, state, user_id))
        }
        Err(err) => {
            tracing::warn!(
                close_code = CLOSE_AUTH_FAILED,
                error = %err,
                "WebSocket auth failed"
            );

            let reason = err.client_message();
            ws.on_upgrade(move |mut socket| async move {
                let close_frame = CloseFrame {
                    code: CLOSE_AUTH_FAILED,
                    reason: reason.into(),
                };
                let _ = socket.send(Message::Close(Some(close_frame))).await;
            })
        }
    }
}

/// Handle an authenticated WebSocket connection by running the actor.
async fn handle_authenticated(socket: WebSocket, state: AppState, user_id: String) {
    actor::run_connection(socket, state, user_id).await;
}
