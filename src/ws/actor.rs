use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::time::interval;

use crate::chat::presence;
use crate::config::Keepalive;
use crate::error::ChatError;
use crate::state::AppState;
use crate::ws::broadcast::force_close;
use crate::ws::protocol;
use crate::ws::{Connection, ConnectionId, ConnectionSender};

/// Close code sent to a connection replaced by a newer one for the same user.
pub const CLOSE_SUPERSEDED: u16 = 4000;

/// Run the actor-per-connection pattern for an authenticated WebSocket.
///
/// Splits the WebSocket into reader and writer halves:
/// - Writer task: owns the sink, forwards messages from an mpsc channel
/// - Ping task: keeps the transport alive and closes it when pongs stop
/// - Reader loop: decodes client events and dispatches them one at a time
///
/// The mpsc channel allows any part of the system to send messages to this client
/// by cloning the sender.
pub async fn run_connection(socket: WebSocket, state: AppState, user_id: String) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    let connection_id = open_session(&state, &user_id, tx.clone());

    tracing::info!(
        user_id = %user_id,
        connection_id = %connection_id,
        "WebSocket actor started"
    );

    let mut writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    let (pong_tx, pong_rx) = mpsc::unbounded_channel::<()>();
    let mut ping_handle = tokio::spawn(ping_task(tx.clone(), pong_rx, state.keepalive));

    loop {
        tokio::select! {
            incoming = ws_receiver.next() => match incoming {
                Some(Ok(msg)) => match msg {
                    Message::Text(text) => {
                        protocol::handle_text_message(text.as_str(), &tx, &state, &user_id).await;
                    }
                    Message::Binary(_) => {
                        tracing::debug!(user_id = %user_id, "Received binary frame (expected JSON text)");
                        protocol::send_error(
                            &tx,
                            &ChatError::BadRequest("Binary frames are not supported".to_string()),
                        );
                    }
                    Message::Pong(_) => {
                        let _ = pong_tx.send(());
                    }
                    Message::Ping(data) => {
                        let _ = tx.send(Message::Pong(data));
                    }
                    Message::Close(frame) => {
                        tracing::info!(
                            user_id = %user_id,
                            reason = ?frame,
                            "Client initiated close"
                        );
                        break;
                    }
                },
                Some(Err(e)) => {
                    tracing::warn!(
                        user_id = %user_id,
                        error = %e,
                        "WebSocket receive error"
                    );
                    break;
                }
                None => {
                    tracing::info!(user_id = %user_id, "WebSocket stream ended");
                    break;
                }
            },
            // Keepalive gave up on the peer
            _ = &mut ping_handle => break,
            // Writer closed the socket (superseded or sink failure)
            _ = &mut writer_handle => break,
        }
    }

    writer_handle.abort();
    ping_handle.abort();

    let left = close_session(&state, &user_id, connection_id);

    tracing::info!(
        user_id = %user_id,
        connection_id = %connection_id,
        rooms_left = left.len(),
        "WebSocket actor stopped"
    );
}

/// Connect: register the connection (superseding any earlier one for the
/// same user) and return its id.
pub fn open_session(state: &AppState, user_id: &str, tx: ConnectionSender) -> ConnectionId {
    let connection = Connection::new(tx);
    let connection_id = connection.id;

    if let Some(previous) = state.connections.register(user_id, connection) {
        tracing::info!(
            user_id = %user_id,
            superseded = %previous.id,
            "Superseding previous connection"
        );
        force_close(&previous.sender, CLOSE_SUPERSEDED, "Superseded by a newer connection");
    }

    connection_id
}

/// Disconnect: unregister and leave every room, notifying remaining members.
///
/// A connection that was already superseded does nothing: the newer
/// connection owns the user's presence. Returns the conversations left.
pub fn close_session(state: &AppState, user_id: &str, connection_id: ConnectionId) -> Vec<String> {
    if !state.connections.unregister(user_id, connection_id) {
        tracing::debug!(
            user_id = %user_id,
            connection_id = %connection_id,
            "Superseded connection closed, skipping room cleanup"
        );
        return Vec::new();
    }

    presence::leave_all_rooms(state, user_id)
}

/// Writer task: receives messages from mpsc channel and forwards them to the WebSocket sink.
/// Stops after forwarding a close frame.
async fn writer_task(
    mut ws_sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        let closing = matches!(msg, Message::Close(_));
        if ws_sender.send(msg).await.is_err() || closing {
            break;
        }
    }
}

/// Ping task: pings on every interval tick and returns once no pong has been
/// seen for the configured timeout, after asking the writer to close.
async fn ping_task(
    tx: ConnectionSender,
    mut pong_rx: mpsc::UnboundedReceiver<()>,
    keepalive: Keepalive,
) {
    let mut ping_timer = interval(keepalive.ping_interval);
    // Skip the first immediate tick
    ping_timer.tick().await;
    let mut last_pong = Instant::now();

    loop {
        tokio::select! {
            _ = ping_timer.tick() => {
                if last_pong.elapsed() >= keepalive.pong_timeout {
                    tracing::warn!("Pong timeout, closing connection");
                    let _ = tx.send(Message::Close(Some(CloseFrame {
                        code: 1001,
                        reason: "Pong timeout".into(),
                    })));
                    return;
                }
                if tx.send(Message::Ping(vec![1, 2, 3, 4].into())).is_err() {
                    // Writer task has died, connection is gone
                    return;
                }
            }
            pong = pong_rx.recv() => match pong {
                Some(()) => last_pong = Instant::now(),
                None => return,
            },
        }
    }
}
