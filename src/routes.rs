use axum::{routing::get, Router};

use crate::chat::stats;
use crate::state::AppState;
use crate::ws::handler as ws_handler;

/// Build the full axum Router: the WebSocket endpoint plus the read-only
/// presence/stats surface.
pub fn build_router(state: AppState) -> Router {
    // WebSocket endpoint (identity via query params, verified by the handshake verifier)
    let ws_routes = Router::new().route("/ws", get(ws_handler::ws_upgrade));

    let stats_routes = Router::new()
        .route("/health", get(stats::health))
        .route("/api/stats", get(stats::stats))
        .route(
            "/api/conversations/{id}/online-users",
            get(stats::online_users),
        );

    Router::new()
        .merge(ws_routes)
        .merge(stats_routes)
        .with_state(state)
}
