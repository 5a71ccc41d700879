//! Read-only operational endpoints derived from the registry and tracker.
//! Snapshots may lag in-flight joins and leaves; nothing here mutates state.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub connections: usize,
    pub rooms: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub connections: usize,
    pub rooms: usize,
    pub room_members: usize,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineUsersResponse {
    pub conversation_id: String,
    pub members: Vec<String>,
    pub count: usize,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        connections: state.connections.len(),
        rooms: state.rooms.room_count(),
    })
}

/// GET /api/stats
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        connections: state.connections.len(),
        rooms: state.rooms.room_count(),
        room_members: state.rooms.total_members(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

/// GET /api/conversations/{id}/online-users
pub async fn online_users(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Json<OnlineUsersResponse> {
    let members = state.rooms.members(&conversation_id);
    Json(OnlineUsersResponse {
        conversation_id,
        count: members.len(),
        members,
    })
}
