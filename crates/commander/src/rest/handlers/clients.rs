//! REST-Handler fuer verbundene Clients

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use parlor_protocol::control::OnlineUsersResponse;
use parlor_signaling::SignalingState;
use std::sync::Arc;

/// GET /onlineUsers
pub async fn list_online_users(State(state): State<Arc<SignalingState>>) -> Response {
    let antwort = OnlineUsersResponse {
        users: state.verbindungen.online_users(),
    };
    (StatusCode::OK, Json(antwort)).into_response()
}
