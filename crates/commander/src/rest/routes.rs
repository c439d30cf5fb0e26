//! Route-Definitionen der Control-Plane
//!
//! Pfade und Methoden sind Teil des Client-Vertrags und bleiben stabil.

use axum::{
    routing::{delete, get, post},
    Router,
};
use parlor_signaling::SignalingState;
use std::sync::Arc;

use crate::rest::handlers;

/// Erstellt den Router aller Control-Plane-Endpunkte
pub fn control_router() -> Router<Arc<SignalingState>> {
    Router::new()
        // Kanaele
        .route("/voiceChannels", get(handlers::channels::list_channels))
        .route("/createVoiceChannel", post(handlers::channels::create_channel))
        .route("/removeVoiceChannel", delete(handlers::channels::delete_channel))
        .route("/joinVoiceChannel", post(handlers::channels::join_channel))
        .route("/leaveVoiceChannel", post(handlers::channels::leave_channel))
        .route("/switchVoiceChannel", post(handlers::channels::switch_channel))
        // Clients
        .route("/onlineUsers", get(handlers::clients::list_online_users))
}
