//! WebSocket-Endpunkt `/connect?username=<name>`
//!
//! Nimmt Upgrades an und startet pro Verbindung eine `ClientConnection`.
//! Fehlt der Username, wird der Socket direkt nach dem Upgrade mit einem
//! Close-Frame geschlossen. Das Client-Limit prueft die Registry beim
//! Registrieren.

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use parlor_core::types::Username;
use serde::Deserialize;
use std::borrow::Cow;
use std::sync::Arc;

use crate::connection::ClientConnection;
use crate::server_state::SignalingState;

/// Close-Code bei fehlendem `username`-Parameter
pub const CLOSE_USERNAME_FEHLT: u16 = 4000;

/// Pfad des WebSocket-Endpunkts
pub const CONNECT_PFAD: &str = "/connect";

/// Query-Parameter beim Verbindungsaufbau
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    pub username: Option<String>,
}

/// Router mit dem WebSocket-Endpunkt
pub fn ws_router(state: Arc<SignalingState>) -> Router {
    Router::new()
        .route(CONNECT_PFAD, get(ws_upgrade))
        .with_state(state)
}

/// GET /connect?username=<name>
pub async fn ws_upgrade(
    State(state): State<Arc<SignalingState>>,
    Query(params): Query<ConnectParams>,
    ws: WebSocketUpgrade,
) -> Response {
    let username = match params.username.filter(|u| !u.is_empty()) {
        Some(u) => Username::neu(u),
        None => {
            tracing::warn!("Verbindung ohne username abgelehnt");
            return ablehnen(
                ws,
                CLOSE_USERNAME_FEHLT,
                "The query parameter 'username' is missing.",
            );
        }
    };

    tracing::debug!(username = %username, "WebSocket-Upgrade");
    ws.on_upgrade(move |socket: WebSocket| async move {
        ClientConnection::neu(state, username)
            .verarbeiten(socket)
            .await;
    })
}

/// Upgrade annehmen und sofort mit Close-Frame schliessen
fn ablehnen(ws: WebSocketUpgrade, code: u16, grund: &'static str) -> Response {
    ws.on_upgrade(move |socket| close_senden(socket, code, grund))
}

/// Sendet einen Close-Frame auf einen noch ungeteilten Socket
pub(crate) async fn close_senden(mut socket: WebSocket, code: u16, grund: &'static str) {
    let frame = CloseFrame {
        code,
        reason: Cow::Borrowed(grund),
    };
    if let Err(e) = socket.send(Message::Close(Some(frame))).await {
        tracing::debug!(fehler = %e, "Close-Frame nicht zustellbar");
    }
}
