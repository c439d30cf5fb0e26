//! REST-Handler fuer Voice-Kanal-Endpunkte

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use parlor_core::types::ChannelName;
use parlor_protocol::control::{ChannelListResponse, KanalMitgliedschaftRequest, KanalWechselRequest};
use parlor_signaling::SignalingState;
use std::sync::Arc;

use crate::error::CommanderResult;
use crate::rest::inhalt::{content_type_pruefen, json_body, BodyArt};

/// GET /voiceChannels
pub async fn list_channels(State(state): State<Arc<SignalingState>>) -> Response {
    let antwort = ChannelListResponse {
        channels: state.kanaele.snapshot(),
    };
    (StatusCode::OK, Json(antwort)).into_response()
}

/// POST /createVoiceChannel (Body: Kanalname als Text)
pub async fn create_channel(
    State(state): State<Arc<SignalingState>>,
    headers: HeaderMap,
    body: String,
) -> CommanderResult<Response> {
    content_type_pruefen(&headers, BodyArt::Text)?;
    let name = ChannelName::neu(body);
    state.kanaele.erstellen(&name, &state.verbindungen)?;
    Ok(StatusCode::CREATED.into_response())
}

/// DELETE /removeVoiceChannel (Body: Kanalname als Text)
pub async fn delete_channel(
    State(state): State<Arc<SignalingState>>,
    headers: HeaderMap,
    body: String,
) -> CommanderResult<Response> {
    content_type_pruefen(&headers, BodyArt::Text)?;
    let name = ChannelName::neu(body);
    state.kanaele.entfernen(&name, &state.verbindungen)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// POST /joinVoiceChannel
pub async fn join_channel(
    State(state): State<Arc<SignalingState>>,
    headers: HeaderMap,
    body: String,
) -> CommanderResult<Response> {
    let req: KanalMitgliedschaftRequest = json_body(&headers, &body)?;
    let beitritt = state
        .kanaele
        .beitreten(&req.username, &req.channel_name, &state.verbindungen)?;
    tracing::debug!(username = %req.username, ergebnis = ?beitritt, "Join verarbeitet");
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// POST /leaveVoiceChannel
pub async fn leave_channel(
    State(state): State<Arc<SignalingState>>,
    headers: HeaderMap,
    body: String,
) -> CommanderResult<Response> {
    let req: KanalMitgliedschaftRequest = json_body(&headers, &body)?;
    state
        .kanaele
        .verlassen(&req.username, &req.channel_name, &state.verbindungen)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// POST /switchVoiceChannel
pub async fn switch_channel(
    State(state): State<Arc<SignalingState>>,
    headers: HeaderMap,
    body: String,
) -> CommanderResult<Response> {
    let req: KanalWechselRequest = json_body(&headers, &body)?;
    state.kanaele.wechseln(
        &req.username,
        &req.old_channel_name,
        &req.new_channel_name,
        &state.verbindungen,
    )?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
