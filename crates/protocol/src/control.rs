//! Control-Plane (HTTP)
//!
//! Request- und Response-Bodies der Verwaltungs-Endpunkte. Feldnamen sind
//! camelCase wie im Event-Format.

use parlor_core::types::{ChannelName, Username};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Body fuer `POST /joinVoiceChannel` und `POST /leaveVoiceChannel`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KanalMitgliedschaftRequest {
    pub username: Username,
    pub channel_name: ChannelName,
}

/// Body fuer `POST /switchVoiceChannel`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KanalWechselRequest {
    pub username: Username,
    pub old_channel_name: ChannelName,
    pub new_channel_name: ChannelName,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Ein Kanal mit seinen aktuellen Mitgliedern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub name: ChannelName,
    pub users: Vec<Username>,
}

/// `GET /voiceChannels`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelListResponse {
    pub channels: Vec<ChannelInfo>,
}

/// `GET /onlineUsers`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineUsersResponse {
    pub users: Vec<Username>,
}

/// Fehler-Body aller Control-Plane-Endpunkte
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FehlerAntwort {
    pub reason: String,
}

impl FehlerAntwort {
    pub fn neu(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
