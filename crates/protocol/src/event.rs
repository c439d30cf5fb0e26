//! WebSocket-Events
//!
//! Alle Nachrichten tragen ein Diskriminator-Feld `about`, das den Typ
//! benennt. Die Werte sind Teil des Wire-Formats und duerfen sich nicht
//! aendern, bestehende Clients matchen auf den exakten String.
//!
//! ## Richtung
//! - [`ServerEvent`]: Server -> Client (Broadcast oder gezielt)
//! - [`ClientMessage`]: Client -> Server, geschlossene Variantenmenge mit
//!   explizitem Unbekannt-Arm

use parlor_core::types::{ChannelName, Username};
use parlor_core::ParlorError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `about`-Wert einer eingehenden Audio-Nachricht
pub const ABOUT_AUDIO_DATA: &str = "audio data";

// ---------------------------------------------------------------------------
// Server -> Client
// ---------------------------------------------------------------------------

/// Events die der Server an verbundene Clients verteilt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "about")]
pub enum ServerEvent {
    /// Neuer Benutzer ist online
    #[serde(rename = "user is connected to the websocket server")]
    UserVerbunden { username: Username },

    /// Benutzer hat die Verbindung getrennt
    #[serde(rename = "user is disconnected from the websocket server")]
    UserGetrennt { username: Username },

    /// Nur an die verdraengte Verbindung: derselbe User hat sich mit
    /// einem anderen Geraet angemeldet
    #[serde(rename = "another device is used")]
    AnderesGeraet,

    #[serde(rename = "voice channel is created")]
    KanalErstellt { name: ChannelName },

    #[serde(rename = "voice channel is removed")]
    KanalEntfernt { name: ChannelName },

    #[serde(rename = "user joined the voice channel")]
    KanalBeigetreten {
        username: Username,
        #[serde(rename = "channelName")]
        channel_name: ChannelName,
    },

    #[serde(rename = "user left the voice channel")]
    KanalVerlassen {
        username: Username,
        #[serde(rename = "channelName")]
        channel_name: ChannelName,
    },

    #[serde(rename = "user switched the voice channel")]
    KanalGewechselt {
        username: Username,
        #[serde(rename = "oldChannelName")]
        old_channel_name: ChannelName,
        #[serde(rename = "newChannelName")]
        new_channel_name: ChannelName,
    },
}

impl ServerEvent {
    /// Serialisiert das Event als JSON-Textframe
    pub fn to_json(&self) -> Result<String, ParlorError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Der `about`-Wert des Events (fuer Logs und Metriken)
    pub fn about(&self) -> &'static str {
        match self {
            Self::UserVerbunden { .. } => "user is connected to the websocket server",
            Self::UserGetrennt { .. } => "user is disconnected from the websocket server",
            Self::AnderesGeraet => "another device is used",
            Self::KanalErstellt { .. } => "voice channel is created",
            Self::KanalEntfernt { .. } => "voice channel is removed",
            Self::KanalBeigetreten { .. } => "user joined the voice channel",
            Self::KanalVerlassen { .. } => "user left the voice channel",
            Self::KanalGewechselt { .. } => "user switched the voice channel",
        }
    }
}

// ---------------------------------------------------------------------------
// Client -> Server
// ---------------------------------------------------------------------------

/// Gruende warum eine eingehende Nachricht nicht zugeordnet werden konnte
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NachrichtFehler {
    #[error("Nachricht ist kein gueltiges JSON")]
    KeinJson,

    #[error("Nachricht ist kein JSON-Objekt")]
    KeinObjekt,

    #[error("Attribut 'about' fehlt oder ist kein String")]
    AboutFehlt,
}

/// Eingehende Nachricht eines Clients
///
/// Der Inhalt von Audio-Nachrichten wird nicht interpretiert; der Router
/// leitet den Originaltext unveraendert weiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// `about == "audio data"`
    AudioDaten,
    /// Jeder andere `about`-Wert – wird geloggt und verworfen
    Unbekannt { about: String },
}

impl ClientMessage {
    /// Ordnet einen eingehenden Textframe einer Variante zu
    pub fn parsen(text: &str) -> Result<Self, NachrichtFehler> {
        let wert: serde_json::Value =
            serde_json::from_str(text).map_err(|_| NachrichtFehler::KeinJson)?;

        let objekt = wert.as_object().ok_or(NachrichtFehler::KeinObjekt)?;

        let about = objekt
            .get("about")
            .and_then(|a| a.as_str())
            .ok_or(NachrichtFehler::AboutFehlt)?;

        Ok(match about {
            ABOUT_AUDIO_DATA => Self::AudioDaten,
            anderes => Self::Unbekannt {
                about: anderes.to_string(),
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
