//! Message-Dispatcher – Routet eingehende WebSocket-Nachrichten
//!
//! Der Dispatcher bekommt jeden Textframe einer `ClientConnection` und
//! entscheidet anhand des `about`-Felds was damit passiert. Antworten an den
//! Absender gibt es nicht; alles was ausgeht laeuft ueber die Registries.
//!
//! ## Routing
//! - `audio data`: unveraendert an alle anderen Verbindungen
//! - alles andere (kein JSON, kein `about`, unbekannter Wert): Warnung, verwerfen

use parlor_core::types::SessionId;
use parlor_protocol::event::ClientMessage;
use std::sync::Arc;

use crate::server_state::SignalingState;

/// Was mit einer eingehenden Nachricht passiert ist
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verarbeitung {
    /// An die angegebene Anzahl Verbindungen weitergeleitet
    Weitergeleitet(usize),
    /// Nachricht wurde verworfen
    Verworfen,
}

/// Zentraler Message-Dispatcher
pub struct MessageDispatcher {
    state: Arc<SignalingState>,
}

impl MessageDispatcher {
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<SignalingState>) -> Self {
        Self { state }
    }

    /// Verarbeitet einen eingehenden Textframe
    pub fn dispatch(&self, session_id: &SessionId, text: &str) -> Verarbeitung {
        let nachricht = match ClientMessage::parsen(text) {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(session = %session_id, fehler = %e, "Nachricht verworfen");
                return Verarbeitung::Verworfen;
            }
        };

        match nachricht {
            ClientMessage::AudioDaten => self.audio_weiterleiten(session_id, text),
            ClientMessage::Unbekannt { about } => {
                tracing::warn!(
                    session = %session_id,
                    about = %about,
                    "Unbekannter Nachrichtentyp – verworfen"
                );
                Verarbeitung::Verworfen
            }
        }
    }

    /// Leitet Audio an alle anderen Verbindungen weiter
    ///
    /// Verdraengte Sessions gehoeren keinem User mehr, ihr Audio wird verworfen.
    fn audio_weiterleiten(&self, session_id: &SessionId, text: &str) -> Verarbeitung {
        let Some(username) = self.state.verbindungen.username_fuer_session(session_id) else {
            tracing::debug!(session = %session_id, "Audio einer inaktiven Session verworfen");
            return Verarbeitung::Verworfen;
        };

        let empfaenger = self.state.verbindungen.an_alle_ausser_senden(session_id, text);
        tracing::trace!(username = %username, empfaenger, "Audio weitergeleitet");
        Verarbeitung::Weitergeleitet(empfaenger)
    }

    /// Raeumt nach dem Ende einer Verbindung auf
    ///
    /// Erst wird der User aus seinem Kanal entfernt, dann die Verbindung
    /// abgemeldet. Fuer verdraengte Sessions passiert nichts.
    ///
    /// Die beiden Registries werden nie gemeinsam gesperrt. Verbindet sich
    /// derselbe User zwischen der Session-Pruefung und dem Verlassen neu,
    /// verliert die neue Verbindung ihre Kanal-Mitgliedschaft; das
    /// anschliessende `abmelden` ist dann ein No-op.
    pub fn client_cleanup(&self, session_id: &SessionId) {
        let Some(username) = self.state.verbindungen.username_fuer_session(session_id) else {
            tracing::debug!(session = %session_id, "Session bereits abgeloest – kein Cleanup");
            return;
        };

        self.state
            .kanaele
            .aktuellen_verlassen(&username, &self.state.verbindungen);
        self.state.verbindungen.abmelden(session_id);

        tracing::debug!(username = %username, session = %session_id, "Client-Ressourcen bereinigt");
    }
}
