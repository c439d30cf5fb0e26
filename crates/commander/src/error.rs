//! Fehlertypen fuer den Parlor Commander

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use parlor_core::error::ParlorError;
use parlor_protocol::control::FehlerAntwort;
use parlor_signaling::KanalFehler;
use thiserror::Error;

/// Fehler eines Control-Plane-Requests
///
/// Traegt die Fehlerklasse aus `parlor-core`; Header- und Body-Pruefungen
/// landen als `ParlorError::Validierung`, Registry-Status ueber
/// `From<KanalFehler>`.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct CommanderError(#[from] ParlorError);

pub type CommanderResult<T> = Result<T, CommanderError>;

impl From<KanalFehler> for CommanderError {
    fn from(fehler: KanalFehler) -> Self {
        Self(fehler.into())
    }
}

impl CommanderError {
    pub fn ungueltig(grund: impl Into<String>) -> Self {
        Self(ParlorError::validierung(grund))
    }

    /// HTTP-Statuscode fuer REST-Fehler
    pub fn http_status(&self) -> u16 {
        match &self.0 {
            ParlorError::Validierung(_) | ParlorError::Zustandskonflikt(_) => 400,
            ParlorError::NichtGefunden(_) => 404,
            ParlorError::Konflikt(_) => 409,
            ParlorError::Unerwartet(_) => 500,
        }
    }

    /// Text fuer das `reason`-Feld der Antwort
    pub fn grund(&self) -> String {
        if self.0.ist_client_fehler() {
            self.0.grund()
        } else {
            "Unexpected error occurred. Please check the server log.".into()
        }
    }
}

impl IntoResponse for CommanderError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(fehler = %self, "Unerwarteter Fehler im Control-Plane-Request");
        } else {
            tracing::debug!(status = status.as_u16(), grund = %self.grund(), "Request abgelehnt");
        }
        (status, Json(FehlerAntwort::neu(self.grund()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kanal_fehler_auf_http_status() {
        let faelle = [
            (KanalFehler::BereitsVorhanden, 409),
            (KanalFehler::KanalNichtGefunden, 404),
            (KanalFehler::UserNichtGefunden, 404),
            (KanalFehler::NeuerKanalNichtGefunden, 404),
            (KanalFehler::InKeinemKanal, 400),
            (
                KanalFehler::NichtImAltenKanal {
                    aktuell: "lobby".into(),
                },
                400,
            ),
        ];
        for (fehler, status) in faelle {
            assert_eq!(CommanderError::from(fehler).http_status(), status);
        }
    }

    #[test]
    fn ungueltige_eingabe_ist_validierung() {
        let fehler = CommanderError::ungueltig("Content-Type header is missing.");
        assert!(matches!(fehler.0, ParlorError::Validierung(_)));
        assert_eq!(fehler.http_status(), 400);
        assert_eq!(fehler.grund(), "Content-Type header is missing.");
    }

    #[test]
    fn grund_bleibt_unveraendert() {
        let fehler = CommanderError::from(KanalFehler::BereitsVorhanden);
        assert_eq!(fehler.grund(), "The channel exists already.");
    }

    #[test]
    fn interne_details_gehen_nicht_an_clients() {
        let fehler = CommanderError::from(ParlorError::Unerwartet("geheimes Detail".into()));
        assert_eq!(fehler.http_status(), 500);
        assert!(!fehler.grund().contains("geheim"));
    }
}
