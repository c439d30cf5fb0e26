//! Fehlertypen fuer den Signaling-Service

use parlor_core::error::ParlorError;
use parlor_core::types::ChannelName;
use thiserror::Error;

/// Fehlertyp fuer die WebSocket-Verbindungsschicht
#[derive(Debug, Error)]
pub enum SignalingError {
    /// Fehler im WebSocket-Transport (Lesen oder Schreiben)
    #[error("WebSocket-Fehler: {0}")]
    Transport(#[from] axum::Error),
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;

/// Status einer fehlgeschlagenen Kanal-Operation
///
/// Jede Operation der `ChannelRegistry` liefert genau einen dieser Werte
/// oder Erfolg. Die Display-Texte gehen unveraendert als `reason` an
/// HTTP-Clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KanalFehler {
    #[error("The channel exists already.")]
    BereitsVorhanden,

    #[error("The channel does not exist.")]
    KanalNichtGefunden,

    #[error("The user does not exist.")]
    UserNichtGefunden,

    #[error("The old channel does not exist.")]
    AlterKanalNichtGefunden,

    #[error("The new channel does not exist.")]
    NeuerKanalNichtGefunden,

    /// User ist in einem Kanal, aber nicht im angegebenen alten
    #[error("The user was not in the old channel. The user was in {aktuell}.")]
    NichtImAltenKanal { aktuell: ChannelName },

    #[error("The user was not in any channel.")]
    InKeinemKanal,
}

impl From<KanalFehler> for ParlorError {
    fn from(fehler: KanalFehler) -> Self {
        let grund = fehler.to_string();
        match fehler {
            KanalFehler::BereitsVorhanden => ParlorError::Konflikt(grund),
            KanalFehler::KanalNichtGefunden
            | KanalFehler::UserNichtGefunden
            | KanalFehler::AlterKanalNichtGefunden
            | KanalFehler::NeuerKanalNichtGefunden => ParlorError::NichtGefunden(grund),
            KanalFehler::NichtImAltenKanal { .. } | KanalFehler::InKeinemKanal => {
                ParlorError::Zustandskonflikt(grund)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kanal_fehler_klassen() {
        assert!(matches!(
            ParlorError::from(KanalFehler::BereitsVorhanden),
            ParlorError::Konflikt(_)
        ));
        assert!(matches!(
            ParlorError::from(KanalFehler::NeuerKanalNichtGefunden),
            ParlorError::NichtGefunden(_)
        ));
        assert!(matches!(
            ParlorError::from(KanalFehler::InKeinemKanal),
            ParlorError::Zustandskonflikt(_)
        ));
    }

    #[test]
    fn nicht_im_alten_kanal_nennt_aktuellen_kanal() {
        let fehler = KanalFehler::NichtImAltenKanal {
            aktuell: "other".into(),
        };
        assert_eq!(
            fehler.to_string(),
            "The user was not in the old channel. The user was in other."
        );
    }
}
