//! Fehlertypen fuer Parlor
//!
//! Zentrale Fehler-Taxonomie. Die Registries liefern eigene, feinere
//! Status-Enums und konvertieren via `From` in diese Klassen.

use thiserror::Error;

/// Globaler Result-Alias fuer Parlor
pub type Result<T> = std::result::Result<T, ParlorError>;

/// Fehlerklassen des Systems
#[derive(Debug, Error)]
pub enum ParlorError {
    /// Fehlerhafte oder fehlende Eingabe (vor den Registries abgefangen,
    /// z.B. falscher Content-Type)
    #[error("Ungueltige Eingabe: {0}")]
    Validierung(String),

    /// Entitaet existiert bereits
    #[error("Konflikt: {0}")]
    Konflikt(String),

    /// Referenzierte Entitaet fehlt
    #[error("Nicht gefunden: {0}")]
    NichtGefunden(String),

    /// Entitaet existiert, ist aber im falschen Zustand
    #[error("Ungueltiger Zustand: {0}")]
    Zustandskonflikt(String),

    /// Alles andere, z.B. Serialisierung
    #[error("Unerwarteter Fehler: {0}")]
    Unerwartet(String),
}

impl ParlorError {
    /// Erstellt einen Validierungsfehler
    pub fn validierung(msg: impl Into<String>) -> Self {
        Self::Validierung(msg.into())
    }

    /// Die fuer Clients sichtbare Begruendung ohne Klassen-Praefix
    pub fn grund(&self) -> String {
        match self {
            Self::Validierung(g)
            | Self::Konflikt(g)
            | Self::NichtGefunden(g)
            | Self::Zustandskonflikt(g)
            | Self::Unerwartet(g) => g.clone(),
        }
    }

    /// Gibt true zurueck wenn der Fehler vom Client verursacht wurde
    pub fn ist_client_fehler(&self) -> bool {
        !matches!(self, Self::Unerwartet(_))
    }
}

impl From<serde_json::Error> for ParlorError {
    fn from(e: serde_json::Error) -> Self {
        Self::Unerwartet(format!("Serialisierung fehlgeschlagen: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = ParlorError::Konflikt("The channel exists already.".into());
        assert_eq!(e.to_string(), "Konflikt: The channel exists already.");
        assert_eq!(e.grund(), "The channel exists already.");
    }

    #[test]
    fn client_fehler_erkennung() {
        assert!(ParlorError::NichtGefunden("x".into()).ist_client_fehler());
        assert!(ParlorError::Zustandskonflikt("x".into()).ist_client_fehler());
        assert!(ParlorError::validierung("x").ist_client_fehler());
        assert!(!ParlorError::Unerwartet("x".into()).ist_client_fehler());
    }

    #[test]
    fn serde_fehler_wird_unerwartet() {
        let roh = serde_json::from_str::<serde_json::Value>("{kaputt").unwrap_err();
        let e: ParlorError = roh.into();
        assert!(matches!(e, ParlorError::Unerwartet(_)));
    }
}
