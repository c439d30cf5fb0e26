//! Pruefung von Content-Type und Request-Body
//!
//! Alles was hier abgelehnt wird, erreicht die Registries nie und wird mit
//! 400 und `{reason}` beantwortet.

use axum::http::{header, HeaderMap};
use serde::de::DeserializeOwned;

use crate::error::{CommanderError, CommanderResult};

const TEXT_TYP: &str = "text/plain; charset=utf-8";
const JSON_TYP: &str = "application/json; charset=utf-8";

/// Erwartete Art des Request-Bodys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyArt {
    Text,
    Json,
}

impl BodyArt {
    fn medientyp(self) -> &'static str {
        match self {
            Self::Text => "text/plain",
            Self::Json => "application/json",
        }
    }

    fn beispiel(self) -> &'static str {
        match self {
            Self::Text => TEXT_TYP,
            Self::Json => JSON_TYP,
        }
    }
}

/// Prueft den Content-Type Header (Gross-/Kleinschreibung egal)
///
/// Verlangt den Medientyp der `art` und `charset=utf-8`.
pub fn content_type_pruefen(headers: &HeaderMap, art: BodyArt) -> CommanderResult<()> {
    let wert = headers
        .get(header::CONTENT_TYPE)
        .ok_or_else(|| CommanderError::ungueltig("Content-Type header is missing."))?;

    let roh = String::from_utf8_lossy(wert.as_bytes());
    let klein = roh.to_ascii_lowercase();
    if klein.contains(art.medientyp()) && klein.contains("charset=utf-8") {
        Ok(())
    } else {
        Err(CommanderError::ungueltig(format!(
            "Content-Type should be '{}', but it was: {}",
            art.beispiel(),
            roh
        )))
    }
}

/// Liest einen JSON-Objekt-Body in den erwarteten Request-Typ
pub fn json_body<T: DeserializeOwned>(headers: &HeaderMap, body: &str) -> CommanderResult<T> {
    content_type_pruefen(headers, BodyArt::Json)?;

    let wert: serde_json::Value = match serde_json::from_str(body) {
        Ok(wert @ serde_json::Value::Object(_)) => wert,
        _ => {
            return Err(CommanderError::ungueltig(format!(
                "The body is not in a valid JsonObject format. body: {body}"
            )))
        }
    };

    serde_json::from_value(wert).map_err(|e| {
        CommanderError::ungueltig(format!("The body does not have the expected attributes: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use parlor_protocol::control::KanalMitgliedschaftRequest;

    fn headers(content_type: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers
    }

    #[test]
    fn fehlender_content_type() {
        let fehler = content_type_pruefen(&HeaderMap::new(), BodyArt::Text).unwrap_err();
        assert_eq!(fehler.grund(), "Content-Type header is missing.");
    }

    #[test]
    fn content_type_ohne_charset_wird_abgelehnt() {
        let fehler = content_type_pruefen(&headers("text/plain"), BodyArt::Text).unwrap_err();
        assert_eq!(
            fehler.grund(),
            "Content-Type should be 'text/plain; charset=utf-8', but it was: text/plain"
        );
    }

    #[test]
    fn content_type_gross_geschrieben() {
        assert!(content_type_pruefen(&headers("TEXT/PLAIN; Charset=UTF-8"), BodyArt::Text).is_ok());
        assert!(
            content_type_pruefen(&headers("application/json;charset=utf-8"), BodyArt::Json).is_ok()
        );
    }

    #[test]
    fn json_array_ist_kein_objekt() {
        let h = headers("application/json; charset=utf-8");
        let fehler = json_body::<KanalMitgliedschaftRequest>(&h, "[1]").unwrap_err();
        assert_eq!(
            fehler.grund(),
            "The body is not in a valid JsonObject format. body: [1]"
        );
    }

    #[test]
    fn fehlendes_attribut() {
        let h = headers("application/json; charset=utf-8");
        let fehler =
            json_body::<KanalMitgliedschaftRequest>(&h, r#"{"username":"alice"}"#).unwrap_err();
        assert_eq!(fehler.http_status(), 400);
        assert!(fehler.grund().contains("channelName"));
    }

    #[test]
    fn gueltiger_body() {
        let h = headers("application/json; charset=utf-8");
        let req: KanalMitgliedschaftRequest =
            json_body(&h, r#"{"username":"alice","channelName":"lobby"}"#).unwrap();
        assert_eq!(req.channel_name.as_str(), "lobby");
    }
}
