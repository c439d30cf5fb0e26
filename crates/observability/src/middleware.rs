//! Request-Metriken Middleware fuer Axum
//!
//! Misst die Antwortzeit jeder HTTP-Anfrage, zaehlt sie in den
//! Prometheus-Metriken und protokolliert sie als strukturiertes Log-Event.

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{Request, Response},
    middleware::Next,
};
use std::time::Instant;

use crate::metrics::ParlorMetrics;

/// Label fuer Anfragen ohne passende Route
const UNBEKANNTER_PFAD: &str = "unbekannt";

/// Axum-Middleware-Funktion: misst Antwortzeit und zaehlt Anfragen.
///
/// Als Label dient die Route (nicht der konkrete Pfad), damit die Anzahl
/// der Zeitreihen begrenzt bleibt.
///
/// Verwendung:
/// ```ignore
/// Router::new()
///     .route("/", get(handler))
///     .route_layer(axum::middleware::from_fn_with_state(metriken, http_metriken))
/// ```
pub async fn http_metriken(
    State(metriken): State<ParlorMetrics>,
    req: Request<Body>,
    next: Next,
) -> Response<Body> {
    let methode = req.method().to_string();
    let pfad = route_label(req.extensions().get::<MatchedPath>());
    let start = Instant::now();

    let response = next.run(req).await;

    let dauer = start.elapsed();
    let status = response.status().as_u16().to_string();

    metriken
        .http_requests_total
        .with_label_values(&[methode.as_str(), pfad.as_str(), status.as_str()])
        .inc();
    metriken
        .http_request_duration_seconds
        .with_label_values(&[methode.as_str(), pfad.as_str()])
        .observe(dauer.as_secs_f64());

    tracing::debug!(
        method = %methode,
        path = %pfad,
        status = %status,
        duration_ms = dauer.as_millis(),
        "HTTP-Anfrage abgeschlossen"
    );

    response
}

fn route_label(pfad: Option<&MatchedPath>) -> String {
    pfad.map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNBEKANNTER_PFAD.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::get, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn anfrage_wird_gezaehlt() {
        let metriken = ParlorMetrics::neu().unwrap();
        let app = Router::new()
            .route("/voiceChannels", get(|| async { "ok" }))
            .route_layer(middleware::from_fn_with_state(metriken.clone(), http_metriken));

        let request = Request::builder()
            .uri("/voiceChannels")
            .body(Body::empty())
            .unwrap();
        let antwort = app.oneshot(request).await.unwrap();
        assert_eq!(antwort.status(), 200);

        let wert = metriken
            .http_requests_total
            .with_label_values(&["GET", "/voiceChannels", "200"])
            .get();
        assert_eq!(wert, 1);
    }

    #[test]
    fn fehlende_route_hat_eigenes_label() {
        assert_eq!(route_label(None), UNBEKANNTER_PFAD);
    }
}
