//! Axum-Router der Control-Plane mit CORS und Request-Tracing

use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::Router;
use parlor_signaling::SignalingState;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::rest::routes::control_router;

/// REST-Konfiguration
#[derive(Debug, Clone, Default)]
pub struct RestServerKonfig {
    /// Erlaubte CORS-Origins. Leer = alle Origins erlaubt (nur fuer Entwicklung).
    pub cors_origins: Vec<String>,
}

impl RestServerKonfig {
    fn cors_layer(&self) -> CorsLayer {
        if self.cors_origins.is_empty() {
            return CorsLayer::permissive();
        }

        let origins: Vec<HeaderValue> = self
            .cors_origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(wert) => Some(wert),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ungueltiger CORS-Origin ignoriert");
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(tower_http::cors::Any)
    }
}

/// Baut den fertigen Control-Plane-Router
///
/// Der Aufrufer bindet den Listener; der WebSocket-Endpunkt wird in
/// `parlor-server` auf denselben Listener gelegt.
pub fn rest_router(state: Arc<SignalingState>, konfig: &RestServerKonfig) -> Router {
    control_router()
        .layer(TraceLayer::new_for_http())
        .layer(konfig.cors_layer())
        .with_state(state)
}
