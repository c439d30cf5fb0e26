//! Prometheus-kompatible Metriken fuer Parlor
//!
//! Registrierte Metriken:
//! - `parlor_connected_clients` – Gauge: Aktuell verbundene Clients
//! - `parlor_voice_channels` – Gauge: Existierende Voice-Kanaele
//! - `parlor_channel_members` – Gauge: User die einem Kanal zugeordnet sind
//! - `parlor_http_requests_total` – Counter: HTTP-Anfragen (method, path, status)
//! - `parlor_http_request_duration_seconds` – Histogram: HTTP-Antwortzeit

use anyhow::Result;
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Alle Parlor-Prometheus-Metriken
#[derive(Clone)]
pub struct ParlorMetrics {
    pub registry: Arc<Registry>,

    // Zustands-Metriken
    pub connected_clients: IntGauge,
    pub voice_channels: IntGauge,
    pub channel_members: IntGauge,

    // HTTP-Metriken
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,
}

impl ParlorMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        // --- Zustands-Metriken ---
        let connected_clients = IntGauge::with_opts(Opts::new(
            "parlor_connected_clients",
            "Anzahl aktuell verbundener Clients",
        ))?;
        registry.register(Box::new(connected_clients.clone()))?;

        let voice_channels = IntGauge::with_opts(Opts::new(
            "parlor_voice_channels",
            "Anzahl existierender Voice-Kanaele",
        ))?;
        registry.register(Box::new(voice_channels.clone()))?;

        let channel_members = IntGauge::with_opts(Opts::new(
            "parlor_channel_members",
            "Anzahl User in einem Voice-Kanal",
        ))?;
        registry.register(Box::new(channel_members.clone()))?;

        // --- HTTP-Metriken ---
        let http_requests_total = IntCounterVec::new(
            Opts::new("parlor_http_requests_total", "Gesamtanzahl HTTP-Anfragen"),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "parlor_http_request_duration_seconds",
                "HTTP-Antwortzeit in Sekunden",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
            ]),
            &["method", "path"],
        )?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            connected_clients,
            voice_channels,
            channel_members,
            http_requests_total,
            http_request_duration_seconds,
        })
    }

    /// Uebernimmt eine Momentaufnahme der Registries
    pub fn zustand_setzen(&self, verbunden: usize, kanaele: usize, mitglieder: usize) {
        self.connected_clients.set(verbunden as i64);
        self.voice_channels.set(kanaele as i64);
        self.channel_members.set(mitglieder as i64);
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: ParlorMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<ParlorMetrics>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            axum::http::StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
