//! parlor-server – Bibliotheks-Root
//!
//! Setzt die Crates zu einem lauffaehigen Server zusammen und stellt den
//! Einstiegspunkt fuer Integrationstests bereit.
//!
//! ## Listener
//! - `netzwerk.port`: Control-Plane (HTTP) und `/connect` (WebSocket)
//! - `observability.port`: `/metrics` und `/health` (optional)

pub mod config;

use anyhow::{Context, Result};
use axum::Router;
use config::ServerConfig;
use parlor_commander::{rest_router, RestServerKonfig};
use parlor_observability::{
    http_metriken, observability_server_starten, HealthState, ParlorMetrics,
};
use parlor_signaling::{ws_router, SignalingState};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

/// Baut den Router fuer den Haupt-Listener
///
/// Control-Plane und WebSocket teilen sich denselben `SignalingState`.
/// HTTP-Metriken werden nur fuer die Control-Plane erfasst.
pub fn router(
    state: Arc<SignalingState>,
    metriken: &ParlorMetrics,
    rest: &RestServerKonfig,
) -> Router {
    rest_router(Arc::clone(&state), rest)
        .route_layer(axum::middleware::from_fn_with_state(
            metriken.clone(),
            http_metriken,
        ))
        .merge(ws_router(state))
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Bindet den Haupt-Listener und laeuft bis Ctrl-C
    pub async fn starten(self) -> Result<()> {
        let adresse = self.config.bind_adresse();
        let listener = TcpListener::bind(&adresse)
            .await
            .with_context(|| format!("Bind auf {adresse} fehlgeschlagen"))?;

        self.starten_mit(listener, ctrl_c()).await
    }

    /// Startet alle Subsysteme auf einem bereits gebundenen Listener
    ///
    /// Reihenfolge:
    /// 1. Registries und Metriken anlegen
    /// 2. Observability-Server und Gauge-Aktualisierung starten
    /// 3. HTTP/WebSocket bedienen bis `shutdown` abgeschlossen ist
    /// 4. Verbindungen schliessen, auf Hintergrund-Tasks warten
    pub async fn starten_mit(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let state = SignalingState::neu(self.config.signaling_config());
        let metriken = ParlorMetrics::neu()?;
        let health = HealthState::neu();
        let (stop_tx, stop_rx) = watch::channel(false);

        let lokale_addr = listener.local_addr()?;
        tracing::info!(
            server_name = %self.config.server.name,
            adresse = %lokale_addr,
            max_clients = self.config.server.max_clients,
            "Server startet"
        );

        let mut hintergrund = Vec::new();

        if self.config.observability.aktiviert {
            let addr: SocketAddr = self
                .config
                .observability_bind_adresse()
                .parse()
                .context("Ungueltige Observability-Adresse")?;
            let stop = warten_auf_stop(stop_rx.clone());
            let (m, h) = (metriken.clone(), health.clone());
            hintergrund.push(tokio::spawn(async move {
                if let Err(e) = observability_server_starten(addr, m, h, stop).await {
                    tracing::error!(fehler = %e, "Observability-Server beendet");
                }
            }));
        }

        hintergrund.push(tokio::spawn(gauges_aktualisieren(
            Arc::clone(&state),
            metriken.clone(),
            Duration::from_secs(self.config.observability.aktualisierung_sek.max(1)),
            stop_rx,
        )));

        let app = router(Arc::clone(&state), &metriken, &self.config.rest_konfig());

        let shutdown_state = Arc::clone(&state);
        let shutdown_health = health.clone();
        let ergebnis = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
                shutdown_health.herunterfahren_melden();
                shutdown_state.herunterfahren();
            })
            .await;

        stop_tx.send_replace(true);
        for task in hintergrund {
            if let Err(e) = task.await {
                tracing::warn!(fehler = %e, "Hintergrund-Task abgebrochen");
            }
        }

        ergebnis.context("HTTP-Server abgebrochen")?;
        tracing::info!(uptime_sek = state.uptime_sek(), "Server beendet");
        Ok(())
    }
}

/// Uebertraegt den Registry-Zustand periodisch in die Gauges
async fn gauges_aktualisieren(
    state: Arc<SignalingState>,
    metriken: ParlorMetrics,
    intervall: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut takt = tokio::time::interval(intervall);
    loop {
        tokio::select! {
            _ = takt.tick() => {
                metriken.zustand_setzen(
                    state.verbindungen.anzahl(),
                    state.kanaele.kanal_anzahl(),
                    state.kanaele.mitglieder_anzahl(),
                );
            }
            Ok(()) = stop_rx.changed() => {
                if *stop_rx.borrow() {
                    break;
                }
            }
        }
    }
}

async fn warten_auf_stop(mut stop_rx: watch::Receiver<bool>) {
    while !*stop_rx.borrow() {
        if stop_rx.changed().await.is_err() {
            return;
        }
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(fehler = %e, "Ctrl-C-Handler konnte nicht installiert werden");
        std::future::pending::<()>().await;
    }
}
