//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Haelt beide Registries und die Laufzeit-Konfiguration. Wird als
//! `Arc<SignalingState>` an WebSocket-Handler und Control-Plane verteilt.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

use crate::channels::ChannelRegistry;
use crate::connections::{ConnectionRegistry, SEND_QUEUE_GROESSE};

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Maximale gleichzeitige Verbindungen (0 = unbegrenzt)
    pub max_clients: u32,
    /// Groesse der Send-Queue pro Verbindung
    pub send_queue_groesse: usize,
    /// Keepalive-Intervall in Sekunden
    pub keepalive_sek: u64,
    /// Timeout fuer inaktive Verbindungen in Sekunden
    pub leerlauf_timeout_sek: u64,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            max_clients: 512,
            send_queue_groesse: SEND_QUEUE_GROESSE,
            keepalive_sek: 30,
            leerlauf_timeout_sek: 90,
        }
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
pub struct SignalingState {
    /// Signaling-Konfiguration
    pub config: Arc<SignalingConfig>,
    /// Wer ist mit welcher Verbindung online
    pub verbindungen: ConnectionRegistry,
    /// Voice-Kanaele und ihre Mitglieder
    pub kanaele: ChannelRegistry,
    /// Startzeitpunkt des Servers (fuer Uptime-Berechnung)
    pub start_time: Instant,
    shutdown_tx: watch::Sender<bool>,
}

impl SignalingState {
    /// Erstellt einen neuen SignalingState mit leeren Registries
    pub fn neu(config: SignalingConfig) -> Arc<Self> {
        let (shutdown_tx, _) = watch::channel(false);
        Arc::new(Self {
            verbindungen: ConnectionRegistry::mit_limit(config.max_clients as usize),
            config: Arc::new(config),
            kanaele: ChannelRegistry::neu(),
            start_time: Instant::now(),
            shutdown_tx,
        })
    }

    /// Gibt die Uptime in Sekunden zurueck
    pub fn uptime_sek(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Empfaenger fuer das Shutdown-Signal einer Verbindung
    pub fn shutdown_empfaenger(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Signalisiert allen Verbindungs-Tasks das Herunterfahren
    pub fn herunterfahren(&self) {
        tracing::info!("Signaling wird heruntergefahren");
        self.shutdown_tx.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connections::{ClientSender, Registrierung};
    use parlor_core::types::SessionId;

    #[test]
    fn shutdown_erreicht_spaetere_empfaenger() {
        let state = SignalingState::neu(SignalingConfig::default());
        let rx = state.shutdown_empfaenger();
        assert!(!*rx.borrow());
        state.herunterfahren();
        assert!(*rx.borrow());
        assert!(*state.shutdown_empfaenger().borrow());
    }

    #[test]
    fn max_clients_null_ist_unbegrenzt() {
        let state = SignalingState::neu(SignalingConfig {
            max_clients: 0,
            ..Default::default()
        });
        for i in 0..600 {
            let (sender, _rx) = ClientSender::neu(SessionId::new(), 1);
            let ergebnis = state.verbindungen.registrieren(format!("user{i}").into(), sender);
            assert_eq!(ergebnis, Registrierung::Neu);
        }
        assert_eq!(state.verbindungen.anzahl(), 600);
    }

    #[test]
    fn max_clients_begrenzt_registry() {
        let state = SignalingState::neu(SignalingConfig {
            max_clients: 1,
            ..Default::default()
        });
        let (alice, _rx_alice) = ClientSender::neu(SessionId::new(), 1);
        let (bob, _rx_bob) = ClientSender::neu(SessionId::new(), 1);
        assert_eq!(state.verbindungen.registrieren("alice".into(), alice), Registrierung::Neu);
        assert_eq!(state.verbindungen.registrieren("bob".into(), bob), Registrierung::Abgelehnt);
    }
}
