//! parlor-signaling – WebSocket-Signaling und Presence
//!
//! Dieser Crate haelt den gesamten Laufzeitzustand von Parlor: wer online
//! ist, welche Voice-Kanaele existieren und wer in welchem Kanal sitzt.
//! Jede Zustandsaenderung wird als Event an alle Verbindungen verteilt.
//!
//! ## Architektur
//!
//! ```text
//! GET /connect?username=  (ws_router)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task, Writer-Task fuer den Sink)
//!     |
//!     v
//! MessageDispatcher  – "audio data" weiterleiten, Rest verwerfen
//!
//! ConnectionRegistry – Username <-> Session, Fan-out
//! ChannelRegistry    – Kanal <-> Mitglieder, Join/Leave/Switch
//! ```
//!
//! Die Control-Plane (`parlor-commander`) arbeitet auf demselben
//! [`SignalingState`].

pub mod channels;
pub mod connection;
pub mod connections;
pub mod dispatcher;
pub mod error;
pub mod server_state;
pub mod ws;

// Bequeme Re-Exporte
pub use channels::{Beitritt, ChannelRegistry};
pub use connection::ClientConnection;
pub use connections::{ClientSender, ConnectionRegistry, Registrierung};
pub use dispatcher::{MessageDispatcher, Verarbeitung};
pub use error::{KanalFehler, SignalingError, SignalingResult};
pub use server_state::{SignalingConfig, SignalingState};
pub use ws::ws_router;
