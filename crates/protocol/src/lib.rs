//! parlor-protocol – Nachrichtenformate
//!
//! - [`event`]: Events die ueber die WebSocket-Verbindung laufen
//!   (Server -> Client Broadcasts, Client -> Server Nachrichten)
//! - [`control`]: Request- und Response-Bodies der HTTP-Control-Plane

pub mod control;
pub mod event;

pub use control::{ChannelInfo, ChannelListResponse, FehlerAntwort, OnlineUsersResponse};
pub use event::{ClientMessage, NachrichtFehler, ServerEvent};
