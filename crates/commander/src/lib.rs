//! parlor-commander – HTTP-Control-Plane fuer Parlor
//!
//! Verwaltungs-Endpunkte fuer Voice-Kanaele und Presence. Die Handler
//! pruefen Content-Type und Body, rufen die Registries aus
//! `parlor-signaling` auf und uebersetzen deren Status in HTTP-Antworten.
//!
//! | Status            | HTTP |
//! |-------------------|------|
//! | Erfolg            | 201 / 204 / 200 |
//! | Konflikt          | 409 |
//! | Nicht gefunden    | 404 |
//! | Falscher Zustand  | 400 |
//! | Ungueltige Eingabe| 400 |

pub mod error;
pub mod rest;

pub use error::{CommanderError, CommanderResult};
pub use rest::{rest_router, RestServerKonfig};
