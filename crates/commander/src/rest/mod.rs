//! REST-Interface des Parlor Commanders

pub mod handlers;
pub mod inhalt;
pub mod routes;
pub mod server;

pub use server::{rest_router, RestServerKonfig};
