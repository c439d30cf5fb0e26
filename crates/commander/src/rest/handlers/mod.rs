//! REST-Handler Module

pub mod channels;
pub mod clients;
