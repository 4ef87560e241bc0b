//! Client core for the Mingle chat-with-documents backend.
//!
//! The interesting parts are [`connection::ChatConnection`] (one live
//! WebSocket per selected chat, reconciling the message log against local
//! sends and server-pushed frames) and the [`mention`]/[`composer`] pair
//! driving `@name` autocomplete in the compose box. Everything else is the
//! REST surface and wiring around them.

pub mod api;
pub mod composer;
pub mod config;
pub mod connection;
pub mod error;
pub mod mention;
pub mod messages;
pub mod session;
pub mod transcript;
