//! Wire types for the HTTP and WebSocket surfaces.

pub mod game;
pub mod health;
pub mod validation;
pub mod ws;
