//! Pong Server - authoritative two-player pong engine
//!
//! The library holds the simulation, the match registry and lifecycle,
//! the wire protocol, the connection hub, match history persistence and
//! a client-side predictor. `main.rs` wires them behind axum.

pub mod app;
pub mod client;
pub mod config;
pub mod game;
pub mod http;
pub mod messaging;
pub mod store;
pub mod util;
pub mod ws;
