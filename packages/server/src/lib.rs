//! idobata server library.
//!
//! Presence and message-routing engine for the idobata messaging service:
//! session registry, group directory, message router and the durable JSON
//! store behind them, exposed over an Axum WebSocket + HTTP surface.

// layers
pub mod domain;
pub mod infrastructure;
pub mod registry;
pub mod ui;
pub mod usecase;
