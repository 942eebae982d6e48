//! Shared library for the idobata messaging service.
//!
//! Code used by both the server and the CLI client:
//! - `logger`: tracing subscriber setup
//! - `time`: clock abstraction and timestamp formatting
//! - `identity`: username normalization and conversation key rules
//! - `protocol`: wire events and records exchanged over WebSocket / HTTP

pub mod identity;
pub mod logger;
pub mod protocol;
pub mod time;
