//! idobata CLI client library.
//!
//! Terminal client for the idobata messaging service. The heart of the
//! crate is the conversation reconciler: a deterministic derivation of the
//! chat list from the flat message history plus locally persisted
//! deletion/archive state.

pub mod api;
pub mod error;
pub mod formatter;
pub mod local_store;
pub mod reconciler;
pub mod session;
pub mod state;
pub mod typing;
pub mod ui;
