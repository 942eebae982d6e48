//! UI 層（WebSocket / HTTP の受け口）

mod handler;
mod server;
mod signal;
mod state;

pub use server::Server;
pub use state::AppState;
