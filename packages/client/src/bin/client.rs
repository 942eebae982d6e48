//! idobata CLI chat client.
//!
//! Binds a session for a username, replays previous conversations, and runs
//! an interactive terminal chat.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin idobata-client -- --username Alice
//! cargo run --bin idobata-client -- -u Bob --avatar 🦞 --password hunter2
//! cargo run --bin idobata-client -- -u Carol --password pw --create-account
//! ```

use std::path::PathBuf;

use clap::Parser;

use idobata_client::session::{SessionConfig, run_client_session};
use idobata_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "idobata-client")]
#[command(about = "CLI chat client with presence, groups and history replay", long_about = None)]
struct Args {
    /// Username to bind the session to (a second login evicts the first)
    #[arg(short = 'u', long)]
    username: String,

    /// Avatar glyph shown next to the username
    #[arg(short = 'a', long, default_value = "👤")]
    avatar: String,

    /// WebSocket server URL
    #[arg(long, default_value = "ws://127.0.0.1:8080/ws")]
    ws_url: String,

    /// HTTP API base URL
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    api_url: String,

    /// Directory for per-username local state (filters, group cache)
    #[arg(long, default_value = ".idobata")]
    state_dir: PathBuf,

    /// Log in with this password before binding the session
    #[arg(long)]
    password: Option<String>,

    /// Create the account before logging in (requires --password)
    #[arg(long, requires = "password")]
    create_account: bool,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    let config = SessionConfig {
        ws_url: args.ws_url,
        api_url: args.api_url,
        state_dir: args.state_dir,
        username: args.username,
        avatar: args.avatar,
        password: args.password,
        create_account: args.create_account,
    };

    if let Err(e) = run_client_session(config).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
