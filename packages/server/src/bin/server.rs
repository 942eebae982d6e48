//! idobata messaging server.
//!
//! Presence and message routing over WebSocket, with JSON file persistence
//! and an HTTP bulk read API for history replay.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin idobata-server
//! cargo run --bin idobata-server -- --host 0.0.0.0 --port 3000 --data-dir ./data
//! ```

use std::{path::PathBuf, sync::Arc};

use clap::Parser;

use idobata_server::{
    domain::{GroupIdFactory, MessageIdFactory},
    infrastructure::{pusher::WebSocketMessagePusher, store::JsonChatStore},
    registry::{RoomDirectory, SessionRegistry},
    ui::{AppState, Server},
    usecase::{
        ConnectSessionUseCase, CreateGroupUseCase, DisconnectSessionUseCase, GetGroupsUseCase,
        GetMessagesUseCase, GetUsersUseCase, JoinGroupUseCase, LoginUseCase, PresenceNotifier,
        RegisterUserUseCase, SendDirectMessageUseCase, SendGroupMessageUseCase, TypingUseCase,
    },
};
use idobata_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "idobata-server")]
#[command(about = "Real-time messaging server with presence and group rooms", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Directory holding users.json / messages.json / groups.json
    #[arg(short = 'd', long, default_value = "data")]
    data_dir: PathBuf,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    // Initialize dependencies in order:
    // 1. Store
    // 2. Registries + MessagePusher
    // 3. UseCases
    // 4. Server

    // 1. Open the JSON file store
    let store = match JsonChatStore::open(&args.data_dir).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!("Failed to open data directory: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!("Data directory: {}", args.data_dir.display());

    // 2. Shared runtime state
    let registry = Arc::new(SessionRegistry::new());
    let rooms = Arc::new(RoomDirectory::new());
    let message_pusher = Arc::new(WebSocketMessagePusher::new());
    let clock = Arc::new(SystemClock);
    let message_ids = Arc::new(MessageIdFactory::new());
    let group_ids = Arc::new(GroupIdFactory::new());
    let presence = Arc::new(PresenceNotifier::new(
        Arc::clone(&registry),
        message_pusher.clone() as _,
    ));

    // 3. UseCases
    let state = AppState {
        message_pusher: message_pusher.clone() as _,
        register_user_usecase: Arc::new(RegisterUserUseCase::new(
            store.clone() as _,
            clock.clone() as _,
        )),
        login_usecase: Arc::new(LoginUseCase::new(store.clone() as _)),
        connect_session_usecase: Arc::new(ConnectSessionUseCase::new(
            Arc::clone(&registry),
            store.clone() as _,
            Arc::clone(&presence),
            clock.clone() as _,
        )),
        disconnect_session_usecase: Arc::new(DisconnectSessionUseCase::new(
            Arc::clone(&registry),
            Arc::clone(&rooms),
            store.clone() as _,
            message_pusher.clone() as _,
            Arc::clone(&presence),
            clock.clone() as _,
        )),
        send_direct_message_usecase: Arc::new(SendDirectMessageUseCase::new(
            Arc::clone(&registry),
            store.clone() as _,
            message_pusher.clone() as _,
            Arc::clone(&message_ids),
            clock.clone() as _,
        )),
        send_group_message_usecase: Arc::new(SendGroupMessageUseCase::new(
            Arc::clone(&rooms),
            store.clone() as _,
            message_pusher.clone() as _,
            Arc::clone(&message_ids),
            clock.clone() as _,
        )),
        create_group_usecase: Arc::new(CreateGroupUseCase::new(
            Arc::clone(&registry),
            Arc::clone(&rooms),
            store.clone() as _,
            message_pusher.clone() as _,
            Arc::clone(&group_ids),
            clock.clone() as _,
        )),
        join_group_usecase: Arc::new(JoinGroupUseCase::new(Arc::clone(&rooms))),
        typing_usecase: Arc::new(TypingUseCase::new(
            Arc::clone(&registry),
            Arc::clone(&rooms),
            message_pusher.clone() as _,
        )),
        get_users_usecase: Arc::new(GetUsersUseCase::new(store.clone() as _)),
        get_groups_usecase: Arc::new(GetGroupsUseCase::new(store.clone() as _)),
        get_messages_usecase: Arc::new(GetMessagesUseCase::new(store.clone() as _)),
    };

    // 4. Create and run the server
    let server = Server::new(state);
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
