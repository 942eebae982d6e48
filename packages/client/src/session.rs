//! WebSocket client session management.
//!
//! Connects, optionally authenticates, binds the session with `register`,
//! replays previous conversations through the reconciler, then runs the
//! interactive loop: a read task applying server events to the shared
//! state, a write task draining outbound events, and a command loop fed by
//! a rustyline thread.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Instant,
};

use futures_util::{SinkExt, StreamExt};
use idobata_shared::{
    identity::same_user,
    protocol::{ClientEvent, MessageRecord, ServerEvent},
};
use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message};

use crate::{
    api::ApiClient,
    error::ClientError,
    formatter::MessageFormatter,
    local_store::LocalStateStore,
    reconciler::{self, apply_live_direct, apply_live_group, build_chat_list},
    state::{ChatTarget, ClientState},
    typing::TypingTracker,
    ui::redisplay_prompt,
};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Session parameters resolved from the command line.
pub struct SessionConfig {
    /// e.g. "ws://127.0.0.1:8080/ws"
    pub ws_url: String,
    /// e.g. "http://127.0.0.1:8080"
    pub api_url: String,
    /// Root of the per-username local state directory
    pub state_dir: PathBuf,
    pub username: String,
    pub avatar: String,
    /// When set, log in (or create the account) before binding the session
    pub password: Option<String>,
    pub create_account: bool,
}

/// Run the client session until the user quits or the connection drops.
pub async fn run_client_session(config: SessionConfig) -> Result<(), ClientError> {
    let (mut ws, _response) = connect_async(&config.ws_url)
        .await
        .map_err(|e| ClientError::Connection(e.to_string()))?;
    tracing::info!("Connected to {}", config.ws_url);

    // Optional account handshake before binding the session.
    let (username, avatar) = match &config.password {
        Some(password) => {
            authenticate(
                &mut ws,
                &config.username,
                password,
                &config.avatar,
                config.create_account,
            )
            .await?
        }
        None => (config.username.clone(), config.avatar.clone()),
    };

    let local = Arc::new(LocalStateStore::new(&config.state_dir));
    let filters = local.load_filters(&username);
    let state = Arc::new(Mutex::new(ClientState::new(
        username.clone(),
        avatar.clone(),
        filters,
    )));
    let api = Arc::new(ApiClient::new(&config.api_url));

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ClientEvent>();

    // Bind this connection to the username; evicts any prior login.
    out_tx
        .send(ClientEvent::Register {
            username: username.clone(),
            avatar: avatar.clone(),
        })
        .ok();

    println!(
        "\nYou are '{}'. Type /help for commands, Ctrl+C to exit.\n",
        username
    );

    let (mut ws_write, mut ws_read) = ws.split();

    // Drain outbound events into the socket
    let mut write_task = tokio::spawn(async move {
        while let Some(event) = out_rx.recv().await {
            if ws_write
                .send(Message::Text(event.to_json().into()))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    // Apply server events to the shared state
    let read_state = Arc::clone(&state);
    let read_local = Arc::clone(&local);
    let read_api = Arc::clone(&api);
    let read_out = out_tx.clone();
    let mut read_task = tokio::spawn(async move {
        while let Some(message) = ws_read.next().await {
            match message {
                Ok(Message::Text(text)) => match serde_json::from_str::<ServerEvent>(&text) {
                    Ok(event) => {
                        handle_server_event(&read_state, &read_local, &read_api, &read_out, event)
                            .await;
                    }
                    Err(e) => tracing::warn!("Unparseable server event: {}", e),
                },
                Ok(Message::Close(_)) => {
                    tracing::info!("Server closed the connection");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    break;
                }
            }
        }
    });

    // Feed rustyline input into the command loop
    let (input_tx, input_rx) = mpsc::unbounded_channel::<String>();
    let prompt_name = username.clone();
    let _readline_handle = std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };
        let prompt = format!("{}> ", prompt_name);
        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim().to_string();
                    if !line.is_empty() {
                        rl.add_history_entry(&line).ok();
                        if input_tx.send(line).is_err() {
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => {
                    tracing::error!("Readline error: {}", e);
                    break;
                }
            }
        }
    });

    let command_state = Arc::clone(&state);
    let command_result = tokio::select! {
        _ = &mut read_task => {
            write_task.abort();
            Err(ClientError::Connection("Connection lost".to_string()))
        }
        _ = command_loop(command_state, Arc::clone(&local), Arc::clone(&api), out_tx, input_rx) => {
            read_task.abort();
            write_task.abort();
            Ok(())
        }
    };

    command_result
}

/// Log in (optionally creating the account first) before session binding.
async fn authenticate(
    ws: &mut WsStream,
    username: &str,
    password: &str,
    avatar: &str,
    create_account: bool,
) -> Result<(String, String), ClientError> {
    if create_account {
        let event = ClientEvent::RegisterUser {
            username: username.to_string(),
            password: password.to_string(),
            avatar: Some(avatar.to_string()),
        };
        ws.send(Message::Text(event.to_json().into()))
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        match wait_for_ack(ws).await? {
            ServerEvent::RegisterResponse { success, message } => {
                if !success {
                    return Err(ClientError::LoginRejected(message));
                }
                println!("{message}");
            }
            other => tracing::warn!("Unexpected ack during registration: {:?}", other),
        }
    }

    let event = ClientEvent::LoginUser {
        username: username.to_string(),
        password: password.to_string(),
    };
    ws.send(Message::Text(event.to_json().into()))
        .await
        .map_err(|e| ClientError::Connection(e.to_string()))?;
    match wait_for_ack(ws).await? {
        ServerEvent::LoginResponse {
            success,
            username: confirmed,
            avatar: confirmed_avatar,
            message,
        } => {
            if !success {
                return Err(ClientError::LoginRejected(message));
            }
            Ok((
                confirmed.unwrap_or_else(|| username.to_string()),
                confirmed_avatar.unwrap_or_else(|| avatar.to_string()),
            ))
        }
        other => {
            tracing::warn!("Unexpected ack during login: {:?}", other);
            Ok((username.to_string(), avatar.to_string()))
        }
    }
}

/// Read frames until one parses as a server event.
async fn wait_for_ack(ws: &mut WsStream) -> Result<ServerEvent, ClientError> {
    while let Some(message) = ws.next().await {
        match message {
            Ok(Message::Text(text)) => {
                if let Ok(event) = serde_json::from_str::<ServerEvent>(&text) {
                    return Ok(event);
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => return Err(ClientError::Connection(e.to_string())),
        }
    }
    Err(ClientError::Connection(
        "Connection closed during handshake".to_string(),
    ))
}

/// Apply one server event to the client state.
async fn handle_server_event(
    state: &Arc<Mutex<ClientState>>,
    local: &Arc<LocalStateStore>,
    api: &Arc<ApiClient>,
    out: &mpsc::UnboundedSender<ClientEvent>,
    event: ServerEvent,
) {
    match event {
        ServerEvent::Registered { success, .. } => {
            if success {
                tracing::info!("Session registered");
                load_previous_chats(state, local, api, out).await;
                out.send(ClientEvent::GetUsers).ok();
            }
        }

        ServerEvent::UsersList { users } => {
            let mut st = state.lock().unwrap();
            let me = st.username.clone();
            st.presence = users
                .into_iter()
                .filter(|u| u.online && !same_user(&u.username, &me))
                .collect();
        }

        ServerEvent::UserConnected { user } => {
            let mut st = state.lock().unwrap();
            if !same_user(&user.username, &st.username) {
                print!("{}", MessageFormatter::format_user_connected(&user));
                st.upsert_presence(user);
                redisplay_prompt(&st.username);
            }
        }

        ServerEvent::UserDisconnected { username, .. } => {
            let mut st = state.lock().unwrap();
            st.remove_presence(&username);
            print!("{}", MessageFormatter::format_user_disconnected(&username));
            redisplay_prompt(&st.username);
        }

        ServerEvent::ReceiveMessage { message } => {
            handle_inbound_direct(state, local, &message);
        }

        ServerEvent::MessageSent { message } => {
            // Own send ack: refresh the list entry, never revive a delete.
            let mut st = state.lock().unwrap();
            let me = st.username.clone();
            if let Some(key) = reconciler::counterpart_of(&message, &me)
                && !st.filters.is_deleted(&key)
            {
                let ClientState {
                    chats,
                    filters,
                    presence,
                    ..
                } = &mut *st;
                apply_live_direct(chats, filters, &message, &me, presence);
            }
        }

        ServerEvent::GroupCreated { group } => {
            let mut st = state.lock().unwrap();
            println!("\nGroup \"{}\" created", group.name);
            if let Err(e) = local.save_group(&st.username, &group) {
                tracing::warn!("Failed to cache group: {}", e);
            }
            out.send(ClientEvent::JoinGroup {
                group_id: group.id.clone(),
            })
            .ok();
            let entries = reconciler::group_entries(
                std::slice::from_ref(&group),
                &st.filters,
                &st.username,
            );
            if let Some(entry) = entries.into_iter().next()
                && !st.chats.iter().any(|e| e.key == entry.key)
            {
                st.chats.insert(0, entry);
            }
            st.upsert_group(group);
            redisplay_prompt(&st.username);
        }

        ServerEvent::NewGroup { group } => {
            let mut st = state.lock().unwrap();
            print!("{}", MessageFormatter::format_new_group(&group));
            if let Err(e) = local.save_group(&st.username, &group) {
                tracing::warn!("Failed to cache group: {}", e);
            }
            out.send(ClientEvent::JoinGroup {
                group_id: group.id.clone(),
            })
            .ok();
            let entries = reconciler::group_entries(
                std::slice::from_ref(&group),
                &st.filters,
                &st.username,
            );
            if let Some(entry) = entries.into_iter().next()
                && !st.chats.iter().any(|e| e.key == entry.key)
            {
                st.chats.insert(0, entry);
            }
            st.upsert_group(group);
            redisplay_prompt(&st.username);
        }

        ServerEvent::ReceiveGroupMessage { message } => {
            handle_inbound_group(state, local, &message);
        }

        ServerEvent::UserTyping { from, .. } => {
            let st = state.lock().unwrap();
            if current_chat_involves(&st, &from) {
                print!("{}", MessageFormatter::format_typing(&from));
                redisplay_prompt(&st.username);
            }
        }

        ServerEvent::UserStopTyping { .. } => {}

        // Handshake acks are handled before the session loop starts.
        ServerEvent::RegisterResponse { .. }
        | ServerEvent::LoginResponse { .. }
        | ServerEvent::GroupError { .. } => {
            if let ServerEvent::GroupError { message } = event {
                println!("\n! {message}");
                let st = state.lock().unwrap();
                redisplay_prompt(&st.username);
            }
        }
    }
}

fn handle_inbound_direct(
    state: &Arc<Mutex<ClientState>>,
    local: &Arc<LocalStateStore>,
    message: &MessageRecord,
) {
    let mut st = state.lock().unwrap();
    let me = st.username.clone();

    let ClientState {
        chats,
        filters,
        presence,
        ..
    } = &mut *st;
    let update = apply_live_direct(chats, filters, message, &me, presence);

    if update.revived {
        tracing::info!("Conversation with '{}' revived", message.from_username);
        if let Err(e) = local.save_filters(&me, &st.filters) {
            tracing::warn!("Failed to persist chat filters: {}", e);
        }
    }

    let is_open = matches!(
        &st.current_chat,
        Some(ChatTarget::Direct { username }) if same_user(username, &message.from_username)
    );
    if is_open {
        print!("{}", MessageFormatter::format_message(message, false, false));
    } else if update.listed {
        println!("\nNew message from {}", message.from_username);
    }
    redisplay_prompt(&st.username);
}

fn handle_inbound_group(
    state: &Arc<Mutex<ClientState>>,
    local: &Arc<LocalStateStore>,
    message: &MessageRecord,
) {
    let mut st = state.lock().unwrap();
    let me = st.username.clone();

    let ClientState {
        chats,
        filters,
        groups,
        ..
    } = &mut *st;
    let update = apply_live_group(chats, filters, message, groups);

    if update.revived
        && let Err(e) = local.save_filters(&me, &st.filters)
    {
        tracing::warn!("Failed to persist chat filters: {}", e);
    }

    let is_open = matches!(
        (&st.current_chat, message.group_id.as_deref()),
        (Some(ChatTarget::Group { id, .. }), Some(group_id)) if id == group_id
    );
    if is_open {
        let own = same_user(&message.from_username, &st.username);
        print!("{}", MessageFormatter::format_message(message, own, true));
        redisplay_prompt(&st.username);
    }
}

fn current_chat_involves(st: &ClientState, from: &str) -> bool {
    match &st.current_chat {
        Some(ChatTarget::Direct { username }) => same_user(username, from),
        Some(ChatTarget::Group { .. }) => true,
        None => false,
    }
}

/// Rebuild the chat list from history and the local group cache on login.
async fn load_previous_chats(
    state: &Arc<Mutex<ClientState>>,
    local: &Arc<LocalStateStore>,
    api: &Arc<ApiClient>,
    out: &mpsc::UnboundedSender<ClientEvent>,
) {
    let username = state.lock().unwrap().username.clone();

    let log = match api.fetch_user_messages(&username).await {
        Ok(log) => log,
        Err(e) => {
            tracing::warn!("Failed to fetch message history: {}", e);
            Vec::new()
        }
    };

    let cached_groups = local.load_groups(&username);

    let mut st = state.lock().unwrap();
    let mut chats = build_chat_list(&log, &st.filters, &username, &st.presence);

    // Cached group replay: membership is checked case-insensitively, the
    // room is re-joined, and the entry appears below the direct chats.
    for group in reconciler::groups_to_rejoin(&cached_groups, &st.filters, &username) {
        out.send(ClientEvent::JoinGroup {
            group_id: group.id.clone(),
        })
        .ok();
    }
    chats.extend(reconciler::group_entries(&cached_groups, &st.filters, &username));
    for group in cached_groups {
        st.upsert_group(group);
    }

    st.chats = chats;
    print!("{}", MessageFormatter::format_chat_list(&st.chats));
    redisplay_prompt(&st.username);
}

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Users,
    Chats,
    Open(String),
    OpenGroup(String),
    CreateGroup { name: String, members: Vec<String> },
    Delete(String),
    Archive(String),
    Say(String),
    Quit,
}

/// Parse one input line into a command. Unknown slash commands fall back to
/// help; anything else is a message for the open conversation.
pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if !line.starts_with('/') {
        return Some(Command::Say(line.to_string()));
    }

    let (name, rest) = match line.split_once(' ') {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };

    match name {
        "/help" => Some(Command::Help),
        "/users" => Some(Command::Users),
        "/chats" => Some(Command::Chats),
        "/quit" | "/exit" => Some(Command::Quit),
        "/open" if !rest.is_empty() => Some(Command::Open(rest.to_string())),
        "/opengroup" if !rest.is_empty() => Some(Command::OpenGroup(rest.to_string())),
        "/delete" if !rest.is_empty() => Some(Command::Delete(rest.to_string())),
        "/archive" if !rest.is_empty() => Some(Command::Archive(rest.to_string())),
        "/group" => {
            let (group_name, members) = rest.split_once(' ')?;
            let members: Vec<String> = members
                .split(',')
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect();
            Some(Command::CreateGroup {
                name: group_name.to_string(),
                members,
            })
        }
        _ => Some(Command::Help),
    }
}

const HELP_TEXT: &str = "\
Commands:
  /users                     list online users
  /chats                     show the chat list
  /open <username>           open a direct conversation
  /opengroup <group id>      open a group conversation
  /group <name> <a,b,c>      create a group with members
  /delete <key>              delete a conversation from the list
  /archive <key>             archive a conversation
  /quit                      exit
Anything else is sent to the open conversation.
";

/// Interactive command loop; also owns the typing auto-stop timer.
async fn command_loop(
    state: Arc<Mutex<ClientState>>,
    local: Arc<LocalStateStore>,
    api: Arc<ApiClient>,
    out: mpsc::UnboundedSender<ClientEvent>,
    mut input_rx: mpsc::UnboundedReceiver<String>,
) {
    let mut tracker = TypingTracker::new();
    let mut typing_target: Option<(String, bool)> = None;

    loop {
        let deadline = tracker
            .deadline()
            .map(tokio::time::Instant::from_std);

        tokio::select! {
            maybe_line = input_rx.recv() => {
                let Some(line) = maybe_line else { break };
                let Some(command) = parse_command(&line) else { continue };
                if let Command::Quit = command {
                    break;
                }
                handle_command(
                    &state,
                    &local,
                    &api,
                    &out,
                    &mut tracker,
                    &mut typing_target,
                    command,
                )
                .await;
            }
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(tokio::time::Instant::now)),
                if deadline.is_some() =>
            {
                if tracker.poll_expired(Instant::now())
                    && let Some((to, is_group)) = typing_target.clone()
                {
                    let from = state.lock().unwrap().username.clone();
                    out.send(ClientEvent::StopTyping { to, from, is_group }).ok();
                }
            }
        }
    }
}

async fn handle_command(
    state: &Arc<Mutex<ClientState>>,
    local: &Arc<LocalStateStore>,
    api: &Arc<ApiClient>,
    out: &mpsc::UnboundedSender<ClientEvent>,
    tracker: &mut TypingTracker,
    typing_target: &mut Option<(String, bool)>,
    command: Command,
) {
    match command {
        // Quit never reaches here; the command loop intercepts it.
        Command::Quit => {}

        Command::Help => println!("{HELP_TEXT}"),

        Command::Users => {
            let st = state.lock().unwrap();
            print!("{}", MessageFormatter::format_users(&st.presence));
        }

        Command::Chats => {
            let st = state.lock().unwrap();
            print!("{}", MessageFormatter::format_chat_list(&st.chats));
        }

        Command::Open(counterpart) => {
            let me = {
                let mut st = state.lock().unwrap();
                st.current_chat = Some(ChatTarget::Direct {
                    username: counterpart.clone(),
                });
                st.username.clone()
            };
            match api.fetch_conversation(&counterpart, &me).await {
                Ok(history) => {
                    println!("\n--- {counterpart} ---");
                    for message in &history {
                        let own = same_user(&message.from_username, &me);
                        print!("{}", MessageFormatter::format_message(message, own, false));
                    }
                }
                Err(e) => tracing::warn!("Failed to load conversation: {}", e),
            }
        }

        Command::OpenGroup(group_id) => {
            let (me, name) = {
                let mut st = state.lock().unwrap();
                let name = st
                    .groups
                    .iter()
                    .find(|g| g.id == group_id)
                    .map(|g| g.name.clone())
                    .unwrap_or_else(|| group_id.clone());
                st.current_chat = Some(ChatTarget::Group {
                    id: group_id.clone(),
                    name: name.clone(),
                });
                (st.username.clone(), name)
            };
            // Opening a group conversation redundantly re-joins the room.
            out.send(ClientEvent::JoinGroup {
                group_id: group_id.clone(),
            })
            .ok();
            match api.fetch_conversation(&group_id, &me).await {
                Ok(history) => {
                    println!("\n--- {name} ---");
                    for message in &history {
                        let own = same_user(&message.from_username, &me);
                        print!("{}", MessageFormatter::format_message(message, own, true));
                    }
                }
                Err(e) => tracing::warn!("Failed to load group conversation: {}", e),
            }
        }

        Command::CreateGroup { name, members } => {
            let creator = state.lock().unwrap().username.clone();
            out.send(ClientEvent::CreateGroup {
                group_name: name,
                members,
                creator,
            })
            .ok();
        }

        Command::Delete(key) => {
            let mut st = state.lock().unwrap();
            st.filters.delete(&key);
            st.chats.retain(|entry| !same_user(&entry.key, &key));
            if matches!(
                &st.current_chat,
                Some(ChatTarget::Direct { username }) if same_user(username, &key)
            ) || matches!(
                &st.current_chat,
                Some(ChatTarget::Group { id, .. }) if id == &key
            ) {
                st.current_chat = None;
            }
            let me = st.username.clone();
            if let Err(e) = local.save_filters(&me, &st.filters) {
                tracing::warn!("Failed to persist chat filters: {}", e);
            }
            println!("Chat '{key}' deleted");
        }

        Command::Archive(key) => {
            let mut st = state.lock().unwrap();
            st.filters.archive(&key);
            st.chats.retain(|entry| !same_user(&entry.key, &key));
            let me = st.username.clone();
            if let Err(e) = local.save_filters(&me, &st.filters) {
                tracing::warn!("Failed to persist chat filters: {}", e);
            }
            println!("Chat '{key}' archived");
        }

        Command::Say(text) => {
            let (me, target) = {
                let st = state.lock().unwrap();
                (st.username.clone(), st.current_chat.clone())
            };
            let Some(target) = target else {
                println!("No open conversation - use /open <username> first");
                return;
            };

            let (typing_to, is_group) = target.typing_target();
            if tracker.note_activity(Instant::now()) {
                out.send(ClientEvent::Typing {
                    to: typing_to.to_string(),
                    from: me.clone(),
                    is_group,
                })
                .ok();
            }
            *typing_target = Some((typing_to.to_string(), is_group));

            match &target {
                ChatTarget::Direct { username } => {
                    out.send(ClientEvent::PrivateMessage {
                        to: username.clone(),
                        message: text,
                        from: String::new(),
                        from_username: me,
                    })
                    .ok();
                }
                ChatTarget::Group { id, .. } => {
                    out.send(ClientEvent::GroupMessage {
                        group_id: id.clone(),
                        message: text,
                        from: String::new(),
                        from_username: me,
                    })
                    .ok();
                }
            }
        }
    }
}
