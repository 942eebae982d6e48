//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use idobata_shared::protocol::{ClientEvent, ServerEvent};
use tokio::sync::mpsc;

use crate::{
    domain::ConnectionId,
    usecase::{CreateGroupError, LoginError, RegisterError},
};

use super::super::state::AppState;

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let connection_id = ConnectionId::generate();
    ws.on_upgrade(move |socket| handle_socket(socket, state, connection_id))
}

/// Spawns a task that receives messages from the rx channel and pushes them to the WebSocket sender.
///
/// This function handles the outbound event flow: events addressed to this
/// connection (via rx channel) are sent to its WebSocket connection.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, connection_id: ConnectionId) {
    let (sender, mut receiver) = socket.split();

    // Register the outbound channel before any event can be handled, so
    // pre-admission acks (register-response, login-response) are deliverable.
    let (tx, rx) = mpsc::unbounded_channel();
    state
        .message_pusher
        .register_client(connection_id.clone(), tx)
        .await;
    tracing::info!("Connection '{}' opened", connection_id);

    let mut send_task = pusher_loop(rx, sender);

    let state_clone = Arc::clone(&state);
    let connection_id_clone = connection_id.clone();

    // Spawn a task to receive events from this client
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::error!("WebSocket error: {}", e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(event) => {
                        dispatch_event(&state_clone, &connection_id_clone, event).await;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse client event: {}", e);
                    }
                },
                Message::Ping(_) => {
                    tracing::debug!("Received ping");
                    // Ping/pong is handled automatically by the WebSocket protocol
                }
                Message::Close(_) => {
                    tracing::info!("Connection '{}' requested close", connection_id_clone);
                    break;
                }
                _ => {}
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    // Disconnect releases the session, the room memberships and the pusher
    // channel, and broadcasts user-disconnected when a session was bound.
    state
        .disconnect_session_usecase
        .execute(&connection_id)
        .await;
    tracing::info!("Connection '{}' closed", connection_id);
}

/// Dispatch one client event into the matching use case.
async fn dispatch_event(state: &Arc<AppState>, connection_id: &ConnectionId, event: ClientEvent) {
    match event {
        ClientEvent::RegisterUser {
            username,
            password,
            avatar,
        } => {
            let ack = match state
                .register_user_usecase
                .execute(username, password, avatar)
                .await
            {
                Ok(()) => ServerEvent::RegisterResponse {
                    success: true,
                    message: "User registered successfully".to_string(),
                },
                Err(RegisterError::DuplicateUsername(_)) => ServerEvent::RegisterResponse {
                    success: false,
                    message: "The username is already in use".to_string(),
                },
                Err(RegisterError::Store(e)) => {
                    tracing::error!("Account registration failed: {}", e);
                    ServerEvent::RegisterResponse {
                        success: false,
                        message: "Registration failed, try again later".to_string(),
                    }
                }
            };
            push_to_self(state, connection_id, &ack).await;
        }

        ClientEvent::LoginUser { username, password } => {
            let ack = match state.login_usecase.execute(&username, &password).await {
                Ok(user) => ServerEvent::LoginResponse {
                    success: true,
                    username: Some(user.username),
                    avatar: Some(user.avatar),
                    message: "Login successful".to_string(),
                },
                Err(LoginError::InvalidCredentials) => ServerEvent::LoginResponse {
                    success: false,
                    username: None,
                    avatar: None,
                    message: "Invalid username or password".to_string(),
                },
                Err(LoginError::Store(e)) => {
                    tracing::error!("Login failed: {}", e);
                    ServerEvent::LoginResponse {
                        success: false,
                        username: None,
                        avatar: None,
                        message: "Login failed, try again later".to_string(),
                    }
                }
            };
            push_to_self(state, connection_id, &ack).await;
        }

        ClientEvent::Register { username, avatar } => {
            if let Err(e) = state
                .connect_session_usecase
                .execute(connection_id.clone(), username, avatar)
                .await
            {
                tracing::error!("Session admission failed: {}", e);
            }
        }

        ClientEvent::GetUsers => match state.get_users_usecase.execute().await {
            Ok(users) => {
                push_to_self(state, connection_id, &ServerEvent::UsersList { users }).await;
            }
            Err(e) => tracing::error!("Failed to load users: {}", e),
        },

        ClientEvent::PrivateMessage {
            to,
            message,
            from: _,
            from_username,
        } => {
            if let Err(e) = state
                .send_direct_message_usecase
                .execute(connection_id, to, from_username, message)
                .await
            {
                tracing::error!("Failed to send direct message: {}", e);
            }
        }

        ClientEvent::CreateGroup {
            group_name,
            members,
            creator,
        } => {
            match state
                .create_group_usecase
                .execute(connection_id, group_name, members, creator)
                .await
            {
                Ok(_) => {}
                Err(e @ (CreateGroupError::EmptyName | CreateGroupError::NoMembers)) => {
                    let ack = ServerEvent::GroupError {
                        message: e.to_string(),
                    };
                    push_to_self(state, connection_id, &ack).await;
                }
                Err(CreateGroupError::Store(e)) => {
                    tracing::error!("Failed to persist group: {}", e);
                }
            }
        }

        ClientEvent::JoinGroup { group_id } => {
            state
                .join_group_usecase
                .execute(connection_id, &group_id)
                .await;
        }

        ClientEvent::GroupMessage {
            group_id,
            message,
            from: _,
            from_username,
        } => {
            if let Err(e) = state
                .send_group_message_usecase
                .execute(connection_id, group_id, from_username, message)
                .await
            {
                tracing::error!("Failed to send group message: {}", e);
            }
        }

        ClientEvent::Typing { to, from, is_group } => {
            state
                .typing_usecase
                .execute(connection_id, &to, &from, is_group, true)
                .await;
        }

        ClientEvent::StopTyping { to, from, is_group } => {
            state
                .typing_usecase
                .execute(connection_id, &to, &from, is_group, false)
                .await;
        }
    }
}

async fn push_to_self(state: &Arc<AppState>, connection_id: &ConnectionId, event: &ServerEvent) {
    if let Err(e) = state
        .message_pusher
        .push_to(connection_id, &event.to_json())
        .await
    {
        tracing::warn!("Failed to push event to '{}': {}", connection_id, e);
    }
}
