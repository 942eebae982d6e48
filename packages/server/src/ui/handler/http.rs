//! HTTP API endpoint handlers.
//!
//! Stateless bulk reads used by clients for history replay and contact
//! discovery. Conversations are derived from the flat message log on every
//! request; nothing here mutates state.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use idobata_shared::protocol::{GroupRecord, MessageRecord, UserRecord};
use serde::Deserialize;

use super::super::state::AppState;

/// Query parameters for the conversation history endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationQuery {
    pub current_user: Option<String>,
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Get all durable user records (passwords stripped)
pub async fn get_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserRecord>>, StatusCode> {
    match state.get_users_usecase.execute().await {
        Ok(users) => Ok(Json(users)),
        Err(e) => {
            tracing::error!("Failed to load users: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Get all persisted groups
pub async fn get_groups(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<GroupRecord>>, StatusCode> {
    match state.get_groups_usecase.execute().await {
        Ok(groups) => Ok(Json(groups)),
        Err(e) => {
            tracing::error!("Failed to load groups: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Get the history of one conversation (direct pair or group id), log order
pub async fn get_conversation_messages(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
    Query(query): Query<ConversationQuery>,
) -> Result<Json<Vec<MessageRecord>>, StatusCode> {
    match state
        .get_messages_usecase
        .conversation(&chat_id, query.current_user.as_deref())
        .await
    {
        Ok(messages) => Ok(Json(messages)),
        Err(e) => {
            tracing::error!("Failed to load conversation '{}': {}", chat_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Get every direct message involving a user, newest first.
/// This is the input of the client-side conversation reconciliation.
pub async fn get_user_messages(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<Vec<MessageRecord>>, StatusCode> {
    match state.get_messages_usecase.involving_user(&username).await {
        Ok(messages) => Ok(Json(messages)),
        Err(e) => {
            tracing::error!("Failed to load messages for '{}': {}", username, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
