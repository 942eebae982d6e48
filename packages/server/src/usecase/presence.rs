//! プレゼンス通知
//!
//! セッションの admit / release から導かれる接続・切断イベントの配信と、
//! 新規接続へのロスター送信。ロスターは永続ストアではなくインメモリの
//! セッションレジストリから作るため、いま生きているセッションだけが
//! 映る。

use std::sync::Arc;

use idobata_shared::{
    identity::same_user,
    protocol::{ServerEvent, UserRecord},
};

use crate::{
    domain::{MessagePusher, Session},
    registry::SessionRegistry,
};

/// Presence broadcasts derived from session registry transitions.
pub struct PresenceNotifier {
    registry: Arc<SessionRegistry>,
    pusher: Arc<dyn MessagePusher>,
}

impl PresenceNotifier {
    pub fn new(registry: Arc<SessionRegistry>, pusher: Arc<dyn MessagePusher>) -> Self {
        Self { registry, pusher }
    }

    fn live_record(session: &Session) -> UserRecord {
        UserRecord {
            username: session.username.clone(),
            avatar: session.avatar.clone(),
            online: true,
            last_seen: None,
            created_at: None,
        }
    }

    /// Send the admission confirmation and the live roster (excluding the
    /// new user, case-folded comparison) to the newly admitted connection.
    pub async fn send_admission(&self, session: &Session) {
        let registered = ServerEvent::Registered {
            success: true,
            user: Self::live_record(session),
        };
        if let Err(e) = self
            .pusher
            .push_to(&session.connection_id, &registered.to_json())
            .await
        {
            tracing::warn!("Failed to send registered to '{}': {}", session.username, e);
            return;
        }

        let users: Vec<UserRecord> = self
            .registry
            .roster()
            .await
            .iter()
            .filter(|s| !same_user(&s.username, &session.username))
            .map(Self::live_record)
            .collect();
        let roster = ServerEvent::UsersList { users };
        if let Err(e) = self
            .pusher
            .push_to(&session.connection_id, &roster.to_json())
            .await
        {
            tracing::warn!("Failed to send roster to '{}': {}", session.username, e);
        }
    }

    /// Broadcast `user-connected` to every live session except the new one.
    pub async fn broadcast_connected(&self, session: &Session) {
        let event = ServerEvent::UserConnected {
            user: Self::live_record(session),
        };
        let targets = self
            .registry
            .connections_except(&session.connection_id)
            .await;
        if let Err(e) = self.pusher.broadcast(targets, &event.to_json()).await {
            tracing::warn!("Failed to broadcast user-connected: {}", e);
        }
    }

    /// Broadcast `user-disconnected` to every remaining live session.
    pub async fn broadcast_disconnected(&self, username: &str, last_seen: &str) {
        let event = ServerEvent::UserDisconnected {
            username: username.to_string(),
            last_seen: last_seen.to_string(),
        };
        let targets = self.registry.all_connections().await;
        if let Err(e) = self.pusher.broadcast(targets, &event.to_json()).await {
            tracing::warn!("Failed to broadcast user-disconnected: {}", e);
        }
    }
}
