//! UseCase: セッション release 処理
//!
//! 切断された接続が握っていたリソース（セッション、ルーム所属、
//! pusher チャンネル）をすべて解放する。admit されていない接続や
//! 追い出し済みの接続の切断は no-op として扱う。

use std::sync::Arc;

use idobata_shared::{identity::same_user, time::Clock};

use crate::{
    domain::{ChatStore, ConnectionId, MessagePusher, Session},
    registry::{RoomDirectory, SessionRegistry},
};

use super::presence::PresenceNotifier;

/// セッション release のユースケース
pub struct DisconnectSessionUseCase {
    registry: Arc<SessionRegistry>,
    rooms: Arc<RoomDirectory>,
    store: Arc<dyn ChatStore>,
    pusher: Arc<dyn MessagePusher>,
    presence: Arc<PresenceNotifier>,
    clock: Arc<dyn Clock>,
}

impl DisconnectSessionUseCase {
    pub fn new(
        registry: Arc<SessionRegistry>,
        rooms: Arc<RoomDirectory>,
        store: Arc<dyn ChatStore>,
        pusher: Arc<dyn MessagePusher>,
        presence: Arc<PresenceNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            rooms,
            store,
            pusher,
            presence,
            clock,
        }
    }

    /// 切断処理を実行
    ///
    /// リソース解放は他の接続をブロックせずに必ず行う。ストアの
    /// last_seen 更新に失敗しても解放と通知は継続する（ログのみ）。
    pub async fn execute(&self, connection_id: &ConnectionId) -> Option<Session> {
        // 1. ルーム所属と pusher チャンネルは無条件で解放
        self.rooms.leave_all(connection_id).await;
        self.pusher.unregister_client(connection_id).await;

        // 2. セッションを解放（追い出し済みなら None）
        let session = self.registry.release(connection_id).await?;
        let last_seen = self.clock.now_rfc3339();
        tracing::info!(
            "Session released for '{}' on connection '{}'",
            session.username,
            connection_id
        );

        // 3. 永続ストアの online / lastSeen を更新
        if let Err(e) = self.mark_offline(&session.username, &last_seen).await {
            tracing::warn!("Failed to persist offline state for '{}': {}", session.username, e);
        }

        // 4. 残りの全セッションへ user-disconnected
        self.presence
            .broadcast_disconnected(&session.username, &last_seen)
            .await;

        Some(session)
    }

    async fn mark_offline(
        &self,
        username: &str,
        last_seen: &str,
    ) -> Result<(), crate::domain::StoreError> {
        let mut users = self.store.load_users().await?;
        if let Some(user) = users.iter_mut().find(|u| same_user(&u.username, username)) {
            user.online = false;
            user.last_seen = Some(last_seen.to_string());
            self.store.replace_users(users).await?;
        }
        Ok(())
    }
}
