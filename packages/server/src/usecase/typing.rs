//! UseCase: タイピング通知の中継
//!
//! typing / stop-typing は永続化されない一過性のシグナル。ダイレクトは
//! 宛先のセッション（case-insensitive lookup）へ、グループはルームの
//! 送信者以外へ中継する。宛先がいなければ黙って捨てる。

use std::sync::Arc;

use idobata_shared::protocol::ServerEvent;

use crate::{
    domain::{ConnectionId, MessagePusher},
    registry::{RoomDirectory, SessionRegistry},
};

/// タイピング中継のユースケース
pub struct TypingUseCase {
    registry: Arc<SessionRegistry>,
    rooms: Arc<RoomDirectory>,
    pusher: Arc<dyn MessagePusher>,
}

impl TypingUseCase {
    pub fn new(
        registry: Arc<SessionRegistry>,
        rooms: Arc<RoomDirectory>,
        pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            registry,
            rooms,
            pusher,
        }
    }

    /// タイピング状態の変化を中継する
    ///
    /// `active` が true なら user-typing、false なら user-stop-typing。
    pub async fn execute(
        &self,
        from_connection: &ConnectionId,
        to: &str,
        from: &str,
        is_group: bool,
        active: bool,
    ) {
        let event = if active {
            ServerEvent::UserTyping {
                from: from.to_string(),
                is_group,
            }
        } else {
            ServerEvent::UserStopTyping {
                from: from.to_string(),
            }
        };
        let json = event.to_json();

        if is_group {
            let targets = self.rooms.members_except(to, from_connection).await;
            if let Err(e) = self.pusher.broadcast(targets, &json).await {
                tracing::warn!("Failed to relay typing signal in room '{}': {}", to, e);
            }
        } else if let Some(recipient) = self.registry.lookup(to).await {
            if let Err(e) = self.pusher.push_to(&recipient, &json).await {
                tracing::warn!("Failed to relay typing signal to '{}': {}", to, e);
            }
        }
    }
}
