//! UseCase: ルーム join 処理
//!
//! クライアントはグループの会話を開くたびに冗長に join-group を送って
//! くるため、join は冪等でなければならない。メンバーシップの検証は
//! 行わない（メンバー判定はクライアント側のグループキャッシュが担う）。

use std::sync::Arc;

use crate::{domain::ConnectionId, registry::RoomDirectory};

/// ルーム join のユースケース
pub struct JoinGroupUseCase {
    rooms: Arc<RoomDirectory>,
}

impl JoinGroupUseCase {
    pub fn new(rooms: Arc<RoomDirectory>) -> Self {
        Self { rooms }
    }

    /// ルーム join を実行。二重 join は no-op。
    pub async fn execute(&self, connection_id: &ConnectionId, group_id: &str) {
        let newly_joined = self.rooms.join(connection_id, group_id).await;
        if newly_joined {
            tracing::debug!("Connection '{}' joined room '{}'", connection_id, group_id);
        }
    }
}
