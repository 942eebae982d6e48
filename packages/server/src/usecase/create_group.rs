//! UseCase: グループ作成処理
//!
//! メンバーシップは作成時に固定され、以後どの API からも変更できない。
//! 作成者には group-created、作成時点でオンラインの他メンバーには
//! new-group が届く。オフラインのメンバーには何も同期的に送られず、
//! 次回ログイン時にクライアント側のグループキャッシュから復元される。

use std::sync::Arc;

use idobata_shared::{
    identity::same_user,
    protocol::{GroupRecord, ServerEvent},
    time::{Clock, timestamp_to_rfc3339},
};

use crate::{
    domain::{ChatStore, ConnectionId, GROUP_AVATAR, GroupIdFactory, MessagePusher},
    registry::{RoomDirectory, SessionRegistry},
};

use super::error::CreateGroupError;

/// グループ作成のユースケース
pub struct CreateGroupUseCase {
    registry: Arc<SessionRegistry>,
    rooms: Arc<RoomDirectory>,
    store: Arc<dyn ChatStore>,
    pusher: Arc<dyn MessagePusher>,
    ids: Arc<GroupIdFactory>,
    clock: Arc<dyn Clock>,
}

impl CreateGroupUseCase {
    pub fn new(
        registry: Arc<SessionRegistry>,
        rooms: Arc<RoomDirectory>,
        store: Arc<dyn ChatStore>,
        pusher: Arc<dyn MessagePusher>,
        ids: Arc<GroupIdFactory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            rooms,
            store,
            pusher,
            ids,
            clock,
        }
    }

    /// グループ作成を実行
    ///
    /// バリデーション失敗はインライン ack で返すユーザー向けエラー。
    /// 永続化に失敗したらルームも通知も作らない。
    pub async fn execute(
        &self,
        creator_connection: &ConnectionId,
        name: String,
        members: Vec<String>,
        creator: String,
    ) -> Result<GroupRecord, CreateGroupError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(CreateGroupError::EmptyName);
        }
        if !members.iter().any(|m| !same_user(m, &creator)) {
            return Err(CreateGroupError::NoMembers);
        }

        // 作成者は常にメンバーに含まれる
        let mut members = members;
        if !members.iter().any(|m| same_user(m, &creator)) {
            members.push(creator.clone());
        }

        let now = self.clock.now_utc_millis();
        let group = GroupRecord {
            id: self.ids.next(now),
            name,
            creator,
            members,
            created_at: timestamp_to_rfc3339(now),
            avatar: GROUP_AVATAR.to_string(),
        };

        self.store.append_group(group.clone()).await?;

        self.rooms.create_room(&group.id).await;
        self.rooms.join(creator_connection, &group.id).await;

        let created = ServerEvent::GroupCreated {
            group: group.clone(),
        };
        if let Err(e) = self
            .pusher
            .push_to(creator_connection, &created.to_json())
            .await
        {
            tracing::warn!("Failed to ack group creation to '{}': {}", group.creator, e);
        }

        // 作成時点でオンラインのメンバーをルームに入れて招待を届ける
        let invite = ServerEvent::NewGroup {
            group: group.clone(),
        };
        let invite_json = invite.to_json();
        for member in &group.members {
            if same_user(member, &group.creator) {
                continue;
            }
            if let Some(connection) = self.registry.lookup(member).await {
                self.rooms.join(&connection, &group.id).await;
                if let Err(e) = self.pusher.push_to(&connection, &invite_json).await {
                    tracing::warn!("Failed to invite '{}' to group '{}': {}", member, group.id, e);
                }
            }
        }

        tracing::info!("Group '{}' created by '{}'", group.name, group.creator);
        Ok(group)
    }
}
