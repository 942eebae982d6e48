//! UseCase: グループメッセージ送信処理
//!
//! ルーム全員への「ちょうど 1 回ずつ」の配送が守るべき不変条件。
//! 送信者を除いたブロードキャストと、送信者本人への明示的な 1 通に
//! 分けて送ることで、全員宛に流してから送信者にもう一度送ってしまう
//! 二重配送を避ける。

use std::sync::Arc;

use idobata_shared::{
    protocol::{MessageKind, MessageRecord, ServerEvent},
    time::{Clock, timestamp_to_rfc3339},
};

use crate::{
    domain::{ChatStore, ConnectionId, MessageIdFactory, MessagePusher},
    registry::RoomDirectory,
};

use super::error::SendMessageError;

/// グループメッセージ送信のユースケース
pub struct SendGroupMessageUseCase {
    rooms: Arc<RoomDirectory>,
    store: Arc<dyn ChatStore>,
    pusher: Arc<dyn MessagePusher>,
    ids: Arc<MessageIdFactory>,
    clock: Arc<dyn Clock>,
}

impl SendGroupMessageUseCase {
    pub fn new(
        rooms: Arc<RoomDirectory>,
        store: Arc<dyn ChatStore>,
        pusher: Arc<dyn MessagePusher>,
        ids: Arc<MessageIdFactory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            rooms,
            store,
            pusher,
            ids,
            clock,
        }
    }

    /// グループメッセージ送信を実行
    ///
    /// ルームにオンラインのメンバーがいなくても無条件に永続化する。
    /// 配送はルームの各接続にちょうど 1 回ずつ（送信者含む）。
    pub async fn execute(
        &self,
        from_connection: &ConnectionId,
        group_id: String,
        from_username: String,
        body: String,
    ) -> Result<MessageRecord, SendMessageError> {
        let now = self.clock.now_utc_millis();
        let record = MessageRecord {
            id: self.ids.next(now),
            kind: MessageKind::Group,
            from: from_connection.as_str().to_string(),
            from_username,
            to: None,
            group_id: Some(group_id.clone()),
            message: body,
            timestamp: timestamp_to_rfc3339(now),
            read: false,
        };

        // 永続化に失敗したらファンアウトせずに中断
        self.store.append_message(record.clone()).await?;

        let event = ServerEvent::ReceiveGroupMessage {
            message: record.clone(),
        };
        let json = event.to_json();

        // 送信者を除くルーム全員へブロードキャスト
        let targets = self.rooms.members_except(&group_id, from_connection).await;
        if let Err(e) = self.pusher.broadcast(targets, &json).await {
            tracing::warn!("Failed to broadcast group message in '{}': {}", group_id, e);
        }

        // 送信者本人へは明示的に 1 通だけ
        if let Err(e) = self.pusher.push_to(from_connection, &json).await {
            tracing::warn!(
                "Failed to echo group message to sender '{}': {}",
                record.from_username,
                e
            );
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use crate::{
        domain::{MockChatStore, StoreError},
        infrastructure::pusher::WebSocketMessagePusher,
    };
    use idobata_shared::time::FixedClock;

    use super::*;

    struct Harness {
        rooms: Arc<RoomDirectory>,
        pusher: Arc<dyn MessagePusher>,
        usecase: SendGroupMessageUseCase,
    }

    fn wired(store: Arc<dyn ChatStore>) -> Harness {
        let rooms = Arc::new(RoomDirectory::new());
        let pusher: Arc<dyn MessagePusher> = Arc::new(WebSocketMessagePusher::new());
        let usecase = SendGroupMessageUseCase::new(
            Arc::clone(&rooms),
            store,
            Arc::clone(&pusher),
            Arc::new(MessageIdFactory::new()),
            Arc::new(FixedClock::new(1_700_000_000_000)),
        );
        Harness {
            rooms,
            pusher,
            usecase,
        }
    }

    fn appending_store() -> Arc<MockChatStore> {
        let mut store = MockChatStore::new();
        store.expect_append_message().returning(|_| Ok(()));
        Arc::new(store)
    }

    async fn joined(
        harness: &Harness,
        conn: &str,
        group_id: &str,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<String>) {
        let id = ConnectionId::new(conn);
        let (tx, rx) = mpsc::unbounded_channel();
        harness.pusher.register_client(id.clone(), tx).await;
        harness.rooms.join(&id, group_id).await;
        (id, rx)
    }

    fn count_group_messages(rx: &mut mpsc::UnboundedReceiver<String>) -> usize {
        let mut count = 0;
        while let Ok(json) = rx.try_recv() {
            let event: ServerEvent = serde_json::from_str(&json).unwrap();
            if matches!(event, ServerEvent::ReceiveGroupMessage { .. }) {
                count += 1;
            }
        }
        count
    }

    #[tokio::test]
    async fn test_every_room_member_including_sender_gets_exactly_one_copy() {
        // テスト項目: 送信者を含むルーム全員にちょうど 1 通ずつ届く
        // given (前提条件):
        let harness = wired(appending_store());
        let (alice, mut alice_rx) = joined(&harness, "conn-a", "group_1").await;
        let (_bob, mut bob_rx) = joined(&harness, "conn-b", "group_1").await;
        let (_carol, mut carol_rx) = joined(&harness, "conn-c", "group_1").await;

        // when (操作):
        harness
            .usecase
            .execute(
                &alice,
                "group_1".to_string(),
                "alice".to_string(),
                "hello all".to_string(),
            )
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(count_group_messages(&mut alice_rx), 1);
        assert_eq!(count_group_messages(&mut bob_rx), 1);
        assert_eq!(count_group_messages(&mut carol_rx), 1);
    }

    #[tokio::test]
    async fn test_non_members_receive_nothing() {
        // テスト項目: ルーム外の接続には届かない
        // given (前提条件):
        let harness = wired(appending_store());
        let (alice, _alice_rx) = joined(&harness, "conn-a", "group_1").await;
        let (outsider, mut outsider_rx) = joined(&harness, "conn-x", "group_other").await;

        // when (操作):
        harness
            .usecase
            .execute(
                &alice,
                "group_1".to_string(),
                "alice".to_string(),
                "hello".to_string(),
            )
            .await
            .unwrap();

        // then (期待する結果):
        let _ = outsider;
        assert_eq!(count_group_messages(&mut outsider_rx), 0);
    }

    #[tokio::test]
    async fn test_empty_room_still_persists_message() {
        // テスト項目: ルームに誰もいなくてもメッセージは保存される
        // given (前提条件):
        let mut store = MockChatStore::new();
        store
            .expect_append_message()
            .withf(|m: &MessageRecord| {
                m.kind == MessageKind::Group && m.group_id.as_deref() == Some("group_1")
            })
            .times(1)
            .returning(|_| Ok(()));
        let harness = wired(Arc::new(store));
        let sender = ConnectionId::new("conn-a");

        // when (操作): 送信者すら pusher に登録されていない
        let result = harness
            .usecase
            .execute(
                &sender,
                "group_1".to_string(),
                "alice".to_string(),
                "anyone here?".to_string(),
            )
            .await;

        // then (期待する結果): エラーではない
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_store_failure_aborts_before_any_fanout() {
        // テスト項目: ストア書き込み失敗時にルームへ何も流れない
        // given (前提条件):
        let mut store = MockChatStore::new();
        store.expect_append_message().returning(|_| {
            Err(StoreError::Io {
                collection: "messages",
                source: std::io::Error::other("disk full"),
            })
        });
        let harness = wired(Arc::new(store));
        let (alice, mut alice_rx) = joined(&harness, "conn-a", "group_1").await;
        let (_bob, mut bob_rx) = joined(&harness, "conn-b", "group_1").await;

        // when (操作):
        let result = harness
            .usecase
            .execute(
                &alice,
                "group_1".to_string(),
                "alice".to_string(),
                "hello".to_string(),
            )
            .await;

        // then (期待する結果):
        assert!(result.is_err());
        assert_eq!(count_group_messages(&mut alice_rx), 0);
        assert_eq!(count_group_messages(&mut bob_rx), 0);
    }
}
