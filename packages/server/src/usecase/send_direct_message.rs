//! UseCase: ダイレクトメッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendDirectMessageUseCase::execute() メソッド
//! - 永続化 → ファンアウトの順序、オフライン宛先の扱い、送信 ack
//!
//! ### なぜこのテストが必要か
//! - 「永続化されるまで一切ファンアウトしない」原子性の保証
//! - 宛先オフラインはエラーではなく、メッセージは後で取得できる
//! - 送信者は受信エコーを待たずに描画できるよう必ず ack を受け取る
//!
//! ### どのような状況を想定しているか
//! - 正常系: オンライン宛先への配送 + ack
//! - 準正常系: オフライン宛先（保存のみ + ack）
//! - 異常系: ストア書き込み失敗（ファンアウトなし）

use std::sync::Arc;

use idobata_shared::{
    protocol::{MessageKind, MessageRecord, ServerEvent},
    time::{Clock, timestamp_to_rfc3339},
};

use crate::{
    domain::{ChatStore, ConnectionId, MessageIdFactory, MessagePusher},
    registry::SessionRegistry,
};

use super::error::SendMessageError;

/// ダイレクトメッセージ送信のユースケース
pub struct SendDirectMessageUseCase {
    registry: Arc<SessionRegistry>,
    store: Arc<dyn ChatStore>,
    pusher: Arc<dyn MessagePusher>,
    ids: Arc<MessageIdFactory>,
    clock: Arc<dyn Clock>,
}

impl SendDirectMessageUseCase {
    pub fn new(
        registry: Arc<SessionRegistry>,
        store: Arc<dyn ChatStore>,
        pusher: Arc<dyn MessagePusher>,
        ids: Arc<MessageIdFactory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            store,
            pusher,
            ids,
            clock,
        }
    }

    /// ダイレクトメッセージ送信を実行
    ///
    /// 宛先がオフラインでも無条件に永続化する。配送は宛先のセッションが
    /// 生きている場合のみ、ちょうど 1 回。送信者には受信配送とは別の
    /// message-sent ack を返す。
    pub async fn execute(
        &self,
        from_connection: &ConnectionId,
        to: String,
        from_username: String,
        body: String,
    ) -> Result<MessageRecord, SendMessageError> {
        let now = self.clock.now_utc_millis();
        let record = MessageRecord {
            id: self.ids.next(now),
            kind: MessageKind::Direct,
            from: from_connection.as_str().to_string(),
            from_username,
            to: Some(to),
            group_id: None,
            message: body,
            timestamp: timestamp_to_rfc3339(now),
            read: false,
        };

        // 永続化に失敗したらファンアウトせずに中断
        self.store.append_message(record.clone()).await?;

        let recipient_name = record.to.as_deref().unwrap_or_default();
        match self.registry.lookup(recipient_name).await {
            Some(recipient) => {
                let event = ServerEvent::ReceiveMessage {
                    message: record.clone(),
                };
                if let Err(e) = self.pusher.push_to(&recipient, &event.to_json()).await {
                    tracing::warn!("Failed to deliver message to '{}': {}", recipient_name, e);
                }
            }
            None => {
                tracing::debug!(
                    "Recipient '{}' is offline, message stored for later retrieval",
                    recipient_name
                );
            }
        }

        let ack = ServerEvent::MessageSent {
            message: record.clone(),
        };
        if let Err(e) = self.pusher.push_to(from_connection, &ack.to_json()).await {
            tracing::warn!("Failed to ack sender '{}': {}", record.from_username, e);
        }

        Ok(record)
    }
}
