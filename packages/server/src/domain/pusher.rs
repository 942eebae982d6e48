//! MessagePusher trait 定義
//!
//! 接続中のクライアントへイベントを届けるためのインターフェース。
//! UseCase 層はこの trait に依存し、WebSocket という具体的な輸送路には
//! 依存しない。実装は Infrastructure 層が提供します。

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use super::ConnectionId;

/// Channel used to push serialized events to one connection.
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// Delivery failure. Best-effort fan-out tolerates these; a missing or
/// closed target is logged and skipped, never surfaced to the sender.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessagePushError {
    #[error("connection '{0}' is not registered")]
    ConnectionNotFound(String),

    #[error("failed to push message: {0}")]
    PushFailed(String),
}

/// Push interface over the set of open connections.
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 接続のチャンネルを登録する（WebSocket 確立時）
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel);

    /// 接続のチャンネルを登録解除する（切断時）
    async fn unregister_client(&self, connection_id: &ConnectionId);

    /// 特定の接続へイベントを届ける
    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError>;

    /// 複数の接続へイベントを届ける（部分的な失敗は許容）
    async fn broadcast(
        &self,
        targets: Vec<ConnectionId>,
        content: &str,
    ) -> Result<(), MessagePushError>;
}
