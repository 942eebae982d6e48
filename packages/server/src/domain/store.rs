//! ChatStore trait 定義
//!
//! ドメイン層が必要とする永続ストアへのインターフェース。コレクション
//! （users / messages / groups）ごとに「全件読み込み」「全件置き換え」
//! 「追記」だけを提供し、会話といった派生ビューはここでは扱わない。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;
use idobata_shared::protocol::{GroupRecord, MessageRecord};

use super::{StoreError, StoredUser};

/// Persistent store for the three durable collections.
///
/// Each method suspends; callers must not hold registry or room locks
/// across a store call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// 全ユーザーレコードを読み込む
    async fn load_users(&self) -> Result<Vec<StoredUser>, StoreError>;

    /// ユーザーコレクション全体を置き換える
    async fn replace_users(&self, users: Vec<StoredUser>) -> Result<(), StoreError>;

    /// メッセージログ全体を追記順で読み込む
    async fn load_messages(&self) -> Result<Vec<MessageRecord>, StoreError>;

    /// メッセージをログ末尾に追記する
    async fn append_message(&self, message: MessageRecord) -> Result<(), StoreError>;

    /// 全グループレコードを読み込む
    async fn load_groups(&self) -> Result<Vec<GroupRecord>, StoreError>;

    /// グループを追記する
    async fn append_group(&self, group: GroupRecord) -> Result<(), StoreError>;
}
