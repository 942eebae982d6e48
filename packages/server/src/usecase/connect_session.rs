//! UseCase: セッション admit 処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectSessionUseCase::execute() メソッド
//! - 接続のセッション化（後勝ちの追い出し、永続ストアの online 更新、
//!   プレゼンス通知）
//!
//! ### なぜこのテストが必要か
//! - 「case-fold したユーザー名ごとにセッションは高々 1 つ」の保証
//! - ストア書き込みが admit より先に行われ、失敗時に admit されない
//!   ことの確認
//!
//! ### どのような状況を想定しているか
//! - 正常系: 初回接続、再ログイン
//! - 異常系: ストア書き込み失敗
//! - エッジケース: 大文字小文字違いの再ログイン

use std::sync::Arc;

use idobata_shared::{
    identity::same_user,
    time::Clock,
};

use crate::{
    domain::{ChatStore, ConnectionId, Session, StoreError, StoredUser},
    registry::SessionRegistry,
};

use super::presence::PresenceNotifier;

/// セッション admit のユースケース
pub struct ConnectSessionUseCase {
    registry: Arc<SessionRegistry>,
    store: Arc<dyn ChatStore>,
    presence: Arc<PresenceNotifier>,
    clock: Arc<dyn Clock>,
}

impl ConnectSessionUseCase {
    pub fn new(
        registry: Arc<SessionRegistry>,
        store: Arc<dyn ChatStore>,
        presence: Arc<PresenceNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            store,
            presence,
            clock,
        }
    }

    /// セッション admit を実行
    ///
    /// 永続ストアの User レコードを online にしてから registry へ admit
    /// する。ストア書き込みに失敗した場合は admit せずに中断する
    /// （先行状態は変更されない）。成功すると admission 応答・ロスター・
    /// user-connected ブロードキャストまで配信する。
    pub async fn execute(
        &self,
        connection_id: ConnectionId,
        username: String,
        avatar: String,
    ) -> Result<Session, StoreError> {
        let now = self.clock.now_rfc3339();

        // 1. 永続ストアを先に更新（失敗したら admit しない）
        let mut users = self.store.load_users().await?;
        match users.iter_mut().find(|u| same_user(&u.username, &username)) {
            Some(user) => {
                user.online = true;
                user.avatar = avatar.clone();
                user.last_seen = Some(now.clone());
            }
            None => {
                users.push(StoredUser {
                    username: username.clone(),
                    password: None,
                    avatar: avatar.clone(),
                    online: true,
                    created_at: now.clone(),
                    last_seen: Some(now),
                });
            }
        }
        self.store.replace_users(users).await?;

        // 2. registry へ admit（同名の先行セッションは黙って追い出される）
        let session = self.registry.admit(connection_id, username, avatar).await;
        tracing::info!(
            "Session admitted for '{}' on connection '{}'",
            session.username,
            session.connection_id
        );

        // 3. admission 応答 + ロスター + user-connected
        self.presence.send_admission(&session).await;
        self.presence.broadcast_connected(&session).await;

        Ok(session)
    }
}
