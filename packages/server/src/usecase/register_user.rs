//! UseCase: アカウント登録処理
//!
//! 永続ストアへのアカウント作成。ライブセッションの admit とは別物で、
//! 接続が認証される前でも呼べる。パスワードは原文のまま保存される
//! （ハッシュ化は本システムの対象外）。

use std::sync::Arc;

use idobata_shared::{identity::same_user, time::Clock};

use crate::domain::{ChatStore, DEFAULT_AVATAR, StoredUser};

use super::error::RegisterError;

/// アカウント登録のユースケース
pub struct RegisterUserUseCase {
    store: Arc<dyn ChatStore>,
    clock: Arc<dyn Clock>,
}

impl RegisterUserUseCase {
    pub fn new(store: Arc<dyn ChatStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// アカウント登録を実行
    ///
    /// ユーザー名の重複は case-insensitive に判定する。
    pub async fn execute(
        &self,
        username: String,
        password: String,
        avatar: Option<String>,
    ) -> Result<(), RegisterError> {
        let mut users = self.store.load_users().await?;

        if users.iter().any(|u| same_user(&u.username, &username)) {
            return Err(RegisterError::DuplicateUsername(username));
        }

        users.push(StoredUser {
            username: username.clone(),
            password: Some(password),
            avatar: avatar.unwrap_or_else(|| DEFAULT_AVATAR.to_string()),
            online: false,
            created_at: self.clock.now_rfc3339(),
            last_seen: None,
        });
        self.store.replace_users(users).await?;

        tracing::info!("User registered: {}", username);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use idobata_shared::time::FixedClock;

    use crate::domain::MockChatStore;

    use super::*;

    #[tokio::test]
    async fn test_register_new_user_succeeds() {
        // テスト項目: 新規ユーザーが登録され、パスワード付きで保存される
        // given (前提条件):
        let mut store = MockChatStore::new();
        store.expect_load_users().returning(|| Ok(vec![]));
        store
            .expect_replace_users()
            .withf(|users: &Vec<StoredUser>| {
                users.len() == 1
                    && users[0].username == "alice"
                    && users[0].password.as_deref() == Some("secret")
                    && !users[0].online
            })
            .times(1)
            .returning(|_| Ok(()));
        let usecase = RegisterUserUseCase::new(
            Arc::new(store),
            Arc::new(FixedClock::new(1_700_000_000_000)),
        );

        // when (操作):
        let result = usecase
            .execute("alice".to_string(), "secret".to_string(), None)
            .await;

        // then (期待する結果):
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_username_is_rejected_case_insensitively() {
        // テスト項目: 大文字小文字違いの既存ユーザー名が拒否される
        // given (前提条件):
        let mut store = MockChatStore::new();
        store.expect_load_users().returning(|| {
            Ok(vec![StoredUser {
                username: "Alice".to_string(),
                password: Some("x".to_string()),
                avatar: "👤".to_string(),
                online: false,
                created_at: "2023-01-01T00:00:00+00:00".to_string(),
                last_seen: None,
            }])
        });
        let usecase = RegisterUserUseCase::new(
            Arc::new(store),
            Arc::new(FixedClock::new(1_700_000_000_000)),
        );

        // when (操作):
        let result = usecase
            .execute("aLICE".to_string(), "secret".to_string(), None)
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(RegisterError::DuplicateUsername(_))));
    }

    #[tokio::test]
    async fn test_missing_avatar_falls_back_to_default() {
        // テスト項目: アバター未指定時にデフォルトが入る
        // given (前提条件):
        let mut store = MockChatStore::new();
        store.expect_load_users().returning(|| Ok(vec![]));
        store
            .expect_replace_users()
            .withf(|users: &Vec<StoredUser>| users[0].avatar == DEFAULT_AVATAR)
            .times(1)
            .returning(|_| Ok(()));
        let usecase = RegisterUserUseCase::new(
            Arc::new(store),
            Arc::new(FixedClock::new(1_700_000_000_000)),
        );

        // when (操作):
        let result = usecase
            .execute("bob".to_string(), "secret".to_string(), None)
            .await;

        // then (期待する結果):
        assert!(result.is_ok());
    }
}
