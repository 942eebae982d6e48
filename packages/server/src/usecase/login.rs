//! UseCase: ログイン処理
//!
//! 永続ストアに対する資格情報の確認。ユーザー名は case-insensitive、
//! パスワードは完全一致。どちらが違っていても同じエラーを返す。

use std::sync::Arc;

use idobata_shared::identity::same_user;

use crate::domain::{ChatStore, StoredUser};

use super::error::LoginError;

/// ログインのユースケース
pub struct LoginUseCase {
    store: Arc<dyn ChatStore>,
}

impl LoginUseCase {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store }
    }

    /// ログインを実行
    pub async fn execute(&self, username: &str, password: &str) -> Result<StoredUser, LoginError> {
        let users = self.store.load_users().await?;

        users
            .into_iter()
            .find(|u| {
                same_user(&u.username, username) && u.password.as_deref() == Some(password)
            })
            .ok_or(LoginError::InvalidCredentials)
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::MockChatStore;

    use super::*;

    fn store_with_alice() -> Arc<MockChatStore> {
        let mut store = MockChatStore::new();
        store.expect_load_users().returning(|| {
            Ok(vec![StoredUser {
                username: "Alice".to_string(),
                password: Some("secret".to_string()),
                avatar: "🦀".to_string(),
                online: false,
                created_at: "2023-01-01T00:00:00+00:00".to_string(),
                last_seen: None,
            }])
        });
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_login_succeeds_with_case_insensitive_username() {
        // テスト項目: ユーザー名の大文字小文字が違ってもログインできる
        // given (前提条件):
        let usecase = LoginUseCase::new(store_with_alice());

        // when (操作):
        let result = usecase.execute("alice", "secret").await;

        // then (期待する結果): 保存されたレコード（元の表記）が返る
        let user = result.unwrap();
        assert_eq!(user.username, "Alice");
        assert_eq!(user.avatar, "🦀");
    }

    #[tokio::test]
    async fn test_login_fails_with_wrong_password() {
        // テスト項目: パスワード不一致でログインが拒否される
        // given (前提条件):
        let usecase = LoginUseCase::new(store_with_alice());

        // when (操作):
        let result = usecase.execute("alice", "SECRET").await;

        // then (期待する結果):
        assert!(matches!(result, Err(LoginError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_fails_for_unknown_user() {
        // テスト項目: 存在しないユーザーのログインが拒否される
        // given (前提条件):
        let usecase = LoginUseCase::new(store_with_alice());

        // when (操作):
        let result = usecase.execute("mallory", "secret").await;

        // then (期待する結果):
        assert!(matches!(result, Err(LoginError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_fails_for_account_without_password() {
        // テスト項目: セッション由来でパスワードを持たないレコードでは
        //             ログインできない
        // given (前提条件):
        let mut store = MockChatStore::new();
        store.expect_load_users().returning(|| {
            Ok(vec![StoredUser {
                username: "ghost".to_string(),
                password: None,
                avatar: "👤".to_string(),
                online: false,
                created_at: "2023-01-01T00:00:00+00:00".to_string(),
                last_seen: None,
            }])
        });
        let usecase = LoginUseCase::new(Arc::new(store));

        // when (操作):
        let result = usecase.execute("ghost", "").await;

        // then (期待する結果):
        assert!(matches!(result, Err(LoginError::InvalidCredentials)));
    }
}
