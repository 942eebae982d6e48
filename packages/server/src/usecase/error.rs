//! UseCase 層のエラー定義
//!
//! ユーザーに見せる失敗（重複ユーザー名、認証失敗、グループ作成の
//! バリデーション）はインラインの応答イベントとして返され、fault には
//! しない。ストア失敗は当該操作だけを中断し、リトライしない。

use thiserror::Error;

use crate::domain::StoreError;

/// Account registration failure.
#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("username '{0}' is already in use")]
    DuplicateUsername(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Login failure.
#[derive(Debug, Error)]
pub enum LoginError {
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Message send failure. An offline recipient or an empty room is NOT an
/// error; the only failure mode is the store write.
#[derive(Debug, Error)]
pub enum SendMessageError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Group creation failure.
#[derive(Debug, Error)]
pub enum CreateGroupError {
    #[error("group name must not be empty")]
    EmptyName,

    #[error("select at least one member")]
    NoMembers,

    #[error(transparent)]
    Store(#[from] StoreError),
}
