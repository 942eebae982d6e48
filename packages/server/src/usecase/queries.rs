//! UseCase: 一括読み出し（HTTP API の裏側）
//!
//! ユーザー一覧・グループ一覧・会話履歴のクエリ。会話はフラットな
//! 追記ログから毎回導出する派生ビューであり、保存された実体ではない。
//! フィルタは副作用のない純関数に切り出してある。

use std::sync::Arc;

use idobata_shared::{
    identity::same_user,
    protocol::{GroupRecord, MessageKind, MessageRecord, UserRecord},
    time::rfc3339_to_millis,
};

use crate::domain::{ChatStore, StoreError};

/// ユーザー一覧取得のユースケース
pub struct GetUsersUseCase {
    store: Arc<dyn ChatStore>,
}

impl GetUsersUseCase {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store }
    }

    /// 永続ストアの全ユーザーをワイヤ表現（パスワード抜き）で返す
    pub async fn execute(&self) -> Result<Vec<UserRecord>, StoreError> {
        let users = self.store.load_users().await?;
        Ok(users.iter().map(|u| u.to_record()).collect())
    }
}

/// グループ一覧取得のユースケース
pub struct GetGroupsUseCase {
    store: Arc<dyn ChatStore>,
}

impl GetGroupsUseCase {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store }
    }

    pub async fn execute(&self) -> Result<Vec<GroupRecord>, StoreError> {
        self.store.load_groups().await
    }
}

/// 履歴クエリのユースケース
pub struct GetMessagesUseCase {
    store: Arc<dyn ChatStore>,
}

impl GetMessagesUseCase {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store }
    }

    /// 1 つの会話（グループ ID またはダイレクトの相手）の履歴をログ順で返す
    pub async fn conversation(
        &self,
        chat_id: &str,
        current_user: Option<&str>,
    ) -> Result<Vec<MessageRecord>, StoreError> {
        let messages = self.store.load_messages().await?;
        Ok(conversation_history(&messages, chat_id, current_user))
    }

    /// あるユーザーが関わる全ダイレクトメッセージを新しい順で返す
    /// （会話リスト再構築の入力）
    pub async fn involving_user(&self, username: &str) -> Result<Vec<MessageRecord>, StoreError> {
        let messages = self.store.load_messages().await?;
        Ok(user_message_log(&messages, username))
    }
}

/// 会話履歴フィルタ。
///
/// グループ ID が一致するグループメッセージ、または current_user と
/// chat_id の 2 者間のダイレクトメッセージ（case-insensitive）を
/// ログ順のまま返す。
pub fn conversation_history(
    messages: &[MessageRecord],
    chat_id: &str,
    current_user: Option<&str>,
) -> Vec<MessageRecord> {
    messages
        .iter()
        .filter(|msg| match msg.kind {
            MessageKind::Group => msg.group_id.as_deref() == Some(chat_id),
            MessageKind::Direct => {
                let Some(current_user) = current_user else {
                    return false;
                };
                let from = msg.from_username.as_str();
                let to = msg.to.as_deref().unwrap_or_default();
                (same_user(from, current_user) && same_user(to, chat_id))
                    || (same_user(from, chat_id) && same_user(to, current_user))
            }
        })
        .cloned()
        .collect()
}

/// ユーザーの全ダイレクトメッセージを新しい順に返す。
///
/// タイムスタンプ降順の安定ソート。同時刻の場合は追記順が保たれる。
pub fn user_message_log(messages: &[MessageRecord], username: &str) -> Vec<MessageRecord> {
    let mut log: Vec<MessageRecord> = messages
        .iter()
        .filter(|msg| {
            msg.kind == MessageKind::Direct
                && (same_user(&msg.from_username, username)
                    || same_user(msg.to.as_deref().unwrap_or_default(), username))
        })
        .cloned()
        .collect();
    log.sort_by_key(|msg| std::cmp::Reverse(rfc3339_to_millis(&msg.timestamp).unwrap_or(0)));
    log
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direct(from: &str, to: &str, body: &str, timestamp: &str) -> MessageRecord {
        MessageRecord {
            id: body.to_string(),
            kind: MessageKind::Direct,
            from: "conn".to_string(),
            from_username: from.to_string(),
            to: Some(to.to_string()),
            group_id: None,
            message: body.to_string(),
            timestamp: timestamp.to_string(),
            read: false,
        }
    }

    fn group(from: &str, group_id: &str, body: &str) -> MessageRecord {
        MessageRecord {
            id: body.to_string(),
            kind: MessageKind::Group,
            from: "conn".to_string(),
            from_username: from.to_string(),
            to: None,
            group_id: Some(group_id.to_string()),
            message: body.to_string(),
            timestamp: "2023-01-01T00:00:00+00:00".to_string(),
            read: false,
        }
    }

    #[test]
    fn test_conversation_history_matches_direct_pair_case_insensitively() {
        // テスト項目: 2 者間のダイレクト履歴が大文字小文字を無視して
        //             双方向に取れる
        // given (前提条件):
        let messages = vec![
            direct("Alice", "bob", "a->b", "2023-01-01T00:00:01+00:00"),
            direct("BOB", "alice", "b->a", "2023-01-01T00:00:02+00:00"),
            direct("alice", "carol", "a->c", "2023-01-01T00:00:03+00:00"),
        ];

        // when (操作):
        let history = conversation_history(&messages, "Bob", Some("alice"));

        // then (期待する結果): ログ順のまま両方向が含まれる
        let bodies: Vec<&str> = history.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(bodies, vec!["a->b", "b->a"]);
    }

    #[test]
    fn test_conversation_history_for_group_matches_group_id_only() {
        // テスト項目: グループ履歴はグループ ID の完全一致で取れる
        // given (前提条件):
        let messages = vec![
            group("alice", "group_1", "in group 1"),
            group("bob", "group_2", "in group 2"),
            direct("alice", "bob", "direct", "2023-01-01T00:00:01+00:00"),
        ];

        // when (操作):
        let history = conversation_history(&messages, "group_1", None);

        // then (期待する結果):
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].message, "in group 1");
    }

    #[test]
    fn test_direct_history_without_current_user_is_empty() {
        // テスト項目: current_user 無しではダイレクト履歴が返らない
        // given (前提条件):
        let messages = vec![direct("alice", "bob", "hi", "2023-01-01T00:00:01+00:00")];

        // when (操作):
        let history = conversation_history(&messages, "bob", None);

        // then (期待する結果):
        assert!(history.is_empty());
    }

    #[test]
    fn test_user_message_log_includes_both_roles_and_sorts_newest_first() {
        // テスト項目: 送信・受信の両方が含まれ、新しい順に並ぶ
        // given (前提条件):
        let messages = vec![
            direct("alice", "bob", "oldest", "2023-01-01T00:00:01+00:00"),
            direct("carol", "ALICE", "newest", "2023-01-01T00:00:03+00:00"),
            direct("bob", "alice", "middle", "2023-01-01T00:00:02+00:00"),
            group("alice", "group_1", "group noise"),
        ];

        // when (操作):
        let log = user_message_log(&messages, "Alice");

        // then (期待する結果): グループメッセージは含まれない
        let bodies: Vec<&str> = log.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(bodies, vec!["newest", "middle", "oldest"]);
    }

    #[test]
    fn test_user_message_log_tie_break_is_append_order() {
        // テスト項目: 同時刻のメッセージは追記順が保たれる（安定ソート）
        // given (前提条件):
        let same_instant = "2023-01-01T00:00:01+00:00";
        let messages = vec![
            direct("alice", "bob", "first appended", same_instant),
            direct("alice", "bob", "second appended", same_instant),
        ];

        // when (操作):
        let log = user_message_log(&messages, "alice");

        // then (期待する結果):
        let bodies: Vec<&str> = log.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(bodies, vec!["first appended", "second appended"]);
    }
}
