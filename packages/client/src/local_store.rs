//! ログインユーザーごとのローカル永続状態
//!
//! チャットリストのフィルタ（削除・アーカイブ済みの会話キー）と、
//! オフライン復元用のグループキャッシュを、ユーザー名で名前空間を
//! 分けた JSON ファイルに保存する。削除済みセットには予約された
//! 不正キーが常に種として入り、保存しても消えない。

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use idobata_shared::{
    identity::{RESERVED_KEYS, is_reserved_key, same_user},
    protocol::GroupRecord,
};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Conversation keys filtered out of the rendered chat list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationFilters {
    pub deleted: HashSet<String>,
    pub archived: HashSet<String>,
}

impl ConversationFilters {
    /// Empty filters with the reserved keys seeded into the deleted set.
    pub fn with_reserved_keys() -> Self {
        let mut filters = Self::default();
        filters.seed_reserved_keys();
        filters
    }

    /// Reserved keys are always present in the deleted set.
    pub fn seed_reserved_keys(&mut self) {
        for key in RESERVED_KEYS {
            self.deleted.insert(key.to_string());
        }
    }

    /// Is this conversation key suppressed (deleted or archived)?
    pub fn is_filtered(&self, key: &str) -> bool {
        self.is_deleted(key) || self.is_archived(key)
    }

    pub fn is_deleted(&self, key: &str) -> bool {
        is_reserved_key(key) || contains_key(&self.deleted, key)
    }

    pub fn is_archived(&self, key: &str) -> bool {
        contains_key(&self.archived, key)
    }

    /// Soft-delete a conversation.
    pub fn delete(&mut self, key: &str) {
        self.deleted.insert(key.to_string());
    }

    /// Archive a conversation.
    pub fn archive(&mut self, key: &str) {
        self.archived.insert(key.to_string());
    }

    /// Revoke a soft delete because a new inbound message arrived.
    ///
    /// Reserved keys are never revived. Returns whether anything changed
    /// (callers persist the filters when it did).
    pub fn revive(&mut self, key: &str) -> bool {
        if is_reserved_key(key) {
            return false;
        }
        let before = self.deleted.len();
        self.deleted
            .retain(|k| is_reserved_key(k) || !same_user(k, key));
        self.deleted.len() != before
    }
}

fn contains_key(set: &HashSet<String>, key: &str) -> bool {
    set.iter().any(|k| k == key || same_user(k, key))
}

/// Per-username local state directory.
///
/// Layout: `<root>/<username>/chats.json` and `<root>/<username>/groups.json`.
pub struct LocalStateStore {
    root: PathBuf,
}

impl LocalStateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn user_dir(&self, username: &str) -> PathBuf {
        // Namespaced by folded username so "Alice" and "alice" share state.
        self.root
            .join(idobata_shared::identity::normalize_username(username))
    }

    fn chats_path(&self, username: &str) -> PathBuf {
        self.user_dir(username).join("chats.json")
    }

    fn groups_path(&self, username: &str) -> PathBuf {
        self.user_dir(username).join("groups.json")
    }

    /// Load the conversation filters, seeding reserved keys.
    ///
    /// Unreadable or corrupt state falls back to the seeded default; losing
    /// a local filter file must never block login.
    pub fn load_filters(&self, username: &str) -> ConversationFilters {
        let mut filters = match read_json::<ConversationFilters>(&self.chats_path(username)) {
            Ok(Some(filters)) => filters,
            Ok(None) => ConversationFilters::default(),
            Err(e) => {
                tracing::warn!("Failed to load chat filters, starting fresh: {}", e);
                ConversationFilters::default()
            }
        };
        filters.seed_reserved_keys();
        filters
    }

    /// Persist the conversation filters.
    pub fn save_filters(
        &self,
        username: &str,
        filters: &ConversationFilters,
    ) -> Result<(), ClientError> {
        write_json(&self.chats_path(username), filters)
    }

    /// Load the cached groups for offline membership replay.
    pub fn load_groups(&self, username: &str) -> Vec<GroupRecord> {
        match read_json::<Vec<GroupRecord>>(&self.groups_path(username)) {
            Ok(Some(groups)) => groups,
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to load cached groups: {}", e);
                Vec::new()
            }
        }
    }

    /// Add or update one group in the cache.
    pub fn save_group(&self, username: &str, group: &GroupRecord) -> Result<(), ClientError> {
        let mut groups = self.load_groups(username);
        match groups.iter_mut().find(|g| g.id == group.id) {
            Some(existing) => *existing = group.clone(),
            None => groups.push(group.clone()),
        }
        write_json(&self.groups_path(username), &groups)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, ClientError> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ClientError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("idobata-local-test-{}", uuid::Uuid::new_v4()))
    }

    fn sample_group(id: &str, name: &str) -> GroupRecord {
        GroupRecord {
            id: id.to_string(),
            name: name.to_string(),
            creator: "alice".to_string(),
            members: vec!["alice".to_string(), "bob".to_string()],
            created_at: "2023-01-01T00:00:00+00:00".to_string(),
            avatar: "👥".to_string(),
        }
    }

    #[test]
    fn test_fresh_filters_contain_reserved_keys() {
        // テスト項目: 初回ロードでも予約キーが削除済みセットに入る
        // given (前提条件):
        let store = LocalStateStore::new(temp_root());

        // when (操作):
        let filters = store.load_filters("alice");

        // then (期待する結果):
        assert!(filters.is_deleted("undefined"));
        assert!(filters.is_deleted("null"));
        assert!(filters.is_deleted(""));
    }

    #[test]
    fn test_filters_round_trip_per_username() {
        // テスト項目: フィルタがユーザーごとに保存・再読込できる
        // given (前提条件):
        let store = LocalStateStore::new(temp_root());
        let mut filters = store.load_filters("alice");
        filters.delete("bob");
        filters.archive("group_1");

        // when (操作):
        store.save_filters("alice", &filters).unwrap();
        let reloaded = store.load_filters("alice");
        let other_user = store.load_filters("carol");

        // then (期待する結果):
        assert!(reloaded.is_deleted("bob"));
        assert!(reloaded.is_archived("group_1"));
        assert!(!other_user.is_deleted("bob"));
    }

    #[test]
    fn test_filters_are_shared_across_username_casing() {
        // テスト項目: 大文字小文字違いのログインで同じ状態を読む
        // given (前提条件):
        let store = LocalStateStore::new(temp_root());
        let mut filters = store.load_filters("Alice");
        filters.delete("bob");
        store.save_filters("Alice", &filters).unwrap();

        // when (操作):
        let reloaded = store.load_filters("ALICE");

        // then (期待する結果):
        assert!(reloaded.is_deleted("bob"));
    }

    #[test]
    fn test_revive_removes_deleted_key_but_not_reserved() {
        // テスト項目: revive が削除キーを消し、予約キーは残す
        // given (前提条件):
        let mut filters = ConversationFilters::with_reserved_keys();
        filters.delete("Bob");

        // when (操作):
        let changed = filters.revive("bob");
        let reserved_attempt = filters.revive("undefined");

        // then (期待する結果):
        assert!(changed);
        assert!(!filters.is_deleted("Bob"));
        assert!(!reserved_attempt);
        assert!(filters.is_deleted("undefined"));
    }

    #[test]
    fn test_revive_of_unknown_key_reports_no_change() {
        // テスト項目: 削除されていないキーの revive は変更なしと報告する
        // given (前提条件):
        let mut filters = ConversationFilters::with_reserved_keys();

        // when (操作):
        let changed = filters.revive("bob");

        // then (期待する結果):
        assert!(!changed);
    }

    #[test]
    fn test_save_group_deduplicates_by_id() {
        // テスト項目: 同じグループ ID の保存が上書きになる
        // given (前提条件):
        let store = LocalStateStore::new(temp_root());
        store
            .save_group("alice", &sample_group("group_1", "old name"))
            .unwrap();

        // when (操作):
        store
            .save_group("alice", &sample_group("group_1", "new name"))
            .unwrap();

        // then (期待する結果):
        let groups = store.load_groups("alice");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "new name");
    }

    #[test]
    fn test_is_filtered_covers_deleted_and_archived() {
        // テスト項目: is_filtered が削除とアーカイブの両方を見る
        // given (前提条件):
        let mut filters = ConversationFilters::with_reserved_keys();
        filters.delete("bob");
        filters.archive("carol");

        // when (操作) / then (期待する結果):
        assert!(filters.is_filtered("bob"));
        assert!(filters.is_filtered("CAROL"));
        assert!(!filters.is_filtered("dave"));
    }
}
