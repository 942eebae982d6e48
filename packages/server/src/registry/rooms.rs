//! ルームディレクトリ
//!
//! グループごとのファンアウト用ルーム（接続の集合)を管理する。
//! 双方向のマップ（room → connections / connection → rooms)を持ち、
//! ブロードキャスト対象の列挙と切断時の一括離脱を O(1) 側から引ける。
//! join はメンバーシップを検証せず、二重 join は no-op。

use std::collections::{HashMap, HashSet};

use tokio::sync::Mutex;

use crate::domain::ConnectionId;

#[derive(Default)]
struct Inner {
    /// group id → joined connections
    members: HashMap<String, HashSet<ConnectionId>>,
    /// connection id → joined group ids
    rooms_of: HashMap<ConnectionId, HashSet<String>>,
}

/// Ephemeral fan-out rooms keyed by group id.
pub struct RoomDirectory {
    inner: Mutex<Inner>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Ensure a room exists for a freshly created group.
    pub async fn create_room(&self, group_id: &str) {
        let mut inner = self.inner.lock().await;
        inner.members.entry(group_id.to_string()).or_default();
    }

    /// Join a connection to a room. Idempotent; returns whether the
    /// connection was newly added.
    pub async fn join(&self, connection_id: &ConnectionId, group_id: &str) -> bool {
        let mut inner = self.inner.lock().await;
        let newly_joined = inner
            .members
            .entry(group_id.to_string())
            .or_default()
            .insert(connection_id.clone());
        if newly_joined {
            inner
                .rooms_of
                .entry(connection_id.clone())
                .or_default()
                .insert(group_id.to_string());
        }
        newly_joined
    }

    /// All connections joined to a room.
    pub async fn members(&self, group_id: &str) -> Vec<ConnectionId> {
        let inner = self.inner.lock().await;
        inner
            .members
            .get(group_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// All connections joined to a room except one.
    pub async fn members_except(
        &self,
        group_id: &str,
        exclude: &ConnectionId,
    ) -> Vec<ConnectionId> {
        let inner = self.inner.lock().await;
        inner
            .members
            .get(group_id)
            .map(|set| set.iter().filter(|id| *id != exclude).cloned().collect())
            .unwrap_or_default()
    }

    /// Remove a connection from every room it joined (disconnect cleanup).
    pub async fn leave_all(&self, connection_id: &ConnectionId) {
        let mut inner = self.inner.lock().await;
        if let Some(rooms) = inner.rooms_of.remove(connection_id) {
            for group_id in rooms {
                if let Some(members) = inner.members.get_mut(&group_id) {
                    members.remove(connection_id);
                }
            }
        }
    }
}

impl Default for RoomDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_join_is_idempotent() {
        // テスト項目: 二重 join が no-op になる
        // given (前提条件):
        let rooms = RoomDirectory::new();
        let conn = ConnectionId::new("conn-1");

        // when (操作):
        let first = rooms.join(&conn, "group_1").await;
        let second = rooms.join(&conn, "group_1").await;

        // then (期待する結果):
        assert!(first);
        assert!(!second);
        assert_eq!(rooms.members("group_1").await.len(), 1);
    }

    #[tokio::test]
    async fn test_members_except_excludes_sender() {
        // テスト項目: members_except が送信者の接続を除外する
        // given (前提条件):
        let rooms = RoomDirectory::new();
        let alice = ConnectionId::new("conn-a");
        let bob = ConnectionId::new("conn-b");
        let carol = ConnectionId::new("conn-c");
        rooms.join(&alice, "group_1").await;
        rooms.join(&bob, "group_1").await;
        rooms.join(&carol, "group_1").await;

        // when (操作):
        let targets = rooms.members_except("group_1", &alice).await;

        // then (期待する結果):
        assert_eq!(targets.len(), 2);
        assert!(!targets.contains(&alice));
        assert!(targets.contains(&bob));
        assert!(targets.contains(&carol));
    }

    #[tokio::test]
    async fn test_members_of_unknown_room_is_empty() {
        // テスト項目: 存在しないルームのメンバーは空になる
        // given (前提条件):
        let rooms = RoomDirectory::new();

        // when (操作):
        let members = rooms.members("group_missing").await;

        // then (期待する結果):
        assert!(members.is_empty());
    }

    #[tokio::test]
    async fn test_leave_all_removes_connection_from_every_room() {
        // テスト項目: leave_all で全ルームから離脱する
        // given (前提条件):
        let rooms = RoomDirectory::new();
        let conn = ConnectionId::new("conn-1");
        let other = ConnectionId::new("conn-2");
        rooms.join(&conn, "group_1").await;
        rooms.join(&conn, "group_2").await;
        rooms.join(&other, "group_1").await;

        // when (操作):
        rooms.leave_all(&conn).await;

        // then (期待する結果):
        assert!(!rooms.members("group_1").await.contains(&conn));
        assert!(rooms.members("group_2").await.is_empty());
        assert!(rooms.members("group_1").await.contains(&other));
    }

    #[tokio::test]
    async fn test_create_room_starts_empty() {
        // テスト項目: 作成直後のルームは空になる
        // given (前提条件):
        let rooms = RoomDirectory::new();

        // when (操作):
        rooms.create_room("group_1").await;

        // then (期待する結果):
        assert!(rooms.members("group_1").await.is_empty());
    }
}
