//! セッションレジストリ
//!
//! 接続とユーザー名の生きた対応を管理する。不変条件は「case-fold した
//! ユーザー名ごとに生きたセッションは高々 1 つ」。同じユーザー名での
//! 再ログインは先行セッションを黙って追い出す（後勝ち）。追い出された
//! 接続には何も通知されず、ルーム所属もその接続自身の切断まで残る。
//!
//! 全操作は内部の 1 つのロックで直列化されるため、同一ユーザー名への
//! 並行 admit も決定的にちょうど 1 つのセッションを残す。

use std::collections::HashMap;

use idobata_shared::identity::normalize_username;
use tokio::sync::Mutex;

use crate::domain::{ConnectionId, Session};

#[derive(Default)]
struct Inner {
    /// connection id → live session
    by_connection: HashMap<ConnectionId, Session>,
    /// case-folded username → connection id
    by_username: HashMap<String, ConnectionId>,
}

/// Registry of live connection → username bindings.
pub struct SessionRegistry {
    inner: Mutex<Inner>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Bind a connection to a username, evicting any prior session held by
    /// the same case-folded username. The evicted connection is not told.
    pub async fn admit(
        &self,
        connection_id: ConnectionId,
        username: String,
        avatar: String,
    ) -> Session {
        let folded = normalize_username(&username);
        let mut inner = self.inner.lock().await;

        // Latest login wins: drop the previous binding for this username.
        if let Some(previous) = inner.by_username.remove(&folded)
            && previous != connection_id
        {
            inner.by_connection.remove(&previous);
            tracing::info!(
                "Evicted prior session of '{}' on connection '{}'",
                username,
                previous
            );
        }

        // Re-registration on the same connection under a new name must not
        // leave a stale username binding behind.
        if let Some(existing) = inner.by_connection.remove(&connection_id) {
            let old_folded = normalize_username(&existing.username);
            if inner.by_username.get(&old_folded) == Some(&connection_id) {
                inner.by_username.remove(&old_folded);
            }
        }

        let session = Session {
            connection_id: connection_id.clone(),
            username,
            avatar,
        };
        inner.by_username.insert(folded, connection_id.clone());
        inner.by_connection.insert(connection_id, session.clone());
        session
    }

    /// Case-insensitive lookup of the live connection for a username.
    pub async fn lookup(&self, username: &str) -> Option<ConnectionId> {
        let inner = self.inner.lock().await;
        inner.by_username.get(&normalize_username(username)).cloned()
    }

    /// Session currently bound to a connection, if any.
    pub async fn session_of(&self, connection_id: &ConnectionId) -> Option<Session> {
        let inner = self.inner.lock().await;
        inner.by_connection.get(connection_id).cloned()
    }

    /// Unbind a connection. Safe to call for connections that were never
    /// admitted or whose binding was already evicted; returns the released
    /// session when one existed.
    pub async fn release(&self, connection_id: &ConnectionId) -> Option<Session> {
        let mut inner = self.inner.lock().await;
        let session = inner.by_connection.remove(connection_id)?;
        let folded = normalize_username(&session.username);
        if inner.by_username.get(&folded) == Some(connection_id) {
            inner.by_username.remove(&folded);
        }
        Some(session)
    }

    /// All live sessions.
    pub async fn roster(&self) -> Vec<Session> {
        let inner = self.inner.lock().await;
        inner.by_connection.values().cloned().collect()
    }

    /// Connections of all live sessions except one.
    pub async fn connections_except(&self, exclude: &ConnectionId) -> Vec<ConnectionId> {
        let inner = self.inner.lock().await;
        inner
            .by_connection
            .keys()
            .filter(|id| *id != exclude)
            .cloned()
            .collect()
    }

    /// Connections of all live sessions.
    pub async fn all_connections(&self) -> Vec<ConnectionId> {
        let inner = self.inner.lock().await;
        inner.by_connection.keys().cloned().collect()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_admit_binds_connection_to_username() {
        // テスト項目: admit で接続とユーザー名が結び付く
        // given (前提条件):
        let registry = SessionRegistry::new();
        let conn = ConnectionId::new("conn-1");

        // when (操作):
        registry
            .admit(conn.clone(), "alice".to_string(), "🦀".to_string())
            .await;

        // then (期待する結果):
        assert_eq!(registry.lookup("alice").await, Some(conn.clone()));
        let session = registry.session_of(&conn).await.unwrap();
        assert_eq!(session.username, "alice");
    }

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        // テスト項目: lookup が大文字小文字を区別しない
        // given (前提条件):
        let registry = SessionRegistry::new();
        let conn = ConnectionId::new("conn-1");
        registry
            .admit(conn.clone(), "Alice".to_string(), "🦀".to_string())
            .await;

        // when (操作):
        let found = registry.lookup("aLiCe").await;

        // then (期待する結果):
        assert_eq!(found, Some(conn));
    }

    #[tokio::test]
    async fn test_second_admit_evicts_prior_session() {
        // テスト項目: 同一ユーザー名の再 admit が先行セッションを追い出す
        // given (前提条件):
        let registry = SessionRegistry::new();
        let first = ConnectionId::new("conn-1");
        let second = ConnectionId::new("conn-2");
        registry
            .admit(first.clone(), "dave".to_string(), "🦀".to_string())
            .await;

        // when (操作): 別接続から同じユーザー名（大文字小文字違い）で admit
        registry
            .admit(second.clone(), "Dave".to_string(), "🦀".to_string())
            .await;

        // then (期待する結果): 先行接続は未認証扱いになる
        assert_eq!(registry.session_of(&first).await, None);
        assert_eq!(registry.lookup("dave").await, Some(second));
        assert_eq!(registry.roster().await.len(), 1);
    }

    #[tokio::test]
    async fn test_release_of_evicted_connection_is_noop() {
        // テスト項目: 追い出し後の release がレースしても新セッションを壊さない
        // given (前提条件):
        let registry = SessionRegistry::new();
        let first = ConnectionId::new("conn-1");
        let second = ConnectionId::new("conn-2");
        registry
            .admit(first.clone(), "dave".to_string(), "🦀".to_string())
            .await;
        registry
            .admit(second.clone(), "dave".to_string(), "🦀".to_string())
            .await;

        // when (操作): 追い出された接続が切断される
        let released = registry.release(&first).await;

        // then (期待する結果): 何も返らず、生きているセッションは残る
        assert_eq!(released, None);
        assert_eq!(registry.lookup("dave").await, Some(second));
    }

    #[tokio::test]
    async fn test_release_returns_session_and_unbinds() {
        // テスト項目: release がセッションを返し対応を解消する
        // given (前提条件):
        let registry = SessionRegistry::new();
        let conn = ConnectionId::new("conn-1");
        registry
            .admit(conn.clone(), "alice".to_string(), "🦀".to_string())
            .await;

        // when (操作):
        let released = registry.release(&conn).await;

        // then (期待する結果):
        assert_eq!(released.unwrap().username, "alice");
        assert_eq!(registry.lookup("alice").await, None);
        assert!(registry.roster().await.is_empty());
    }

    #[tokio::test]
    async fn test_re_register_on_same_connection_replaces_binding() {
        // テスト項目: 同一接続での再 register が古いユーザー名の対応を消す
        // given (前提条件):
        let registry = SessionRegistry::new();
        let conn = ConnectionId::new("conn-1");
        registry
            .admit(conn.clone(), "alice".to_string(), "🦀".to_string())
            .await;

        // when (操作):
        registry
            .admit(conn.clone(), "bob".to_string(), "🦞".to_string())
            .await;

        // then (期待する結果):
        assert_eq!(registry.lookup("alice").await, None);
        assert_eq!(registry.lookup("bob").await, Some(conn));
        assert_eq!(registry.roster().await.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_admits_leave_exactly_one_session() {
        // テスト項目: 同一ユーザー名への並行 admit 後に生きたセッションが
        //             ちょうど 1 つになる
        // given (前提条件):
        let registry = Arc::new(SessionRegistry::new());
        let mut handles = Vec::new();

        // when (操作): 8 接続が同時に同じユーザー名で admit する
        for i in 0..8 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry
                    .admit(
                        ConnectionId::new(format!("conn-{i}")),
                        "dave".to_string(),
                        "🦀".to_string(),
                    )
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // then (期待する結果):
        let roster = registry.roster().await;
        assert_eq!(roster.len(), 1);
        let winner = registry.lookup("dave").await.unwrap();
        assert_eq!(registry.session_of(&winner).await.unwrap().username, "dave");
    }

    #[tokio::test]
    async fn test_connections_except_excludes_the_given_connection() {
        // テスト項目: connections_except が指定接続を除外する
        // given (前提条件):
        let registry = SessionRegistry::new();
        let alice = ConnectionId::new("conn-a");
        let bob = ConnectionId::new("conn-b");
        registry
            .admit(alice.clone(), "alice".to_string(), "🦀".to_string())
            .await;
        registry
            .admit(bob.clone(), "bob".to_string(), "🦞".to_string())
            .await;

        // when (操作):
        let others = registry.connections_except(&alice).await;

        // then (期待する結果):
        assert_eq!(others, vec![bob]);
    }
}
