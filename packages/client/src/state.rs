//! Client-side session state.

use idobata_shared::{
    identity::same_user,
    protocol::{GroupRecord, UserRecord},
};

use crate::{local_store::ConversationFilters, reconciler::ChatListEntry};

/// The conversation currently open in the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatTarget {
    Direct { username: String },
    Group { id: String, name: String },
}

impl ChatTarget {
    /// The wire target of typing signals for this conversation.
    pub fn typing_target(&self) -> (&str, bool) {
        match self {
            ChatTarget::Direct { username } => (username, false),
            ChatTarget::Group { id, .. } => (id, true),
        }
    }
}

/// Everything the read and input loops share about the logged-in session.
pub struct ClientState {
    pub username: String,
    pub avatar: String,
    /// Live users as reported by presence events, never including self.
    pub presence: Vec<UserRecord>,
    /// Known groups (server events + local cache replay).
    pub groups: Vec<GroupRecord>,
    /// Rendered chat list, most recently active first.
    pub chats: Vec<ChatListEntry>,
    pub filters: ConversationFilters,
    pub current_chat: Option<ChatTarget>,
}

impl ClientState {
    pub fn new(username: String, avatar: String, filters: ConversationFilters) -> Self {
        Self {
            username,
            avatar,
            presence: Vec::new(),
            groups: Vec::new(),
            chats: Vec::new(),
            filters,
            current_chat: None,
        }
    }

    /// Replace or add one live user; self is never tracked.
    pub fn upsert_presence(&mut self, user: UserRecord) {
        if same_user(&user.username, &self.username) {
            return;
        }
        match self
            .presence
            .iter_mut()
            .find(|u| same_user(&u.username, &user.username))
        {
            Some(existing) => *existing = user,
            None => self.presence.push(user),
        }
    }

    /// Drop a disconnected user from the live list.
    pub fn remove_presence(&mut self, username: &str) {
        self.presence.retain(|u| !same_user(&u.username, username));
    }

    /// Remember a group, deduplicated by id.
    pub fn upsert_group(&mut self, group: GroupRecord) {
        match self.groups.iter_mut().find(|g| g.id == group.id) {
            Some(existing) => *existing = group,
            None => self.groups.push(group),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(username: &str) -> UserRecord {
        UserRecord {
            username: username.to_string(),
            avatar: "🦀".to_string(),
            online: true,
            last_seen: None,
            created_at: None,
        }
    }

    fn state() -> ClientState {
        ClientState::new(
            "alice".to_string(),
            "🦀".to_string(),
            ConversationFilters::with_reserved_keys(),
        )
    }

    #[test]
    fn test_presence_never_tracks_self() {
        // テスト項目: 自分自身はプレゼンス一覧に載らない
        // given (前提条件):
        let mut state = state();

        // when (操作):
        state.upsert_presence(user("Alice"));

        // then (期待する結果):
        assert!(state.presence.is_empty());
    }

    #[test]
    fn test_presence_upsert_deduplicates_case_insensitively() {
        // テスト項目: 大文字小文字違いの再接続で重複しない
        // given (前提条件):
        let mut state = state();
        state.upsert_presence(user("bob"));

        // when (操作):
        state.upsert_presence(user("Bob"));

        // then (期待する結果):
        assert_eq!(state.presence.len(), 1);
        assert_eq!(state.presence[0].username, "Bob");
    }

    #[test]
    fn test_remove_presence_is_case_insensitive() {
        // テスト項目: 切断通知のユーザー名表記が違っても外れる
        // given (前提条件):
        let mut state = state();
        state.upsert_presence(user("Bob"));

        // when (操作):
        state.remove_presence("bob");

        // then (期待する結果):
        assert!(state.presence.is_empty());
    }
}
