//! 会話リストの再構築
//!
//! フラットな履歴ログとローカルのフィルタ状態から、重複のない順序付き
//! チャットリストを導出する決定的な処理。会話はサーバー上の実体では
//! なく、(ログ, フィルタ) の純関数としてここで毎回導出される。同じ
//! 入力で何度実行しても同じリストになる（冪等）。
//!
//! 入力のダイレクト履歴は user-messages API が返す形（タイムスタンプ
//! 降順、同時刻は追記順）を想定する。counterpart ごとの latest-wins
//! マージは「より新しいタイムスタンプだけが置き換える」規則なので、
//! この入力では各 counterpart の最初の 1 件が勝つ。

use idobata_shared::{
    identity::{is_reserved_key, same_user},
    protocol::{GroupRecord, MessageKind, MessageRecord, UserRecord},
    time::rfc3339_to_millis,
};

use crate::local_store::ConversationFilters;

/// Placeholder avatar for counterparts with no live session.
pub const OFFLINE_AVATAR: &str = "😊";

/// Preview text of a group conversation that has no message yet.
const GROUP_CREATED_PREVIEW: &str = "Group created";

/// One rendered chat list entry, most recently active first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatListEntry {
    /// Conversation key: counterpart username for direct chats, group id
    /// for group chats.
    pub key: String,
    /// Display title: counterpart username or group name.
    pub title: String,
    pub avatar: String,
    pub preview: String,
    pub timestamp: String,
    pub message_count: usize,
    pub is_group: bool,
    pub online: bool,
}

/// Outcome of applying one live message to the chat list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveUpdate {
    /// The conversation key was removed from the deleted set; the caller
    /// must persist the filters.
    pub revived: bool,
    /// The chat list changed (entry created, updated or moved).
    pub listed: bool,
}

/// Compute the counterpart of a direct message for the logged-in user.
///
/// Returns `None` for group messages, for messages where the user is
/// neither sender nor recipient, and for reserved counterpart keys.
pub fn counterpart_of(message: &MessageRecord, me: &str) -> Option<String> {
    if message.kind != MessageKind::Direct {
        return None;
    }
    let from = message.from_username.as_str();
    let to = message.to.as_deref().unwrap_or_default();

    let other = if same_user(from, me) {
        to
    } else if same_user(to, me) {
        from
    } else {
        return None;
    };

    if is_reserved_key(other) {
        return None;
    }
    Some(other.to_string())
}

/// Rebuild the direct-chat part of the chat list from the history log.
///
/// Deterministic and idempotent: replaying the same log with the same
/// filters always yields the same list.
pub fn build_chat_list(
    log: &[MessageRecord],
    filters: &ConversationFilters,
    me: &str,
    presence: &[UserRecord],
) -> Vec<ChatListEntry> {
    let mut entries: Vec<ChatListEntry> = Vec::new();

    for message in log {
        let Some(counterpart) = counterpart_of(message, me) else {
            continue;
        };

        match entries
            .iter()
            .position(|entry| same_user(&entry.key, &counterpart))
        {
            Some(index) => {
                entries[index].message_count += 1;
                // より新しいタイムスタンプだけが latest を置き換える
                if millis_of(message) > millis_of_entry(&entries[index]) {
                    entries[index].preview = message.message.clone();
                    entries[index].timestamp = message.timestamp.clone();
                }
            }
            None => {
                entries.push(ChatListEntry {
                    key: counterpart.clone(),
                    title: counterpart,
                    avatar: String::new(),
                    preview: message.message.clone(),
                    timestamp: message.timestamp.clone(),
                    message_count: 1,
                    is_group: false,
                    online: false,
                });
            }
        }
    }

    let mut list: Vec<ChatListEntry> = entries
        .into_iter()
        .filter(|entry| !filters.is_filtered(&entry.key))
        .map(|mut entry| {
            resolve_presence(&mut entry, presence);
            entry
        })
        .collect();

    // 最近アクティブな会話が先頭。同時刻は導出順のまま（安定ソート）。
    list.sort_by_key(|entry| std::cmp::Reverse(rfc3339_to_millis(&entry.timestamp).unwrap_or(0)));
    list
}

/// Chat list entries for the cached groups the user is a member of.
pub fn group_entries(
    groups: &[GroupRecord],
    filters: &ConversationFilters,
    me: &str,
) -> Vec<ChatListEntry> {
    groups
        .iter()
        .filter(|group| !filters.is_filtered(&group.id))
        .filter(|group| group.members.iter().any(|member| same_user(member, me)))
        .map(|group| ChatListEntry {
            key: group.id.clone(),
            title: group.name.clone(),
            avatar: group.avatar.clone(),
            preview: GROUP_CREATED_PREVIEW.to_string(),
            timestamp: group.created_at.clone(),
            message_count: 0,
            is_group: true,
            online: false,
        })
        .collect()
}

/// Cached groups whose room the client should (re-)join on login:
/// not filtered, and the user is a member (case-insensitive).
pub fn groups_to_rejoin<'a>(
    groups: &'a [GroupRecord],
    filters: &ConversationFilters,
    me: &str,
) -> Vec<&'a GroupRecord> {
    groups
        .iter()
        .filter(|group| !filters.is_filtered(&group.id))
        .filter(|group| group.members.iter().any(|member| same_user(member, me)))
        .collect()
}

/// Apply one live inbound direct message to the chat list.
///
/// A message for a soft-deleted conversation revives it; the entry is
/// synthesized when missing, otherwise its preview is updated and it moves
/// to the top.
pub fn apply_live_direct(
    entries: &mut Vec<ChatListEntry>,
    filters: &mut ConversationFilters,
    message: &MessageRecord,
    me: &str,
    presence: &[UserRecord],
) -> LiveUpdate {
    let Some(counterpart) = counterpart_of(message, me) else {
        return LiveUpdate {
            revived: false,
            listed: false,
        };
    };

    let revived = filters.revive(&counterpart);

    if filters.is_archived(&counterpart) {
        return LiveUpdate {
            revived,
            listed: false,
        };
    }

    match entries
        .iter()
        .position(|entry| !entry.is_group && same_user(&entry.key, &counterpart))
    {
        Some(index) => {
            let mut entry = entries.remove(index);
            entry.preview = message.message.clone();
            entry.timestamp = message.timestamp.clone();
            entry.message_count += 1;
            entries.insert(0, entry);
        }
        None => {
            let mut entry = ChatListEntry {
                key: counterpart.clone(),
                title: counterpart,
                avatar: String::new(),
                preview: message.message.clone(),
                timestamp: message.timestamp.clone(),
                message_count: 1,
                is_group: false,
                online: false,
            };
            resolve_presence(&mut entry, presence);
            entries.insert(0, entry);
        }
    }

    LiveUpdate {
        revived,
        listed: true,
    }
}

/// Apply one live group message to the chat list.
///
/// An unknown group (not in the cache) only revives the key; the entry is
/// synthesized on the next login from the group cache.
pub fn apply_live_group(
    entries: &mut Vec<ChatListEntry>,
    filters: &mut ConversationFilters,
    message: &MessageRecord,
    groups: &[GroupRecord],
) -> LiveUpdate {
    let Some(group_id) = message.group_id.as_deref() else {
        return LiveUpdate {
            revived: false,
            listed: false,
        };
    };

    let revived = filters.revive(group_id);

    if filters.is_archived(group_id) {
        return LiveUpdate {
            revived,
            listed: false,
        };
    }

    match entries
        .iter()
        .position(|entry| entry.is_group && entry.key == group_id)
    {
        Some(index) => {
            let mut entry = entries.remove(index);
            entry.preview = message.message.clone();
            entry.timestamp = message.timestamp.clone();
            entry.message_count += 1;
            entries.insert(0, entry);
            LiveUpdate {
                revived,
                listed: true,
            }
        }
        None => match groups.iter().find(|group| group.id == group_id) {
            Some(group) => {
                entries.insert(
                    0,
                    ChatListEntry {
                        key: group.id.clone(),
                        title: group.name.clone(),
                        avatar: group.avatar.clone(),
                        preview: message.message.clone(),
                        timestamp: message.timestamp.clone(),
                        message_count: 1,
                        is_group: true,
                        online: false,
                    },
                );
                LiveUpdate {
                    revived,
                    listed: true,
                }
            }
            None => LiveUpdate {
                revived,
                listed: false,
            },
        },
    }
}

fn resolve_presence(entry: &mut ChatListEntry, presence: &[UserRecord]) {
    match presence.iter().find(|u| same_user(&u.username, &entry.key)) {
        Some(user) => {
            entry.avatar = user.avatar.clone();
            entry.online = true;
        }
        None => {
            entry.avatar = OFFLINE_AVATAR.to_string();
            entry.online = false;
        }
    }
}

fn millis_of(message: &MessageRecord) -> i64 {
    rfc3339_to_millis(&message.timestamp).unwrap_or(0)
}

fn millis_of_entry(entry: &ChatListEntry) -> i64 {
    rfc3339_to_millis(&entry.timestamp).unwrap_or(0)
}
