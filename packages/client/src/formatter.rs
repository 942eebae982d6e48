//! Message formatting utilities for terminal display.

use idobata_shared::protocol::{GroupRecord, MessageRecord, UserRecord};

use crate::reconciler::ChatListEntry;

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format the chat list, most recently active first
    pub fn format_chat_list(entries: &[ChatListEntry]) -> String {
        let mut output = String::new();
        output.push_str("\n============================================================\n");
        output.push_str("Chats:\n");

        if entries.is_empty() {
            output.push_str("(No conversations - use /users to find contacts)\n");
        } else {
            for entry in entries {
                let marker = if entry.is_group {
                    "#"
                } else if entry.online {
                    "*"
                } else {
                    " "
                };
                output.push_str(&format!(
                    "{} {} {} [{}] {} - {}\n",
                    marker,
                    entry.avatar,
                    entry.title,
                    entry.message_count,
                    truncate(&entry.preview, 30),
                    short_time(&entry.timestamp),
                ));
            }
        }

        output.push_str("============================================================\n");
        output
    }

    /// Format the online users list
    pub fn format_users(users: &[UserRecord]) -> String {
        let mut output = String::new();
        output.push_str("\nOnline users:\n");
        if users.is_empty() {
            output.push_str("(Nobody else is online)\n");
        } else {
            for user in users {
                output.push_str(&format!("  {} {}\n", user.avatar, user.username));
            }
        }
        output
    }

    /// Format one message inside an open conversation
    pub fn format_message(message: &MessageRecord, is_own: bool, in_group: bool) -> String {
        let time = short_time(&message.timestamp);
        if is_own {
            format!("[{}] (you) {}\n", time, message.message)
        } else if in_group {
            format!("[{}] {}: {}\n", time, message.from_username, message.message)
        } else {
            format!("[{}] @{}: {}\n", time, message.from_username, message.message)
        }
    }

    /// Format a presence notification
    pub fn format_user_connected(user: &UserRecord) -> String {
        format!("\n+ {} {} connected\n", user.avatar, user.username)
    }

    /// Format a disconnect notification
    pub fn format_user_disconnected(username: &str) -> String {
        format!("\n- {} disconnected\n", username)
    }

    /// Format the invitation to a freshly created group
    pub fn format_new_group(group: &GroupRecord) -> String {
        format!(
            "\n+ You were added to group \"{}\" ({} members)\n",
            group.name,
            group.members.len()
        )
    }

    /// Format a typing notification
    pub fn format_typing(from: &str) -> String {
        format!("\n... {} is typing\n", from)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}

fn short_time(timestamp: &str) -> String {
    match chrono::DateTime::parse_from_rfc3339(timestamp) {
        Ok(dt) => dt.format("%H:%M").to_string(),
        Err(_) => timestamp.to_string(),
    }
}
