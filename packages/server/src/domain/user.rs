//! Durable user records.

use idobata_shared::protocol::UserRecord;
use serde::{Deserialize, Serialize};

/// Avatar assigned when a client registers without one.
pub const DEFAULT_AVATAR: &str = "👤";

/// A user as stored in `users.json`.
///
/// Accounts created through `register-user` carry a password; records
/// seeded by a live session admission do not. Users are never hard-deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUser {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub avatar: String,
    #[serde(default)]
    pub online: bool,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<String>,
}

impl StoredUser {
    /// Wire representation, with the password stripped.
    pub fn to_record(&self) -> UserRecord {
        UserRecord {
            username: self.username.clone(),
            avatar: self.avatar.clone(),
            online: self.online,
            last_seen: self.last_seen.clone(),
            created_at: Some(self.created_at.clone()),
        }
    }
}
