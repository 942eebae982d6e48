//! ワイヤプロトコル定義
//!
//! WebSocket 上を流れるイベントと、HTTP API / 永続化ファイルで共有される
//! レコードの定義。イベントは `type` フィールドでタグ付けされた JSON
//! テキストフレーム、フィールド名は camelCase。サーバーとクライアントが
//! 同じ定義を使うため shared クレートに置く。

use serde::{Deserialize, Serialize};

/// A persisted or live user, as exposed on the wire (no password).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub username: String,
    pub avatar: String,
    #[serde(default)]
    pub online: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Message kind: a direct (one-to-one) message or a group message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Direct,
    Group,
}

/// One entry of the append-only message log.
///
/// Direct messages carry `to`, group messages carry `group_id`. The `from`
/// field is the sending connection id; identity for routing and
/// reconciliation is `from_username`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub from: String,
    pub from_username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub message: String,
    pub timestamp: String,
    #[serde(default)]
    pub read: bool,
}

/// A persisted group record. Membership is fixed at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRecord {
    pub id: String,
    pub name: String,
    pub creator: String,
    pub members: Vec<String>,
    pub created_at: String,
    pub avatar: String,
}

/// Events sent from a client to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Create an account (durable; distinct from binding a live session).
    RegisterUser {
        username: String,
        password: String,
        #[serde(default)]
        avatar: Option<String>,
    },
    /// Check credentials against the durable user store.
    LoginUser { username: String, password: String },
    /// Bind this connection to a username (admission). Evicts any prior
    /// session held by the same case-folded username.
    Register { username: String, avatar: String },
    /// Request the durable user list.
    GetUsers,
    /// Send a direct message.
    PrivateMessage {
        to: String,
        message: String,
        from: String,
        from_username: String,
    },
    /// Create a group with a fixed member set.
    CreateGroup {
        group_name: String,
        members: Vec<String>,
        creator: String,
    },
    /// Join the fan-out room of a group (idempotent).
    JoinGroup { group_id: String },
    /// Send a message to a group room.
    GroupMessage {
        group_id: String,
        message: String,
        from: String,
        from_username: String,
    },
    /// Ephemeral typing signal, never persisted.
    Typing {
        to: String,
        from: String,
        is_group: bool,
    },
    /// Ephemeral end-of-typing signal, never persisted.
    StopTyping {
        to: String,
        from: String,
        is_group: bool,
    },
}

/// Events sent from the server to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Account creation acknowledgment.
    RegisterResponse { success: bool, message: String },
    /// Login acknowledgment.
    LoginResponse {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        username: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        avatar: Option<String>,
        message: String,
    },
    /// Session admission acknowledgment, sent to the admitted connection.
    Registered { success: bool, user: UserRecord },
    /// Roster or durable user list.
    UsersList { users: Vec<UserRecord> },
    /// Presence: a user connected (sent to everyone else).
    UserConnected { user: UserRecord },
    /// Presence: a user disconnected (sent to everyone remaining).
    UserDisconnected {
        username: String,
        last_seen: String,
    },
    /// Direct message delivery to the recipient.
    ReceiveMessage { message: MessageRecord },
    /// Send acknowledgment back to the sender of a direct message.
    MessageSent { message: MessageRecord },
    /// Group creation acknowledgment to the creator.
    GroupCreated { group: GroupRecord },
    /// Group creation rejection (inline acknowledgment, not a fault).
    GroupError { message: String },
    /// Invitation event to a non-creator member of a new group.
    NewGroup { group: GroupRecord },
    /// Group message delivery; each room member receives exactly one.
    ReceiveGroupMessage { message: MessageRecord },
    /// Typing relay.
    UserTyping {
        from: String,
        #[serde(default)]
        is_group: bool,
    },
    /// End-of-typing relay.
    UserStopTyping { from: String },
}

impl ServerEvent {
    /// Serialize for a WebSocket text frame.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("server event serializes to JSON")
    }
}

impl ClientEvent {
    /// Serialize for a WebSocket text frame.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("client event serializes to JSON")
    }
}
