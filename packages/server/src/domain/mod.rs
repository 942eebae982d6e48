//! ドメイン層
//!
//! エンティティ、ID ファクトリ、そしてドメイン層が必要とする
//! インターフェース（`ChatStore`, `MessagePusher`）の定義。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

mod connection;
mod error;
mod group;
mod message;
mod pusher;
mod store;
mod user;

pub use connection::{ConnectionId, Session};
pub use error::StoreError;
pub use group::{GROUP_AVATAR, GroupIdFactory};
pub use message::MessageIdFactory;
pub use pusher::{MessagePushError, MessagePusher, PusherChannel};
pub use store::ChatStore;
pub use user::{DEFAULT_AVATAR, StoredUser};

#[cfg(test)]
pub use store::MockChatStore;
