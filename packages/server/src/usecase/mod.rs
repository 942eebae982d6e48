//! UseCase 層
//!
//! 1 操作 = 1 ユースケース。各ユースケースはコンストラクタで
//! Repository / Pusher / Registry の抽象を受け取り、永続化 → ファン
//! アウトの順序と不変条件をここで守る。

mod connect_session;
mod create_group;
mod disconnect_session;
mod error;
mod join_group;
mod login;
mod presence;
mod queries;
mod register_user;
mod send_direct_message;
mod send_group_message;
mod typing;

pub use connect_session::ConnectSessionUseCase;
pub use create_group::CreateGroupUseCase;
pub use disconnect_session::DisconnectSessionUseCase;
pub use error::{CreateGroupError, LoginError, RegisterError, SendMessageError};
pub use join_group::JoinGroupUseCase;
pub use login::LoginUseCase;
pub use presence::PresenceNotifier;
pub use queries::{
    GetGroupsUseCase, GetMessagesUseCase, GetUsersUseCase, conversation_history, user_message_log,
};
pub use register_user::RegisterUserUseCase;
pub use send_direct_message::SendDirectMessageUseCase;
pub use send_group_message::SendGroupMessageUseCase;
pub use typing::TypingUseCase;
