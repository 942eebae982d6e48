//! Server state shared across connection handlers.

use std::sync::Arc;

use crate::{
    domain::MessagePusher,
    usecase::{
        ConnectSessionUseCase, CreateGroupUseCase, DisconnectSessionUseCase, GetGroupsUseCase,
        GetMessagesUseCase, GetUsersUseCase, JoinGroupUseCase, LoginUseCase, RegisterUserUseCase,
        SendDirectMessageUseCase, SendGroupMessageUseCase, TypingUseCase,
    },
};

/// Shared application state
pub struct AppState {
    /// MessagePusher（接続チャンネルの登録と応答イベントの配送）
    pub message_pusher: Arc<dyn MessagePusher>,
    pub register_user_usecase: Arc<RegisterUserUseCase>,
    pub login_usecase: Arc<LoginUseCase>,
    pub connect_session_usecase: Arc<ConnectSessionUseCase>,
    pub disconnect_session_usecase: Arc<DisconnectSessionUseCase>,
    pub send_direct_message_usecase: Arc<SendDirectMessageUseCase>,
    pub send_group_message_usecase: Arc<SendGroupMessageUseCase>,
    pub create_group_usecase: Arc<CreateGroupUseCase>,
    pub join_group_usecase: Arc<JoinGroupUseCase>,
    pub typing_usecase: Arc<TypingUseCase>,
    pub get_users_usecase: Arc<GetUsersUseCase>,
    pub get_groups_usecase: Arc<GetGroupsUseCase>,
    pub get_messages_usecase: Arc<GetMessagesUseCase>,
}
