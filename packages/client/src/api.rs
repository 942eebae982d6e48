//! HTTP 一括読み出しクライアント
//!
//! 履歴リプレイと連絡先一覧のための stateless な API 呼び出し。
//! ライブなイベントは WebSocket 側が運ぶ。

use idobata_shared::protocol::{GroupRecord, MessageRecord, UserRecord};

use crate::error::ClientError;

/// Thin wrapper over the server's `/api` bulk read endpoints.
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// # Arguments
    ///
    /// * `base_url` - e.g. "http://127.0.0.1:8080"
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    /// All durable user records.
    pub async fn fetch_users(&self) -> Result<Vec<UserRecord>, ClientError> {
        let url = format!("{}/api/users", self.base_url);
        Ok(self.http.get(&url).send().await?.json().await?)
    }

    /// All persisted groups.
    pub async fn fetch_groups(&self) -> Result<Vec<GroupRecord>, ClientError> {
        let url = format!("{}/api/groups", self.base_url);
        Ok(self.http.get(&url).send().await?.json().await?)
    }

    /// Every direct message involving `username`, newest first.
    /// This is the reconciler's input.
    pub async fn fetch_user_messages(
        &self,
        username: &str,
    ) -> Result<Vec<MessageRecord>, ClientError> {
        let url = format!("{}/api/user-messages/{}", self.base_url, username);
        Ok(self.http.get(&url).send().await?.json().await?)
    }

    /// History of one conversation (direct counterpart or group id).
    pub async fn fetch_conversation(
        &self,
        chat_id: &str,
        current_user: &str,
    ) -> Result<Vec<MessageRecord>, ClientError> {
        let url = format!("{}/api/messages/{}", self.base_url, chat_id);
        Ok(self
            .http
            .get(&url)
            .query(&[("currentUser", current_user)])
            .send()
            .await?
            .json()
            .await?)
    }
}
