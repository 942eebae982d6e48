//! JSON ファイルによる ChatStore 実装
//!
//! `users.json` / `messages.json` / `groups.json` の 3 コレクションを
//! データディレクトリ直下に保持する。書き込みは一時ファイルへ書いて
//! rename する方式で、途中で落ちても壊れたファイルが残らない。
//! コレクションごとに 1 つの mutex を持ち、同一ファイルへの読み書きを
//! 直列化する。
//!
//! ## 技術的負債
//!
//! 追記のたびにコレクション全体を読み直して書き戻している。ログが
//! 大きくなったら行追記形式か DBMS への移行が必要になる。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use idobata_shared::protocol::{GroupRecord, MessageRecord};
use serde::{Serialize, de::DeserializeOwned};
use tokio::{fs, sync::Mutex};

use crate::domain::{ChatStore, StoreError, StoredUser};

const USERS_FILE: &str = "users.json";
const MESSAGES_FILE: &str = "messages.json";
const GROUPS_FILE: &str = "groups.json";

/// File-backed store, one JSON array per collection.
pub struct JsonChatStore {
    data_dir: PathBuf,
    users_lock: Mutex<()>,
    messages_lock: Mutex<()>,
    groups_lock: Mutex<()>,
}

impl JsonChatStore {
    /// Open a store rooted at `data_dir`, creating the directory and empty
    /// collection files when missing.
    pub async fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir).await.map_err(|source| {
            StoreError::Io {
                collection: "data directory",
                source,
            }
        })?;

        let store = Self {
            data_dir,
            users_lock: Mutex::new(()),
            messages_lock: Mutex::new(()),
            groups_lock: Mutex::new(()),
        };

        for file in [USERS_FILE, MESSAGES_FILE, GROUPS_FILE] {
            let path = store.data_dir.join(file);
            if fs::metadata(&path).await.is_err() {
                write_collection::<serde_json::Value>(&path, &[], "initial collection").await?;
            }
        }

        Ok(store)
    }

    fn path_of(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }
}

async fn read_collection<T: DeserializeOwned>(
    path: &Path,
    collection: &'static str,
) -> Result<Vec<T>, StoreError> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => return Err(StoreError::Io { collection, source }),
    };
    serde_json::from_str(&raw).map_err(|source| StoreError::Decode { collection, source })
}

async fn write_collection<T: Serialize>(
    path: &Path,
    items: &[T],
    collection: &'static str,
) -> Result<(), StoreError> {
    let raw = serde_json::to_string_pretty(items)
        .map_err(|source| StoreError::Decode { collection, source })?;

    // Write-then-rename keeps the previous file intact on failure.
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, raw)
        .await
        .map_err(|source| StoreError::Io { collection, source })?;
    fs::rename(&tmp, path)
        .await
        .map_err(|source| StoreError::Io { collection, source })
}

#[async_trait]
impl ChatStore for JsonChatStore {
    async fn load_users(&self) -> Result<Vec<StoredUser>, StoreError> {
        let _guard = self.users_lock.lock().await;
        read_collection(&self.path_of(USERS_FILE), "users").await
    }

    async fn replace_users(&self, users: Vec<StoredUser>) -> Result<(), StoreError> {
        let _guard = self.users_lock.lock().await;
        write_collection(&self.path_of(USERS_FILE), &users, "users").await
    }

    async fn load_messages(&self) -> Result<Vec<MessageRecord>, StoreError> {
        let _guard = self.messages_lock.lock().await;
        read_collection(&self.path_of(MESSAGES_FILE), "messages").await
    }

    async fn append_message(&self, message: MessageRecord) -> Result<(), StoreError> {
        let _guard = self.messages_lock.lock().await;
        let path = self.path_of(MESSAGES_FILE);
        let mut messages: Vec<MessageRecord> = read_collection(&path, "messages").await?;
        messages.push(message);
        write_collection(&path, &messages, "messages").await
    }

    async fn load_groups(&self) -> Result<Vec<GroupRecord>, StoreError> {
        let _guard = self.groups_lock.lock().await;
        read_collection(&self.path_of(GROUPS_FILE), "groups").await
    }

    async fn append_group(&self, group: GroupRecord) -> Result<(), StoreError> {
        let _guard = self.groups_lock.lock().await;
        let path = self.path_of(GROUPS_FILE);
        let mut groups: Vec<GroupRecord> = read_collection(&path, "groups").await?;
        groups.push(group);
        write_collection(&path, &groups, "groups").await
    }
}
