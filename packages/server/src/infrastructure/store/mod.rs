//! 永続ストアの実装
//!
//! 現在は JSON ファイル実装のみ。将来的に: `sqlite`, `postgres` など。

mod json;

pub use json::JsonChatStore;
