//! ユーザー識別のルール
//!
//! ユーザー名の比較はシステム全体で case-insensitive。比較のたびに
//! 各コンポーネントが独自に小文字化すると、サーバーとクライアントで
//! ルールがずれていくため、正規化はこのモジュールに一本化する。
//!
//! 会話キー（チャットリストのバケツを決める識別子）には予約された
//! 不正値が 3 つある: `"undefined"`, `"null"`, 空文字列。これらは
//! 履歴にどんなレコードが混ざっていても表示されてはならない。

/// Normalize a username for identity comparison.
///
/// All components (registry lookups, routing, reconciliation) compare
/// usernames through this function and nothing else.
pub fn normalize_username(username: &str) -> String {
    username.to_lowercase()
}

/// Case-insensitive username equality.
pub fn same_user(a: &str, b: &str) -> bool {
    normalize_username(a) == normalize_username(b)
}

/// Check whether a conversation key is one of the reserved invalid keys.
///
/// Reserved keys are filtered everywhere and never auto-revived.
pub fn is_reserved_key(key: &str) -> bool {
    key.trim().is_empty() || key == "undefined" || key == "null"
}

/// The reserved keys seeded into every persisted deleted set.
pub const RESERVED_KEYS: [&str; 3] = ["undefined", "null", ""];
