//! グループ ID ファクトリ
//!
//! グループ ID は `group_<UTCミリ秒>` 形式。メッセージ ID と同じく
//! 同一ミリ秒での採番は繰り上げて一意性を保つ。

use std::sync::atomic::{AtomicI64, Ordering};

/// Avatar glyph assigned to every group.
pub const GROUP_AVATAR: &str = "👥";

/// Factory for time-derived, unique group ids.
pub struct GroupIdFactory {
    last_issued: AtomicI64,
}

impl GroupIdFactory {
    pub fn new() -> Self {
        Self {
            last_issued: AtomicI64::new(0),
        }
    }

    /// Issue the next group id for a group created at `now_millis`.
    pub fn next(&self, now_millis: i64) -> String {
        let issued = self
            .last_issued
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now_millis.max(last + 1))
            })
            .map(|last| now_millis.max(last + 1))
            .unwrap_or(now_millis);
        format!("group_{issued}")
    }
}

impl Default for GroupIdFactory {
    fn default() -> Self {
        Self::new()
    }
}
