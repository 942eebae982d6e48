//! メッセージ ID ファクトリ
//!
//! メッセージ ID は時刻由来（UTC ミリ秒）でログ内一意。同一ミリ秒での
//! 連続採番は前回値 + 1 に繰り上げて衝突を避ける。壁時計が巻き戻っても
//! 採番は単調増加のまま進む。

use std::sync::atomic::{AtomicI64, Ordering};

/// Factory for time-derived, log-unique message ids.
pub struct MessageIdFactory {
    last_issued: AtomicI64,
}

impl MessageIdFactory {
    pub fn new() -> Self {
        Self {
            last_issued: AtomicI64::new(0),
        }
    }

    /// Issue the next id for a message created at `now_millis`.
    pub fn next(&self, now_millis: i64) -> String {
        let issued = self
            .last_issued
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now_millis.max(last + 1))
            })
            .map(|last| now_millis.max(last + 1))
            .unwrap_or(now_millis);
        issued.to_string()
    }
}

impl Default for MessageIdFactory {
    fn default() -> Self {
        Self::new()
    }
}
