//! タイピングインジケータの状態機械
//!
//! 最後の入力から 2 秒間何も起きなければ stop-typing を自動送出する。
//! 入力のたびにタイマーはリセットされる。システム全体で唯一の
//! タイムアウトを持つコンポーネント。

use std::time::{Duration, Instant};

/// Inactivity window after which stop-typing is auto-emitted.
pub const TYPING_IDLE_TIMEOUT: Duration = Duration::from_secs(2);

/// Local typing state for the currently open conversation.
#[derive(Debug, Default)]
pub struct TypingTracker {
    active: bool,
    deadline: Option<Instant>,
}

impl TypingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one keystroke / input activity.
    ///
    /// Returns `true` when a `typing` signal should be emitted (the state
    /// just flipped to active). The auto-stop deadline is reset either way.
    pub fn note_activity(&mut self, now: Instant) -> bool {
        let newly_active = !self.active;
        self.active = true;
        self.deadline = Some(now + TYPING_IDLE_TIMEOUT);
        newly_active
    }

    /// Check whether the idle timeout expired.
    ///
    /// Returns `true` when a `stop-typing` signal should be emitted; the
    /// tracker returns to idle.
    pub fn poll_expired(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if self.active && now >= deadline => {
                self.active = false;
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Explicitly stop (a message was sent).
    ///
    /// Returns `true` when a `stop-typing` signal should be emitted.
    pub fn stop(&mut self) -> bool {
        let was_active = self.active;
        self.active = false;
        self.deadline = None;
        was_active
    }

    /// Deadline for the pending auto-stop, if typing is active.
    pub fn deadline(&self) -> Option<Instant> {
        if self.active { self.deadline } else { None }
    }
}
