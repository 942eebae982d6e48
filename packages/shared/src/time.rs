//! Time-related utilities with clock abstraction for testability.

use chrono::{DateTime, TimeZone, Utc};

/// Clock trait for dependency injection and testing
pub trait Clock: Send + Sync {
    /// Get current Unix timestamp in UTC (milliseconds)
    fn now_utc_millis(&self) -> i64;

    /// Get the current instant as an RFC 3339 string
    fn now_rfc3339(&self) -> String {
        timestamp_to_rfc3339(self.now_utc_millis())
    }
}

/// System clock implementation (uses actual system time)
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc_millis(&self) -> i64 {
        get_utc_timestamp()
    }
}

/// Fixed clock implementation for testing (returns a fixed time)
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    fixed_time: i64,
}

impl FixedClock {
    /// Create a new fixed clock with the given timestamp
    pub fn new(fixed_time_millis: i64) -> Self {
        Self {
            fixed_time: fixed_time_millis,
        }
    }
}

impl Clock for FixedClock {
    fn now_utc_millis(&self) -> i64 {
        self.fixed_time
    }
}

/// Get current Unix timestamp in UTC (milliseconds)
pub fn get_utc_timestamp() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert Unix timestamp (milliseconds) to RFC 3339 format
pub fn timestamp_to_rfc3339(timestamp_millis: i64) -> String {
    let seconds = timestamp_millis.div_euclid(1000);
    let nanos = (timestamp_millis.rem_euclid(1000) * 1_000_000) as u32;
    match Utc.timestamp_opt(seconds, nanos) {
        chrono::LocalResult::Single(dt) => dt.to_rfc3339(),
        _ => Utc.timestamp_opt(0, 0).unwrap().to_rfc3339(),
    }
}

/// Parse an RFC 3339 timestamp back to Unix milliseconds.
///
/// Returns `None` for unparseable input so callers can decide how to
/// order records with broken timestamps.
pub fn rfc3339_to_millis(timestamp: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(timestamp)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_returns_non_zero_timestamp() {
        // テスト項目: SystemClock が 0 以外のタイムスタンプを返す
        // given (前提条件):
        let clock = SystemClock;

        // when (操作):
        let timestamp = clock.now_utc_millis();

        // then (期待する結果):
        assert!(timestamp > 0);
    }

    #[test]
    fn test_fixed_clock_returns_fixed_timestamp() {
        // テスト項目: FixedClock が固定されたタイムスタンプを返す
        // given (前提条件):
        let fixed_time = 1234567890123;
        let clock = FixedClock::new(fixed_time);

        // when (操作):
        let timestamp = clock.now_utc_millis();

        // then (期待する結果):
        assert_eq!(timestamp, fixed_time);
    }

    #[test]
    fn test_timestamp_to_rfc3339_format() {
        // テスト項目: タイムスタンプが正しく RFC 3339 形式に変換される
        // given (前提条件):
        // 2023-01-01 00:00:00 UTC in milliseconds
        let timestamp = 1672531200000;

        // when (操作):
        let result = timestamp_to_rfc3339(timestamp);

        // then (期待する結果):
        assert!(result.starts_with("2023-01-01T00:00:00"));
        assert!(result.contains("+00:00"));
    }

    #[test]
    fn test_rfc3339_round_trip_preserves_millis() {
        // テスト項目: RFC 3339 への変換と逆変換でミリ秒が保存される
        // given (前提条件):
        let timestamp = 1672531200123;

        // when (操作):
        let rendered = timestamp_to_rfc3339(timestamp);
        let parsed = rfc3339_to_millis(&rendered);

        // then (期待する結果):
        assert_eq!(parsed, Some(timestamp));
    }

    #[test]
    fn test_rfc3339_to_millis_rejects_garbage() {
        // テスト項目: 不正なタイムスタンプ文字列は None になる
        // given (前提条件):
        let garbage = "not-a-timestamp";

        // when (操作):
        let parsed = rfc3339_to_millis(garbage);

        // then (期待する結果):
        assert_eq!(parsed, None);
    }

    #[test]
    fn test_clock_now_rfc3339_uses_clock_millis() {
        // テスト項目: Clock::now_rfc3339 がクロックのミリ秒から導出される
        // given (前提条件):
        let clock = FixedClock::new(1672531200000);

        // when (操作):
        let rendered = clock.now_rfc3339();

        // then (期待する結果):
        assert!(rendered.starts_with("2023-01-01T00:00:00"));
    }
}
