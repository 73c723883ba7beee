/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Render Unix millis as RFC 3339 (UTC) for human-facing messages.
///
/// Out-of-range values fall back to the raw number.
pub fn format_millis(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
        .unwrap_or_else(|| millis.to_string())
}

/// Latest timestamp accepted from callers (9999-12-31T23:59:59.999Z)
pub const MAX_TIMESTAMP_MILLIS: i64 = 253_402_300_799_999;

/// Minutes → millis
pub const fn minutes_to_millis(minutes: i64) -> i64 {
    minutes * 60 * 1000
}

/// Minutes → millis, `None` on overflow
pub const fn checked_minutes_to_millis(minutes: i64) -> Option<i64> {
    minutes.checked_mul(60 * 1000)
}
