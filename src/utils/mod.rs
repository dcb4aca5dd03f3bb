use chrono::{DateTime, SecondsFormat, Utc};

/// 计数所用的 UTC 日期，例如 `2024-03-01`
pub fn day_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// 毫秒精度的 RFC 3339 时间戳，例如 `2024-03-01T12:00:00.000Z`
pub fn iso_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub mod error_codes {
    pub const VALIDATION_ERROR: i32 = 1000;
    pub const RATE_LIMIT: i32 = 1005;
    pub const INTERNAL_ERROR: i32 = 5000;
}
