//! ISO 8601 时间解析：工具参数中的日期/时间统一转为 UTC
//!
//! 接受 RFC 3339（带偏移或 Z）、`%Y-%m-%dT%H:%M:%S%z`、无时区的 `%Y-%m-%dT%H:%M:%S`（按 UTC）、纯日期（当日 00:00 UTC）。

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

pub fn parse_iso8601(raw: &str) -> Result<DateTime<Utc>, String> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z") {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }
    Err(format!("Invalid ISO 8601 date/time: {raw}"))
}

/// 秒级、带 Z 的 UTC 格式（Ticketmaster 要求）
pub fn to_utc_seconds(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variants() {
        let z = parse_iso8601("2024-07-01T10:00:00Z").unwrap();
        assert_eq!(to_utc_seconds(&z), "2024-07-01T10:00:00Z");

        let offset = parse_iso8601("2024-07-01T12:00:00+02:00").unwrap();
        assert_eq!(offset, z);

        let naive = parse_iso8601("2024-07-01T10:00:00").unwrap();
        assert_eq!(naive, z);

        let date = parse_iso8601("2024-07-01").unwrap();
        assert_eq!(to_utc_seconds(&date), "2024-07-01T00:00:00Z");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_iso8601("next tuesday").is_err());
    }
}
