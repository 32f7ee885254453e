use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Parse the calendar date at the start of a Notion/Todoist date string.
///
/// Accepts both `2025-01-15` and date-times such as
/// `2025-01-15T09:30:00.000+00:00`; only the date part is kept.
pub fn parse_due_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let prefix = s.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

/// Parse a creation timestamp into UTC.
///
/// Todoist emits `2019-12-11T22:36:50.000000Z`, Notion emits
/// `2022-03-01T19:05:00.000Z`. Both are RFC 3339; a bare naive
/// date-time is treated as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Format a date the way both APIs expect it.
pub fn format_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}
