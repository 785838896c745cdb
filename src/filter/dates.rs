use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Formats tried before falling back to generic ISO-8601 parsing.
const BOUND_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Generic fallbacks (space separator, minute precision).
const FALLBACK_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"];

/// Parse a date bound. Returns `None` for blank or unparseable input.
pub fn parse_bound(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    for fmt in BOUND_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = s.parse::<NaiveDateTime>() {
        return Some(dt);
    }
    FALLBACK_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Last representable microsecond of the bound's calendar day.
pub fn end_of_day(dt: NaiveDateTime) -> NaiveDateTime {
    dt.date()
        .and_hms_micro_opt(23, 59, 59, 999_999)
        .unwrap_or(dt)
}
