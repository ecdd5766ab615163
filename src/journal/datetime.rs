//! Lenient time and date parsing for agent output.
//!
//! The agent writes times and dates the way a person would ("15:00", "3pm",
//! "02/05/2025"). Anything that cannot be read becomes `None`, which the
//! conflict detector then treats as a missing field.

use chrono::{NaiveDate, NaiveTime};

/// Parse a wall-clock time: `HH:MM`, `HH:MM:SS`, `HH.MM`, or 12-hour forms such
/// as `3pm`, `3 pm`, `3:30 PM`.
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in ["%H:%M", "%H:%M:%S", "%H.%M"] {
        if let Ok(t) = NaiveTime::parse_from_str(s, fmt) {
            return Some(t);
        }
    }

    let lower = s.to_ascii_lowercase().replace('.', "");
    let (body, pm) = if let Some(b) = lower.strip_suffix("pm") {
        (b.trim(), true)
    } else if let Some(b) = lower.strip_suffix("am") {
        (b.trim(), false)
    } else {
        return None;
    };

    let (hour, minute) = match body.split_once(':') {
        Some((h, m)) => (h.parse::<u32>().ok()?, m.parse::<u32>().ok()?),
        None => (body.parse::<u32>().ok()?, 0),
    };
    if !(1..=12).contains(&hour) {
        return None;
    }
    let hour = match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Parse a calendar date. ISO first, then day-first numeric forms, then
/// spelled-out months. An ISO datetime is cut down to its date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    const FORMATS: [&str; 9] = [
        "%Y-%m-%d", "%d/%m/%Y", "%d.%m.%Y", "%d-%m-%Y", "%Y/%m/%d", "%d %B %Y", "%d %b %Y",
        "%B %d, %Y", "%b %d, %Y",
    ];
    for fmt in FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }

    // 2025-05-02T10:00:00Z and friends
    match (s.get(..10), s.as_bytes().get(10)) {
        (Some(head), Some(b'T' | b' ')) => NaiveDate::parse_from_str(head, "%Y-%m-%d").ok(),
        _ => None,
    }
}

/// Render an optional time the way the journal stores it.
pub fn format_time(time: Option<NaiveTime>) -> String {
    time.map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "—".into())
}

/// Serde adapter for `Option<NaiveTime>` stored as `"HH:MM"`.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
        match time {
            Some(t) => s.serialize_str(&t.format("%H:%M").to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => super::parse_time(s)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid time: {s}"))),
        }
    }
}
