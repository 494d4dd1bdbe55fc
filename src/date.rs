//! Date parsing and token-based formatting for `xf_dateformat`.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Utc};
use regex::Regex;
use tracing::warn;

use crate::value::Value;

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

// Longer tokens first: the regex crate picks the leftmost alternative.
static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"'[^']*'|yyyy|yy|MMMM|MMM|MM|M|dd|d|EEEE|E|HH|H|hh|h|mm|m|ss|s|SSS|a|A|Z")
        .expect("token pattern is valid")
});

const NAIVE_FORMATS: [&str; 5] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Parse a date from an RFC 3339 string, a naive ISO string (taken as UTC) or
/// a number of epoch milliseconds.
pub fn parse(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.naive_local());
            }
            for fmt in NAIVE_FORMATS {
                if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                    return Some(dt);
                }
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        }
        Value::Integer(ms) => DateTime::<Utc>::from_timestamp_millis(*ms).map(|dt| dt.naive_utc()),
        Value::Float(ms) if ms.is_finite() => {
            DateTime::<Utc>::from_timestamp_millis(ms.trunc() as i64).map(|dt| dt.naive_utc())
        }
        _ => None,
    }
}

/// Format `value` with `pattern`, an array of tokens or a pattern string.
///
/// Values that do not parse as dates come back unchanged.
pub fn format(value: &Value, pattern: &Value) -> Value {
    let Some(dt) = parse(value) else {
        return value.clone();
    };

    let mut out = String::new();
    match pattern {
        Value::Array(parts) => {
            for part in parts {
                match part {
                    Value::String(s) => match token(&dt, s) {
                        Some(formatted) => out.push_str(&formatted),
                        None => out.push_str(s),
                    },
                    other => out.push_str(&other.as_string()),
                }
            }
        }
        Value::String(s) => {
            let mut last = 0;
            for m in TOKEN.find_iter(s) {
                out.push_str(&s[last..m.start()]);
                let text = m.as_str();
                if let Some(quoted) = text.strip_prefix('\'') {
                    out.push_str(quoted.trim_end_matches('\''));
                } else if let Some(formatted) = token(&dt, text) {
                    out.push_str(&formatted);
                }
                last = m.end();
            }
            out.push_str(&s[last..]);
        }
        other => {
            warn!(pattern = ?other, "xf_dateformat pattern must be a string or an array");
            return value.clone();
        }
    }

    Value::String(out)
}

fn hour12(dt: &NaiveDateTime) -> u32 {
    match dt.hour() % 12 {
        0 => 12,
        h => h,
    }
}

fn token(dt: &NaiveDateTime, token: &str) -> Option<String> {
    let month = dt.month0() as usize;
    let weekday = dt.weekday().num_days_from_monday() as usize;
    let s = match token {
        "yyyy" => format!("{:04}", dt.year()),
        "yy" => format!("{:02}", dt.year().rem_euclid(100)),
        "MMMM" => MONTHS[month].to_string(),
        "MMM" => MONTHS[month][..3].to_string(),
        "MM" => format!("{:02}", dt.month()),
        "M" => dt.month().to_string(),
        "dd" => format!("{:02}", dt.day()),
        "d" => dt.day().to_string(),
        "EEEE" => WEEKDAYS[weekday].to_string(),
        "E" => WEEKDAYS[weekday][..3].to_string(),
        "HH" => format!("{:02}", dt.hour()),
        "H" => dt.hour().to_string(),
        "hh" => format!("{:02}", hour12(dt)),
        "h" => hour12(dt).to_string(),
        "mm" => format!("{:02}", dt.minute()),
        "m" => dt.minute().to_string(),
        "ss" => format!("{:02}", dt.second()),
        "s" => dt.second().to_string(),
        "SSS" => format!("{:03}", dt.nanosecond() / 1_000_000),
        "a" => (if dt.hour() < 12 { "am" } else { "pm" }).to_string(),
        "A" => (if dt.hour() < 12 { "AM" } else { "PM" }).to_string(),
        "Z" => "+00:00".to_string(),
        _ => return None,
    };
    Some(s)
}
