//! Engagement count and publish time parsing
//!
//! Both are best effort: an unreadable count becomes 0 and an unreadable
//! time leaves the date unset. Neither ever fails a record.

use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::parser::text_of;
use crate::utils::normalize_whitespace;

static RELATIVE_TIME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*(second|sec|minute|min|hour|hr|day|week|month|year)s?\s+ago")
        .unwrap()
});

/// Parse an engagement count in any of its upstream encodings
///
/// Accepts JSON integers, JSON floats (truncated), integer strings with
/// optional thousands separators, and abbreviated strings such as `"58K"`,
/// `"1.2k"` or `"3.4M"`. Display-text objects are read through their text.
/// Anything else is 0.
pub fn parse_count(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => parse_count_str(s),
        Value::Object(_) => text_of(value).map_or(0, |text| parse_count_str(&text)),
        _ => 0,
    }
}

/// Parse an abbreviated count string
///
/// Integer arithmetic throughout, so `"4.1K"` is exactly 4100. Fractions of
/// a unit are truncated.
///
/// ```
/// use ytmeta::comment::values::parse_count_str;
///
/// assert_eq!(parse_count_str("1.2K"), 1200);
/// assert_eq!(parse_count_str("58k"), 58_000);
/// assert_eq!(parse_count_str("1,234"), 1234);
/// assert_eq!(parse_count_str("n/a"), 0);
/// ```
pub fn parse_count_str(raw: &str) -> u64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect::<String>()
        .to_uppercase();

    let (number, multiplier) = match cleaned.chars().last() {
        Some('K') => (&cleaned[..cleaned.len() - 1], 1_000u128),
        Some('M') => (&cleaned[..cleaned.len() - 1], 1_000_000),
        Some('B') => (&cleaned[..cleaned.len() - 1], 1_000_000_000),
        Some(_) => (cleaned.as_str(), 1),
        None => return 0,
    };

    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    let digits_only = |s: &str| s.chars().all(|c| c.is_ascii_digit());

    if whole.is_empty() && fraction.is_empty() {
        return 0;
    }
    if !digits_only(whole) || !digits_only(fraction) {
        return 0;
    }

    // digits only, so a parse failure is an overflow
    let whole_value = if whole.is_empty() {
        0
    } else {
        whole.parse::<u128>().unwrap_or(u128::MAX)
    };

    // Only as many fraction digits as the multiplier can resolve
    let fraction = &fraction[..fraction.len().min(9)];
    let fraction_value = if fraction.is_empty() {
        0
    } else {
        let Ok(digits) = fraction.parse::<u128>() else {
            return 0;
        };
        digits * multiplier / 10u128.pow(fraction.len() as u32)
    };

    let total = whole_value
        .saturating_mul(multiplier)
        .saturating_add(fraction_value);
    u64::try_from(total).unwrap_or(u64::MAX)
}

/// Interpret a machine timestamp of unknown resolution
///
/// Values above 1e14 are taken as microseconds, above 1e11 as milliseconds,
/// anything else as seconds.
pub fn timestamp_from_number(raw: i64) -> Option<DateTime<Utc>> {
    if raw <= 0 {
        return None;
    }
    if raw > 100_000_000_000_000 {
        DateTime::from_timestamp_micros(raw)
    } else if raw > 100_000_000_000 {
        DateTime::from_timestamp_millis(raw)
    } else {
        DateTime::from_timestamp(raw, 0)
    }
}

/// Read a machine timestamp from a JSON number or digit string
pub fn machine_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let raw = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    timestamp_from_number(raw)
}

/// Resolve a human-relative time such as `"3 months ago"` against `now`
///
/// Weeks are 7 days and years 12 calendar months. A trailing `(edited)`
/// marker is ignored.
pub fn parse_relative_time(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let text = text.replace("(edited)", "");
    let lowered = normalize_whitespace(&text).to_lowercase();

    if lowered == "just now" || lowered == "now" {
        return Some(now);
    }

    let captures = RELATIVE_TIME_REGEX.captures(&lowered)?;
    let amount: u32 = captures.get(1)?.as_str().parse().ok()?;
    let unit = captures.get(2)?.as_str();

    match unit {
        "second" | "sec" => now.checked_sub_signed(chrono::Duration::seconds(amount.into())),
        "minute" | "min" => now.checked_sub_signed(chrono::Duration::minutes(amount.into())),
        "hour" | "hr" => now.checked_sub_signed(chrono::Duration::hours(amount.into())),
        "day" => now.checked_sub_days(Days::new(amount.into())),
        "week" => now.checked_sub_days(Days::new(u64::from(amount) * 7)),
        "month" => now.checked_sub_months(Months::new(amount)),
        "year" => now.checked_sub_months(Months::new(amount.checked_mul(12)?)),
        _ => None,
    }
}

/// Publish date and unix seconds for a comment
///
/// The machine timestamp wins when present and valid; otherwise the human
/// string is resolved against `now`.
pub fn resolve_publish_time(
    machine: Option<&Value>,
    human: &str,
    now: DateTime<Utc>,
) -> (Option<NaiveDate>, Option<i64>) {
    let instant = machine
        .and_then(machine_timestamp)
        .or_else(|| parse_relative_time(human, now));

    match instant {
        Some(at) => (Some(at.date_naive()), Some(at.timestamp())),
        None => (None, None),
    }
}
