//! Publication-date handling for feed entries.
//!
//! Feeds disagree wildly on date formats, so parsing walks an ordered list of
//! known layouts before falling back to a lenient RFC 2822 / RFC 3339 parse.
//! Two policies sit on top of that:
//!
//! - [`is_recent`] fails open: an entry whose date cannot be read is kept.
//! - [`canonicalize`] keeps the raw string when it cannot be read, and only
//!   substitutes today's date when there was no date at all.

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tracing::warn;

/// Output layout for article timestamps.
pub const CANONICAL_FORMAT: &str = "%Y-%m-%d";

const RFC822_NUMERIC: &str = "%a, %d %b %Y %H:%M:%S %z";
const RFC822_NAMED_STAMP: &str = "%a, %d %b %Y %H:%M:%S";
const ISO8601_OFFSET: &str = "%Y-%m-%dT%H:%M:%S%z";
const ISO8601_UTC: &str = "%Y-%m-%dT%H:%M:%SZ";
const PLAIN: &str = "%Y-%m-%d %H:%M:%S";
const TWITTER: &str = "%a %b %d %H:%M:%S %z %Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// `Mon, 09 Dec 2024 12:00:00 +0000`
    Rfc822Numeric,
    /// `Mon, 09 Dec 2024 12:00:00 GMT`
    Rfc822Named,
    /// `2024-12-09T12:00:00+0000`
    Iso8601Offset,
    /// `2024-12-09T12:00:00Z`
    Iso8601Utc,
    /// `2024-12-09 12:00:00`, read as UTC
    Plain,
    /// `Mon Dec 09 12:00:00 +0000 2024`
    Twitter,
}

/// Formats tried in order; the first one that parses wins.
pub const KNOWN_FORMATS: [DateFormat; 6] = [
    DateFormat::Rfc822Numeric,
    DateFormat::Rfc822Named,
    DateFormat::Iso8601Offset,
    DateFormat::Iso8601Utc,
    DateFormat::Plain,
    DateFormat::Twitter,
];

impl DateFormat {
    pub fn parse(self, raw: &str) -> Option<DateTime<FixedOffset>> {
        match self {
            DateFormat::Rfc822Numeric => DateTime::parse_from_str(raw, RFC822_NUMERIC).ok(),
            DateFormat::Rfc822Named => parse_named_zone(raw),
            DateFormat::Iso8601Offset => DateTime::parse_from_str(raw, ISO8601_OFFSET).ok(),
            DateFormat::Iso8601Utc => parse_naive_utc(raw, ISO8601_UTC),
            DateFormat::Plain => parse_naive_utc(raw, PLAIN),
            DateFormat::Twitter => DateTime::parse_from_str(raw, TWITTER).ok(),
        }
    }
}

fn zone_offset_hours(zone: &str) -> Option<i32> {
    let hours = match zone.to_ascii_uppercase().as_str() {
        "GMT" | "UT" | "UTC" | "Z" => 0,
        "EST" => -5,
        "EDT" => -4,
        "CST" => -6,
        "CDT" => -5,
        "MST" => -7,
        "MDT" => -6,
        "PST" => -8,
        "PDT" => -7,
        _ => return None,
    };
    Some(hours)
}

fn parse_named_zone(raw: &str) -> Option<DateTime<FixedOffset>> {
    let (stamp, zone) = raw.rsplit_once(' ')?;
    let offset = FixedOffset::east_opt(zone_offset_hours(zone)? * 3600)?;
    let naive = NaiveDateTime::parse_from_str(stamp, RFC822_NAMED_STAMP).ok()?;
    offset.from_local_datetime(&naive).single()
}

fn parse_naive_utc(raw: &str, format: &str) -> Option<DateTime<FixedOffset>> {
    let naive = NaiveDateTime::parse_from_str(raw, format).ok()?;
    let utc: DateTime<Utc> = Utc.from_utc_datetime(&naive);
    Some(utc.into())
}

fn parse_lenient(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
}

/// The first known format `raw` parses under, if any.
pub fn known_format(raw: &str) -> Option<DateFormat> {
    let raw = raw.trim();
    KNOWN_FORMATS.into_iter().find(|f| f.parse(raw).is_some())
}

/// Parse a feed date: the known formats in order, then the lenient fallback.
pub fn parse_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    KNOWN_FORMATS
        .into_iter()
        .find_map(|f| f.parse(raw))
        .or_else(|| parse_lenient(raw))
}

/// Whether an entry dated `raw_date` falls inside the trailing window.
pub fn is_recent(raw_date: Option<&str>, window_days: i64) -> bool {
    is_recent_at(raw_date, window_days, Utc::now())
}

pub fn is_recent_at(raw_date: Option<&str>, window_days: i64, now: DateTime<Utc>) -> bool {
    let Some(raw) = raw_date.filter(|r| !r.is_empty()) else {
        return true;
    };

    // A window reaching past chrono's range admits every date.
    let Some(cutoff) = Duration::try_days(window_days).and_then(|w| now.checked_sub_signed(w))
    else {
        return true;
    };

    match parse_date(raw) {
        Some(published) => published.with_timezone(&Utc) >= cutoff,
        None => {
            warn!("Error parsing date: {} - treating entry as recent", raw);
            true
        }
    }
}

/// Render a feed date as `YYYY-MM-DD` in the date's own offset.
pub fn canonicalize(raw_date: Option<&str>) -> String {
    canonicalize_on(raw_date, Local::now().date_naive())
}

pub fn canonicalize_on(raw_date: Option<&str>, today: NaiveDate) -> String {
    match raw_date.filter(|r| !r.is_empty()) {
        None => today.format(CANONICAL_FORMAT).to_string(),
        Some(raw) => match parse_date(raw) {
            Some(date) => date.format(CANONICAL_FORMAT).to_string(),
            None => raw.to_string(),
        },
    }
}
