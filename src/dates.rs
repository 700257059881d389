//! Date normalization and the injectable clock.
//!
//! Dates arrive from pages and from the gateway in whatever shape the
//! author felt like. Two canonical renderings are produced from them:
//!
//! - **ISO 8601** (`2024-01-01T00:00:00.000Z`): used for `latestDate`
//! - **RFC 2822-like** (`Mon, 01 Jan 2024 00:00:00 +0000`): used in gateway
//!   prompts and as the sentinel `pubDate` of synthesized sources
//!
//! Both fall back to the current time of the supplied [`Clock`] when the
//! input cannot be parsed.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// Source of "now" for everything that stamps a record.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%B %d, %Y", "%b %d, %Y", "%d %B %Y"];

/// Parse a date string in any of the supported shapes.
///
/// Zone-less inputs are taken as UTC. Returns `None` for anything else.
pub fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = parse_rfc2822_lenient(s) {
        return Some(dt);
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }
    for fmt in NAIVE_DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    None
}

/// RFC 2822 that tolerates a weekday disagreeing with the date.
///
/// chrono rejects `Tue, 01 Jan 2024 ...` because 1 Jan 2024 was a Monday.
/// On that failure the weekday is dropped and the remainder parsed again.
fn parse_rfc2822_lenient(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    let (weekday, rest) = s.split_once(',')?;
    let weekday = weekday.trim();
    if weekday.is_empty() || !weekday.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    DateTime::parse_from_rfc2822(rest.trim_start())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse `input`, or take the clock's current time if it is not a date.
pub fn parse_or_now(input: &str, clock: &dyn Clock) -> DateTime<Utc> {
    parse_date(input).unwrap_or_else(|| clock.now())
}

/// Render an instant in ISO 8601 with millisecond precision.
pub fn iso(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Render an instant as `<Dow>, <DD> <Mon> <YYYY> <HH>:<MM>:<SS> +0000`.
pub fn rfc2822(dt: DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S +0000").to_string()
}

/// ISO form of an arbitrary date string.
pub fn to_iso(input: &str, clock: &dyn Clock) -> String {
    iso(parse_or_now(input, clock))
}
