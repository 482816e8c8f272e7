//! Date and application-period parsing.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use crate::types::{month_later, open_until_filled, Period};

/// Upstream phrases meaning "open until the position is filled".
pub const OPEN_ENDED_MARKERS: &[&str] = &[
    "채용시까지",
    "채용 시까지",
    "채용시 마감",
    "영입 종료시",
    "영입종료시",
    "상시",
    "수시",
    "until filled",
];

lazy_static! {
    static ref DATE_PATTERN: Regex =
        Regex::new(r"(\d{4})\s*[./\-년]\s*(\d{1,2})\s*[./\-월]\s*(\d{1,2})").unwrap();
}

fn is_open_ended(text: &str) -> bool {
    let lower = text.to_lowercase();
    OPEN_ENDED_MARKERS.iter().any(|m| lower.contains(m))
}

/// First date in `text`, at midnight UTC. RFC 3339 timestamps keep their time.
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.and_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }

    let caps = DATE_PATTERN.captures(text)?;
    let year = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let day = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)?
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
}

fn end_of_day(date: DateTime<Utc>) -> DateTime<Utc> {
    if date.time() == chrono::NaiveTime::MIN {
        date.date_naive()
            .and_hms_opt(23, 59, 59)
            .map(|dt| dt.and_utc())
            .unwrap_or(date)
    } else {
        date
    }
}

/// Period from separate start and end strings.
///
/// A missing start is `now`; an open-ended marker or missing end is the
/// far-future sentinel; an unparseable end is one month after the start.
pub fn parse_period_parts(start: Option<&str>, end: Option<&str>, now: DateTime<Utc>) -> Period {
    let start = start.and_then(parse_date).unwrap_or(now);
    let end = match end.map(str::trim).filter(|e| !e.is_empty()) {
        None => open_until_filled(),
        Some(e) if is_open_ended(e) => open_until_filled(),
        Some(e) => parse_date(e)
            .map(end_of_day)
            .unwrap_or_else(|| month_later(start)),
    };
    Period { start, end }
}

/// Period from a range such as `2024.01.02 ~ 2024.02.01` or `2024.01.02 ~ 채용시까지`.
///
/// Text without any parseable date falls back to `(now, now + 1 month)`,
/// or to an open-ended window when it carries an open-ended marker.
pub fn parse_period(text: &str, now: DateTime<Utc>) -> Period {
    let mut parts = text.splitn(2, '~');
    let start_text = parts.next().unwrap_or("").trim();
    let end_text = parts.next().map(str::trim);

    let start = parse_date(start_text);
    if start.is_none() && end_text.and_then(parse_date).is_none() {
        return if is_open_ended(text) {
            Period::open_ended(now)
        } else {
            Period::default_from(now)
        };
    }

    let start = start.unwrap_or(now);
    let end = match end_text {
        Some(e) if is_open_ended(e) => open_until_filled(),
        Some(e) => parse_date(e)
            .map(end_of_day)
            .unwrap_or_else(|| month_later(start)),
        None => month_later(start),
    };
    Period { start, end }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap()
    }

    fn ymd(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn parses_common_formats() {
        assert_eq!(parse_date("2024.01.05"), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("2024. 1. 5."), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("2024-01-05"), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("2024/01/05"), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("2024년 1월 5일"), Some(ymd(2024, 1, 5)));
        assert_eq!(
            parse_date("2024-01-05T10:30:00+09:00"),
            Some(Utc.with_ymd_and_hms(2024, 1, 5, 1, 30, 0).unwrap())
        );
        assert_eq!(
            parse_date("2024-01-05 18:00:00"),
            Some(Utc.with_ymd_and_hms(2024, 1, 5, 18, 0, 0).unwrap())
        );
        assert_eq!(parse_date("2024.13.40"), None);
        assert_eq!(parse_date("모집중"), None);
    }

    #[test]
    fn closed_range() {
        let period = parse_period("2024.01.02 ~ 2024.02.01", now());
        assert_eq!(period.start, ymd(2024, 1, 2));
        assert_eq!(
            period.end,
            Utc.with_ymd_and_hms(2024, 2, 1, 23, 59, 59).unwrap()
        );
    }

    #[test]
    fn open_ended_range() {
        let period = parse_period("2024.01.02 ~ 채용시까지", now());
        assert_eq!(period.start, ymd(2024, 1, 2));
        assert!(period.is_open_ended());

        let period = parse_period("상시채용", now());
        assert_eq!(period.start, now());
        assert!(period.is_open_ended());
    }

    #[test]
    fn unparseable_defaults_to_a_month() {
        let period = parse_period("곧 공개", now());
        assert_eq!(period, Period::default_from(now()));

        let period = parse_period("2024.03.01", now());
        assert_eq!(period.start, ymd(2024, 3, 1));
        assert_eq!(period.end, ymd(2024, 4, 1));
    }

    #[test]
    fn parts() {
        let period = parse_period_parts(Some("2024-01-02T00:00:00"), None, now());
        assert_eq!(period.start, ymd(2024, 1, 2));
        assert!(period.is_open_ended());

        let period = parse_period_parts(None, Some("2024-04-30"), now());
        assert_eq!(period.start, now());
        assert_eq!(
            period.end,
            Utc.with_ymd_and_hms(2024, 4, 30, 23, 59, 59).unwrap()
        );
    }
}
