//! Time and Duration Parsing
//!
//! Every time field of a request goes through [`TimeSpecParser`], which
//! accepts, in order:
//!
//! ```text
//! ""  now  NOW                      current instant
//! 946771200                         unix seconds (>= 10^8)
//! 946771200000                      unix milliseconds (>= 10^12)
//! 20000102                          compact date
//! 2000.01.02 01:05:00               date and time, '.' or '/' separated,
//! 2000/1/2-1:5                      space or '-' before the time part
//! 15:04:05  15:04  15               time of day, today
//! -1h30m  +5m  90s                  offset from now
//! ```
//!
//! Absolute forms are interpreted in the local timezone.
//!
//! Durations (`step`) accept an empty string (one second), a bare integer
//! (seconds) or a compound literal such as `1h2m3s`.

use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit0, digit1, one_of},
    combinator::{all_consuming, map_res, opt, recognize, value},
    multi::many1,
    sequence::pair,
    IResult,
};
use regex::Regex;

use crate::query::error::{QueryError, QueryResult};

/// An absolute instant, local-timezone semantics
pub type TimePoint = DateTime<Local>;

/// Integers at or above this are millisecond timestamps
const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// Integers at or above this (and below `MILLIS_THRESHOLD`) are second timestamps
const SECONDS_THRESHOLD: i64 = 100_000_000;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Parser for the instant literals accepted in `start`/`end`
///
/// Owns its compiled layouts; build one at startup and share it.
#[derive(Debug, Clone)]
pub struct TimeSpecParser {
    compact_date: Regex,
    date_time: Regex,
    time_of_day: Regex,
}

impl TimeSpecParser {
    /// Compile the date and time layouts
    pub fn new() -> Self {
        Self {
            compact_date: Regex::new(r"^(\d{4})(\d{2})(\d{2})$").expect("valid compact date regex"),
            date_time: Regex::new(
                r"^(\d{4})(?:\.(\d{1,2})\.(\d{1,2})|/(\d{1,2})/(\d{1,2}))(?:[ -](\d{1,2})(?::(\d{1,2})(?::(\d{1,2}))?)?)?$",
            )
            .expect("valid date time regex"),
            time_of_day: Regex::new(r"^(\d{1,2})(?::(\d{1,2})(?::(\d{1,2}))?)?$")
                .expect("valid time of day regex"),
        }
    }

    /// Parse an instant relative to the current time
    pub fn parse_instant(&self, text: &str) -> QueryResult<TimePoint> {
        self.parse_instant_at(text, Local::now())
    }

    /// Parse an instant, resolving "now", today and offsets against `now`
    pub fn parse_instant_at(&self, text: &str, now: TimePoint) -> QueryResult<TimePoint> {
        let s = text.trim();
        let invalid = || QueryError::InvalidTimeFormat(text.to_string());

        // Literals
        if s.is_empty() || s.eq_ignore_ascii_case("now") {
            return Ok(now);
        }

        // Unix timestamps. Small integers fall through to time of day.
        if s.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = s.parse::<i64>() {
                if n >= MILLIS_THRESHOLD {
                    return single(Local.timestamp_millis_opt(n)).ok_or_else(invalid);
                }
                if n >= SECONDS_THRESHOLD {
                    return single(Local.timestamp_opt(n, 0)).ok_or_else(invalid);
                }
            }
        }

        // Date, optionally with time
        if let Some(naive) = self.parse_date_time(s) {
            return localize(naive).ok_or_else(invalid);
        }

        // Time of day
        if let Some(time) = self.parse_time_of_day(s) {
            return localize(now.date_naive().and_time(time)).ok_or_else(invalid);
        }

        // Offset from now
        if let Some(offset) = parse_signed_duration(s) {
            return now.checked_add_signed(offset).ok_or_else(invalid);
        }

        Err(invalid())
    }

    fn parse_date_time(&self, s: &str) -> Option<NaiveDateTime> {
        if let Some(caps) = self.compact_date.captures(s) {
            return NaiveDate::from_ymd_opt(
                caps[1].parse().ok()?,
                caps[2].parse().ok()?,
                caps[3].parse().ok()?,
            )?
            .and_hms_opt(0, 0, 0);
        }

        let caps = self.date_time.captures(s)?;
        let field = |i: usize| caps.get(i).map(|m| m.as_str().parse::<u32>());
        let year: i32 = caps[1].parse().ok()?;
        // Month and day come from whichever separator alternative matched
        let month = field(2).or_else(|| field(4))?.ok()?;
        let day = field(3).or_else(|| field(5))?.ok()?;
        let hour = field(6).unwrap_or(Ok(0)).ok()?;
        let minute = field(7).unwrap_or(Ok(0)).ok()?;
        let second = field(8).unwrap_or(Ok(0)).ok()?;

        NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)
    }

    fn parse_time_of_day(&self, s: &str) -> Option<NaiveTime> {
        let caps = self.time_of_day.captures(s)?;
        let field = |i: usize| caps.get(i).map_or(Ok(0), |m| m.as_str().parse::<u32>());
        NaiveTime::from_hms_opt(field(1).ok()?, field(2).ok()?, field(3).ok()?)
    }
}

impl Default for TimeSpecParser {
    fn default() -> Self {
        Self::new()
    }
}

fn single(result: LocalResult<TimePoint>) -> Option<TimePoint> {
    result.single()
}

/// Interpret a wall-clock time in the local timezone.
/// Ambiguous times take the earlier instant; times inside a DST gap are rejected.
fn localize(naive: NaiveDateTime) -> Option<TimePoint> {
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(t) => Some(t),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => None,
    }
}

/// Parse a step/resolution value
///
/// Empty means one second, a bare integer counts seconds, anything else must
/// be a compound duration literal.
pub fn parse_duration(text: &str) -> QueryResult<Duration> {
    let s = text.trim();

    if s.is_empty() {
        return Ok(Duration::seconds(1));
    }

    if let Ok(n) = s.parse::<i64>() {
        return Duration::try_seconds(n)
            .ok_or_else(|| QueryError::InvalidDurationFormat(text.to_string()));
    }

    parse_signed_duration(s).ok_or_else(|| QueryError::InvalidDurationFormat(text.to_string()))
}

/// Optional sign followed by a compound duration literal, nothing else
fn parse_signed_duration(s: &str) -> Option<Duration> {
    let (_, (sign, nanos)) = all_consuming(pair(opt(one_of("+-")), duration_literal))(s).ok()?;
    let nanos = if sign == Some('-') { -nanos } else { nanos };

    if !nanos.is_finite() || nanos.abs() >= i64::MAX as f64 {
        return None;
    }

    Some(Duration::nanoseconds(nanos.round() as i64))
}

/// One or more `<number><unit>` pairs, total in nanoseconds
fn duration_literal(input: &str) -> IResult<&str, f64> {
    let (input, parts) = many1(pair(decimal, unit_nanos))(input)?;
    Ok((input, parts.iter().map(|(n, unit)| n * *unit as f64).sum()))
}

/// `12`, `1.5`, `2.` or `.5`
fn decimal(input: &str) -> IResult<&str, f64> {
    map_res(
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
        |s: &str| s.parse::<f64>(),
    )(input)
}

fn unit_nanos(input: &str) -> IResult<&str, i64> {
    alt((
        value(1, tag("ns")),
        value(1_000, alt((tag("us"), tag("µs"), tag("μs")))),
        value(1_000_000, tag("ms")),
        value(NANOS_PER_SECOND, tag("s")),
        value(60 * NANOS_PER_SECOND, tag("m")),
        value(3600 * NANOS_PER_SECOND, tag("h")),
    ))(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use proptest::prelude::*;

    fn fixed_now() -> TimePoint {
        Local.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).earliest().unwrap()
    }

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> TimePoint {
        Local.with_ymd_and_hms(y, mo, d, h, mi, s).earliest().unwrap()
    }

    #[test]
    fn test_now_literals() {
        let parser = TimeSpecParser::new();
        let now = fixed_now();

        assert_eq!(parser.parse_instant_at("", now).unwrap(), now);
        assert_eq!(parser.parse_instant_at("now", now).unwrap(), now);
        assert_eq!(parser.parse_instant_at("  NoW \t", now).unwrap(), now);
    }

    #[test]
    fn test_epoch_timestamps() {
        let parser = TimeSpecParser::new();
        let now = fixed_now();

        let t = parser.parse_instant_at("946771200", now).unwrap();
        assert_eq!(t.timestamp(), 946771200);

        let t = parser.parse_instant_at("946771200123", now).unwrap();
        assert_eq!(t.timestamp_millis(), 946771200123);

        let t = parser.parse_instant_at("100000000", now).unwrap();
        assert_eq!(t.timestamp(), 100_000_000);
    }

    #[test]
    fn test_small_integers_are_time_of_day() {
        let parser = TimeSpecParser::new();
        let now = fixed_now();

        let t = parser.parse_instant_at("01", now).unwrap();
        assert_eq!(t, local(2024, 3, 15, 1, 0, 0));

        let t = parser.parse_instant_at("7", now).unwrap();
        assert_eq!(t, local(2024, 3, 15, 7, 0, 0));
    }

    #[test]
    fn test_absolute_dates() {
        let parser = TimeSpecParser::new();
        let now = fixed_now();

        let cases = [
            ("20000102", local(2000, 1, 2, 0, 0, 0)),
            ("2000.01.02 01:05:00", local(2000, 1, 2, 1, 5, 0)),
            ("2000.01.02-00:59:59", local(2000, 1, 2, 0, 59, 59)),
            ("2000.1.2 1:5:7", local(2000, 1, 2, 1, 5, 7)),
            ("2000.1.2-15:4", local(2000, 1, 2, 15, 4, 0)),
            ("2000.01.02 15", local(2000, 1, 2, 15, 0, 0)),
            ("2000.01.02", local(2000, 1, 2, 0, 0, 0)),
            ("2000/01/02 15:04:05", local(2000, 1, 2, 15, 4, 5)),
            ("2000/1/2-15", local(2000, 1, 2, 15, 0, 0)),
            ("2000/1/2", local(2000, 1, 2, 0, 0, 0)),
        ];

        for (text, want) in cases {
            assert_eq!(parser.parse_instant_at(text, now).unwrap(), want, "{}", text);
        }
    }

    #[test]
    fn test_time_of_day_uses_today() {
        let parser = TimeSpecParser::new();
        let now = fixed_now();

        assert_eq!(
            parser.parse_instant_at("15:04:05", now).unwrap(),
            local(2024, 3, 15, 15, 4, 5)
        );
        assert_eq!(
            parser.parse_instant_at("9:5", now).unwrap(),
            local(2024, 3, 15, 9, 5, 0)
        );
    }

    #[test]
    fn test_relative_offsets() {
        let parser = TimeSpecParser::new();
        let now = fixed_now();

        assert_eq!(
            parser.parse_instant_at("-1h", now).unwrap(),
            now - Duration::hours(1)
        );
        assert_eq!(
            parser.parse_instant_at("+30m", now).unwrap(),
            now + Duration::minutes(30)
        );
        assert_eq!(
            parser.parse_instant_at("1h2m3s", now).unwrap(),
            now + Duration::seconds(3723)
        );
        assert_eq!(
            parser.parse_instant_at("-1.5h", now).unwrap(),
            now - Duration::minutes(90)
        );
    }

    #[test]
    fn test_invalid_instants() {
        let parser = TimeSpecParser::new();
        let now = fixed_now();

        for text in [
            "yesterday",
            "2000.13.01",
            "2000.01/02",
            "2000.02.30",
            "25:00",
            "12:61",
            "1h-",
            "--1h",
            "1d",
        ] {
            let err = parser.parse_instant_at(text, now).unwrap_err();
            assert!(
                matches!(err, QueryError::InvalidTimeFormat(_)),
                "{} gave {:?}",
                text,
                err
            );
        }
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("").unwrap(), Duration::seconds(1));
        assert_eq!(parse_duration("100").unwrap(), Duration::seconds(100));
        assert_eq!(parse_duration("2m").unwrap(), Duration::seconds(120));
        assert_eq!(parse_duration("1h2m3s").unwrap(), Duration::seconds(3723));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::milliseconds(1500));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::milliseconds(250));
        assert_eq!(parse_duration("-5m").unwrap(), Duration::seconds(-300));

        assert!(matches!(
            parse_duration("5x"),
            Err(QueryError::InvalidDurationFormat(_))
        ));
        assert!(parse_duration("m").is_err());
        assert!(parse_duration("1h 2m").is_err());
    }

    proptest! {
        /// Every absolute layout parses back to the instant it was formatted from.
        #[test]
        fn absolute_layouts_round_trip(
            year in 1971i32..2100,
            month in 1u32..=12,
            day in 1u32..=28,
            hour in 0u32..24,
            minute in 0u32..60,
            second in 0u32..60,
        ) {
            let parser = TimeSpecParser::new();
            let naive = NaiveDate::from_ymd_opt(year, month, day)
                .unwrap()
                .and_hms_opt(hour, minute, second)
                .unwrap();
            let t = Local.from_local_datetime(&naive).single();
            prop_assume!(t.is_some());
            let t = t.unwrap();

            let layouts = [
                "%Y.%m.%d %H:%M:%S", "%Y.%m.%d-%H:%M:%S", "%Y.%-m.%-d %-H:%-M:%-S",
                "%Y.%-m.%-d-%-H:%-M:%-S", "%Y/%m/%d %H:%M:%S", "%Y/%m/%d-%H:%M:%S",
                "%Y/%-m/%-d %-H:%-M:%-S", "%Y/%-m/%-d-%-H:%-M:%-S",
            ];
            for layout in layouts {
                let text = t.format(layout).to_string();
                prop_assert_eq!(parser.parse_instant_at(&text, t).unwrap(), t, "{}", text);
            }

            let minutes = t.with_second(0).unwrap();
            for layout in ["%Y.%m.%d %H:%M", "%Y/%-m/%-d-%-H:%-M"] {
                let text = minutes.format(layout).to_string();
                prop_assert_eq!(parser.parse_instant_at(&text, t).unwrap(), minutes, "{}", text);
            }

            let hours = minutes.with_minute(0).unwrap();
            for layout in ["%Y.%m.%d %H", "%Y/%-m/%-d-%-H"] {
                let text = hours.format(layout).to_string();
                let parsed = parser.parse_instant_at(&text, t).unwrap();
                prop_assert_eq!(parsed.naive_local(), hours.naive_local(), "{}", text);
            }

            let days = naive.date().and_hms_opt(0, 0, 0).unwrap();
            for layout in ["%Y%m%d", "%Y.%m.%d", "%Y/%-m/%-d"] {
                let text = days.format(layout).to_string();
                let parsed = parser.parse_instant_at(&text, t).unwrap();
                prop_assert_eq!(parsed.naive_local(), days, "{}", text);
            }
        }
    }
}
