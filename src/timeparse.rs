//! Human-entered durations and wall-clock instants for the window flags.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::{Result, SensorLoggerError};

/// Naive layouts accepted for `--begin` / `--end`, interpreted as UTC.
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a duration such as `"1h 20m 12s"`, `"10s"` or `"20.2s"`.
///
/// Tokens are `<number><unit>` with unit `h`, `m` or `s`, separated by
/// optional whitespace. Units may appear in any order and repeat; repeated
/// units add up. A string holding only a number is taken as seconds.
pub fn parse_duration(text: &str) -> Result<Duration> {
    let malformed = || SensorLoggerError::MalformedDuration(text.to_string());
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(malformed());
    }

    if let Ok(seconds) = trimmed.parse::<f64>() {
        if seconds >= 0.0 {
            return seconds_to_duration(seconds).ok_or_else(malformed);
        }
        return Err(malformed());
    }

    let mut total = Duration::zero();
    let mut tokens = 0usize;
    let mut rest = trimmed;

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(malformed());
        }
        let value: f64 = rest[..number_len].parse().map_err(|_| malformed())?;
        rest = rest[number_len..].trim_start();

        let unit_len = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_len] {
            "h" => 3600.0,
            "m" => 60.0,
            "s" => 1.0,
            _ => return Err(malformed()),
        };
        rest = rest[unit_len..].trim_start();

        total = seconds_to_duration(value * scale)
            .and_then(|d| total.checked_add(&d))
            .ok_or_else(malformed)?;
        tokens += 1;
    }

    if tokens == 0 {
        return Err(malformed());
    }
    Ok(total)
}

/// Parse an absolute instant: RFC 3339, or a naive date/time taken as UTC.
pub fn parse_instant(text: &str) -> Result<DateTime<Utc>> {
    let trimmed = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| SensorLoggerError::MalformedTime(text.to_string()))
}

/// Seconds (possibly fractional) as a nanosecond-resolution duration;
/// `None` when not finite or beyond what nanoseconds in an `i64` can hold.
pub fn seconds_to_duration(seconds: f64) -> Option<Duration> {
    let nanos = (seconds * 1e9).round();
    if !nanos.is_finite() || nanos.abs() >= i64::MAX as f64 {
        return None;
    }
    Some(Duration::nanoseconds(nanos as i64))
}

/// Signed span between two instants in seconds.
pub fn span_seconds(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let span = to - from;
    match span.num_nanoseconds() {
        Some(ns) => ns as f64 * 1e-9,
        None => span.num_milliseconds() as f64 * 1e-3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compound_duration() {
        let d = parse_duration("1h 20m 12s").unwrap();
        assert_eq!(d.num_seconds(), 4812);
    }

    #[test]
    fn test_single_token() {
        assert_eq!(parse_duration("10s").unwrap().num_seconds(), 10);
        assert_eq!(parse_duration("2h32m").unwrap().num_seconds(), 2 * 3600 + 32 * 60);
    }

    #[test]
    fn test_fractional_seconds() {
        let d = parse_duration("20.2s").unwrap();
        assert_eq!(d.num_milliseconds(), 20_200);
    }

    #[test]
    fn test_any_order_and_duplicates_sum() {
        assert_eq!(parse_duration("12s 1h").unwrap().num_seconds(), 3612);
        assert_eq!(parse_duration("5m 5m").unwrap().num_seconds(), 600);
    }

    #[test]
    fn test_bare_number_is_seconds() {
        assert_eq!(parse_duration("90").unwrap().num_seconds(), 90);
    }

    #[test]
    fn test_malformed_durations() {
        for bad in ["bogus", "", "   ", "10x", "h", "1h bogus", "-5s", "-3"] {
            match parse_duration(bad) {
                Err(SensorLoggerError::MalformedDuration(s)) => assert_eq!(s, bad),
                other => panic!("expected MalformedDuration for {:?}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_out_of_range_durations() {
        for bad in ["99999999999h", "2562047h 2562047h", "1e300"] {
            assert!(
                matches!(parse_duration(bad), Err(SensorLoggerError::MalformedDuration(_))),
                "{:?} should not parse",
                bad
            );
        }
        assert_eq!(seconds_to_duration(f64::NAN), None);
        assert_eq!(seconds_to_duration(1.5), Some(Duration::milliseconds(1500)));
    }

    #[test]
    fn test_parse_instant_variants() {
        let expected = Utc.with_ymd_and_hms(2021, 7, 25, 13, 25, 0).unwrap();
        assert_eq!(parse_instant("2021-07-25 13:25").unwrap(), expected);
        assert_eq!(parse_instant("2021-07-25T13:25:00").unwrap(), expected);
        assert_eq!(parse_instant("2021-07-25T13:25:00Z").unwrap(), expected);
        assert_eq!(parse_instant("2021-07-25T15:25:00+02:00").unwrap(), expected);
        assert_eq!(
            parse_instant("2021-07-25").unwrap(),
            Utc.with_ymd_and_hms(2021, 7, 25, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_instant_fraction() {
        let t = parse_instant("2021-07-25T13:25:00.250").unwrap();
        assert_eq!(t.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_parse_instant_rejects_garbage() {
        assert!(matches!(
            parse_instant("yesterday"),
            Err(SensorLoggerError::MalformedTime(_))
        ));
    }

    #[test]
    fn test_span_seconds() {
        let a = Utc.with_ymd_and_hms(2021, 7, 25, 13, 0, 0).unwrap();
        let b = a + Duration::milliseconds(1500);
        assert!((span_seconds(a, b) - 1.5).abs() < 1e-9);
        assert!((span_seconds(b, a) + 1.5).abs() < 1e-9);
    }
}
