//! Timestamp reconciliation.
//!
//! The app writes `time` as epoch nanoseconds (a 19-digit string) in both
//! JSON and CSV exports; the reformatted JSON this tool emits carries epoch
//! seconds as a float or RFC 3339 text. All of them end up as
//! `DateTime<Utc>`:
//! - integers: unit picked by magnitude (ns, us, ms, s since the epoch)
//! - decimal numbers: seconds since the epoch
//! - other text: RFC 3339 / ISO-8601
//! - no usable `time`: recording epoch from the metadata plus
//!   `seconds_elapsed`

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::timeparse::{parse_instant, seconds_to_duration};
use crate::types::Metadata;

/// Metadata key holding the recording start in epoch milliseconds
pub const RECORDING_EPOCH_KEY: &str = "recording epoch time";

pub fn from_json(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                from_epoch_integer(v as i128)
            } else if let Some(v) = n.as_u64() {
                from_epoch_integer(v as i128)
            } else {
                n.as_f64().and_then(from_epoch_seconds)
            }
        }
        Value::String(s) => from_text(s),
        _ => None,
    }
}

pub fn from_text(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(v) = trimmed.parse::<i128>() {
        return from_epoch_integer(v);
    }
    if let Ok(v) = trimmed.parse::<f64>() {
        return from_epoch_seconds(v);
    }
    parse_instant(trimmed).ok()
}

/// Integer epoch value; larger magnitudes mean finer units
pub fn from_epoch_integer(value: i128) -> Option<DateTime<Utc>> {
    let per_second: i128 = match value.unsigned_abs() {
        m if m >= 100_000_000_000_000_000 => 1_000_000_000,
        m if m >= 100_000_000_000_000 => 1_000_000,
        m if m >= 100_000_000_000 => 1_000,
        _ => 1,
    };
    let secs = value.div_euclid(per_second);
    let nanos = value.rem_euclid(per_second) * (1_000_000_000 / per_second);
    Utc.timestamp_opt(i64::try_from(secs).ok()?, u32::try_from(nanos).ok()?)
        .single()
}

pub fn from_epoch_seconds(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() {
        return None;
    }
    let mut secs = value.floor();
    let mut nanos = ((value - secs) * 1e9).round();
    if nanos >= 1e9 {
        secs += 1.0;
        nanos = 0.0;
    }
    if secs.abs() > i64::MAX as f64 / 2.0 {
        return None;
    }
    Utc.timestamp_opt(secs as i64, nanos as u32).single()
}

/// Epoch seconds as a float, the reformatted JSON's default encoding
pub fn to_epoch_seconds(timestamp: DateTime<Utc>) -> f64 {
    timestamp.timestamp() as f64 + timestamp.timestamp_subsec_nanos() as f64 * 1e-9
}

/// Start of the recording, if the capture metadata carries it
pub fn recording_epoch(metadata: &Metadata) -> Option<DateTime<Utc>> {
    let millis = metadata.get(RECORDING_EPOCH_KEY)?.trim().parse::<f64>().ok()?;
    from_epoch_seconds(millis / 1000.0)
}

/// Final timestamp for a record: its own `time`, else epoch + elapsed.
///
/// `None` when neither is usable, including an elapsed offset that lands
/// outside the representable range.
pub fn resolve(
    time: Option<DateTime<Utc>>,
    elapsed_secs: Option<f64>,
    epoch: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    time.or_else(|| {
        epoch?.checked_add_signed(seconds_to_duration(elapsed_secs?)?)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 7, 25, 13, 20, 0).unwrap()
    }

    #[test]
    fn test_nanosecond_string() {
        let t = from_text("1627219200123456789").unwrap();
        assert_eq!(t.timestamp(), 1_627_219_200);
        assert_eq!(t.timestamp_subsec_nanos(), 123_456_789);
    }

    #[test]
    fn test_integer_units_by_magnitude() {
        assert_eq!(from_epoch_integer(1_627_219_200), Some(base()));
        assert_eq!(from_epoch_integer(1_627_219_200_000), Some(base()));
        assert_eq!(from_epoch_integer(1_627_219_200_000_000), Some(base()));
        assert_eq!(from_epoch_integer(1_627_219_200_000_000_000), Some(base()));
    }

    #[test]
    fn test_float_seconds() {
        let t = from_json(&json!(1627219200.25)).unwrap();
        assert_eq!(t, base() + Duration::milliseconds(250));
        assert_eq!(from_text("1627219200.5").unwrap(), base() + Duration::milliseconds(500));
    }

    #[test]
    fn test_iso_text() {
        assert_eq!(from_text("2021-07-25T13:20:00+00:00"), Some(base()));
        assert_eq!(from_json(&json!("2021-07-25T13:20:00Z")), Some(base()));
        assert_eq!(from_text("not a time"), None);
        assert_eq!(from_json(&json!(null)), None);
    }

    #[test]
    fn test_out_of_range_epoch_and_elapsed() {
        let mut metadata = Metadata::new();
        metadata.insert(RECORDING_EPOCH_KEY.into(), "1e17".into());
        assert_eq!(recording_epoch(&metadata), None);

        assert_eq!(resolve(None, Some(1e300), Some(base())), None);
        assert_eq!(resolve(None, Some(f64::INFINITY), Some(base())), None);
    }

    #[test]
    fn test_epoch_seconds_round_trip() {
        let t = from_text("1627219200123456789").unwrap();
        let back = from_epoch_seconds(to_epoch_seconds(t)).unwrap();
        let drift = (back - t).num_nanoseconds().unwrap().abs();
        assert!(drift < 1_000, "drift {}ns", drift);
    }

    #[test]
    fn test_elapsed_fallback() {
        let mut metadata = Metadata::new();
        metadata.insert(RECORDING_EPOCH_KEY.into(), "1627219200000".into());
        let epoch = recording_epoch(&metadata);
        assert_eq!(epoch, Some(base()));

        assert_eq!(
            resolve(None, Some(1.5), epoch),
            Some(base() + Duration::milliseconds(1500))
        );
        assert_eq!(resolve(Some(base()), Some(99.0), epoch), Some(base()));
        assert_eq!(resolve(None, Some(1.5), None), None);
        assert_eq!(resolve(None, None, epoch), None);
    }
}
