use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::error::Result;
use crate::loader::timestamp::to_epoch_seconds;
use crate::types::{FieldValue, RecordSet, SensorRecord, METADATA_CHANNEL};

/// How record timestamps are written in the reformatted JSON
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimestampFormat {
    /// Seconds since the Unix epoch as a float
    UnixSeconds,
    /// RFC 3339 / ISO-8601 text
    Iso8601,
}

/// `{"<channel>": [{"time": ..., <fields>}, ...], ..., "Metadata": {...}}`
pub fn to_value(set: &RecordSet, format: TimestampFormat) -> Value {
    let mut document = Map::new();

    for channel in set.channels() {
        let records = channel
            .records
            .iter()
            .map(|r| record_value(r, format))
            .collect();
        document.insert(channel.name.to_string(), Value::Array(records));
    }

    if !set.metadata.is_empty() {
        let metadata = set
            .metadata
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        document.insert(METADATA_CHANNEL.to_string(), Value::Object(metadata));
    }

    Value::Object(document)
}

/// Pretty-printed document with four-space indentation
pub fn render(set: &RecordSet, format: TimestampFormat) -> Result<String> {
    let value = to_value(set, format);
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;
    buffer.push(b'\n');
    String::from_utf8(buffer)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e).into())
}

fn record_value(record: &SensorRecord, format: TimestampFormat) -> Value {
    let mut obj = Map::new();
    obj.insert("time".to_string(), time_value(record.timestamp, format));
    for (name, field) in &record.fields {
        obj.insert(name.clone(), field_value(field));
    }
    Value::Object(obj)
}

fn time_value(timestamp: DateTime<Utc>, format: TimestampFormat) -> Value {
    match format {
        TimestampFormat::UnixSeconds => Number::from_f64(to_epoch_seconds(timestamp))
            .map(Value::Number)
            .unwrap_or(Value::Null),
        TimestampFormat::Iso8601 => {
            Value::String(timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, false))
        }
    }
}

fn field_value(field: &FieldValue) -> Value {
    match field {
        FieldValue::Int(v) => Value::from(*v),
        FieldValue::Float(v) => Number::from_f64(*v).map(Value::Number).unwrap_or(Value::Null),
        FieldValue::Text(s) => Value::String(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{JsonLoader, RecordLoader};
    use crate::types::Channel;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    fn sample() -> RecordSet {
        let t0 = Utc.with_ymd_and_hms(2021, 7, 25, 13, 20, 0).unwrap();
        let mut set = RecordSet::new();
        set.metadata.insert("device name".into(), "Pixel".into());
        let location: Arc<str> = Arc::from("Location");
        for i in 0..3 {
            set.push(
                SensorRecord::new(location.clone(), t0 + Duration::nanoseconds(i * 1_000_123_456))
                    .with_field("latitude", FieldValue::Float(47.07 + i as f64 * 1e-4))
                    .with_field("longitude", FieldValue::Float(15.43))
                    .with_field("satellites", FieldValue::Int(9)),
            );
        }
        set.push(
            SensorRecord::new(Arc::from("Battery"), t0)
                .with_field("batteryState", FieldValue::Text("charging".into())),
        );
        set
    }

    #[test]
    fn test_document_shape() {
        let value = to_value(&sample(), TimestampFormat::UnixSeconds);
        let obj = value.as_object().unwrap();
        let keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Location", "Battery", "Metadata"]);

        let first = &obj["Location"][0];
        assert_eq!(first.as_object().unwrap().keys().next().unwrap(), "time");
        assert_eq!(first["time"].as_f64(), Some(1_627_219_200.0));
        assert_eq!(first["satellites"].as_i64(), Some(9));
        assert_eq!(obj["Battery"][0]["batteryState"], "charging");
        assert_eq!(obj["Metadata"]["device name"], "Pixel");
    }

    #[test]
    fn test_iso_timestamps() {
        let value = to_value(&sample(), TimestampFormat::Iso8601);
        assert_eq!(value["Location"][0]["time"], "2021-07-25T13:20:00+00:00");
    }

    #[test]
    fn test_render_uses_four_space_indent() {
        let text = render(&sample(), TimestampFormat::UnixSeconds).unwrap();
        assert!(text.starts_with("{\n    \"Location\": [\n        {"));
    }

    #[test]
    fn test_unix_round_trip_preserves_timestamps() {
        let original = sample();
        let text = render(&original, TimestampFormat::UnixSeconds).unwrap();
        let reloaded = JsonLoader.load(text.as_bytes()).unwrap();

        assert_eq!(reloaded.metadata, original.metadata);
        for channel in original.channels() {
            let other: &Channel = reloaded.channel(&channel.name).unwrap();
            assert_eq!(other.len(), channel.len());
            for (a, b) in channel.records.iter().zip(&other.records) {
                let drift = (a.timestamp - b.timestamp).num_nanoseconds().unwrap().abs();
                assert!(drift < 1_000, "drift {}ns", drift);
                assert_eq!(a.fields, b.fields);
            }
        }
    }

    #[test]
    fn test_iso_round_trip_is_exact() {
        let original = sample();
        let text = render(&original, TimestampFormat::Iso8601).unwrap();
        let reloaded = JsonLoader.load(text.as_bytes()).unwrap();
        assert_eq!(reloaded, original);
    }
}
