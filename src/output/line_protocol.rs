//! InfluxDB line protocol points.
//!
//! One point per record: measurement = channel, tags from a few metadata
//! keys, every field of the record, nanosecond timestamp.

use chrono::{DateTime, Utc};

use crate::types::{FieldValue, Metadata, RecordSet};

/// Metadata keys carried as tags on every point
pub const TAG_KEYS: [&str; 4] = ["device name", "appVersion", "device id", "recording time"];

#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    pub measurement: String,
    pub tags: Vec<(String, String)>,
    pub fields: Vec<(String, FieldValue)>,
    pub timestamp_ns: i64,
}

impl Point {
    /// Encoded line, or `None` when no field survives encoding
    pub fn to_line(&self) -> Option<String> {
        let fields: Vec<String> = self
            .fields
            .iter()
            .filter_map(|(key, value)| {
                Some(format!("{}={}", escape_key(key), encode_field(value)?))
            })
            .collect();
        if fields.is_empty() {
            return None;
        }

        let mut line = escape_measurement(&self.measurement);
        for (key, value) in &self.tags {
            line.push(',');
            line.push_str(&escape_key(key));
            line.push('=');
            line.push_str(&escape_key(value));
        }
        line.push(' ');
        line.push_str(&fields.join(","));
        line.push(' ');
        line.push_str(&self.timestamp_ns.to_string());
        Some(line)
    }
}

/// Tags shared by every point of a capture, sorted by key
pub fn tags_from(metadata: &Metadata) -> Vec<(String, String)> {
    let mut tags: Vec<(String, String)> = TAG_KEYS
        .iter()
        .filter_map(|key| {
            let value = metadata.get(*key)?;
            (!value.is_empty()).then(|| (key.to_string(), value.clone()))
        })
        .collect();
    tags.sort();
    tags
}

pub fn points_from(set: &RecordSet) -> Vec<Point> {
    let tags = tags_from(&set.metadata);
    let mut points = Vec::with_capacity(set.record_count());
    for channel in set.channels() {
        for record in &channel.records {
            let Some(timestamp_ns) = epoch_nanos(record.timestamp) else {
                log::debug!("{}: timestamp {} out of range", channel.name, record.timestamp);
                continue;
            };
            points.push(Point {
                measurement: channel.name.to_string(),
                tags: tags.clone(),
                fields: record
                    .fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
                timestamp_ns,
            });
        }
    }
    points
}

fn epoch_nanos(timestamp: DateTime<Utc>) -> Option<i64> {
    timestamp
        .timestamp()
        .checked_mul(1_000_000_000)?
        .checked_add(i64::from(timestamp.timestamp_subsec_nanos()))
}

/// Numbers are always written as floats: a field that reads `0` in one
/// sample and `1.25` in the next must keep one type within a measurement.
fn encode_field(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Int(v) => Some(format!("{:?}", *v as f64)),
        FieldValue::Float(v) if v.is_finite() => Some(format!("{:?}", v)),
        FieldValue::Float(_) => None,
        FieldValue::Text(s) => Some(format!(
            "\"{}\"",
            s.replace('\\', "\\\\").replace('"', "\\\"")
        )),
    }
}

fn escape_measurement(text: &str) -> String {
    escape(text, &[',', ' '])
}

fn escape_key(text: &str) -> String {
    escape(text, &[',', '=', ' '])
}

/// Line breaks cannot be escaped in keys or tag values; they become spaces.
fn escape(text: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        let c = if c == '\n' || c == '\r' { ' ' } else { c };
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{JsonLoader, RecordLoader};
    use crate::types::SensorRecord;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn point(fields: Vec<(&str, FieldValue)>) -> Point {
        Point {
            measurement: "Location".into(),
            tags: vec![("device name".into(), "Pixel 4a".into())],
            fields: fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            timestamp_ns: 1_627_219_200_123_456_789,
        }
    }

    #[test]
    fn test_encode_line() {
        let line = point(vec![
            ("altitude", FieldValue::Float(350.0)),
            ("latitude", FieldValue::Float(47.07)),
            ("satellites", FieldValue::Int(9)),
        ])
        .to_line()
        .unwrap();
        assert_eq!(
            line,
            "Location,device\\ name=Pixel\\ 4a altitude=350.0,latitude=47.07,satellites=9.0 1627219200123456789"
        );
    }

    #[test]
    fn test_string_fields_are_quoted() {
        let line = point(vec![("state", FieldValue::Text("say \"hi\" \\o/".into()))])
            .to_line()
            .unwrap();
        assert!(line.contains("state=\"say \\\"hi\\\" \\\\o/\""));
    }

    #[test]
    fn test_non_finite_fields_dropped() {
        assert_eq!(point(vec![("x", FieldValue::Float(f64::NAN))]).to_line(), None);
        assert_eq!(point(vec![]).to_line(), None);
        let line = point(vec![
            ("x", FieldValue::Float(f64::INFINITY)),
            ("y", FieldValue::Float(1.5)),
        ])
        .to_line()
        .unwrap();
        assert!(line.contains(" y=1.5 "));
    }

    #[test]
    fn test_points_from_record_set() {
        let mut set = RecordSet::new();
        set.metadata.insert("device name".into(), "Pixel".into());
        set.metadata.insert("appVersion".into(), "1.9.1".into());
        set.metadata.insert("platform".into(), "android".into());
        set.metadata.insert("device id".into(), "".into());
        let t = Utc.with_ymd_and_hms(2021, 7, 25, 13, 20, 0).unwrap();
        set.push(SensorRecord::new(Arc::from("Gravity"), t).with_field("x", FieldValue::Float(0.1)));

        let points = points_from(&set);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].measurement, "Gravity");
        assert_eq!(points[0].timestamp_ns, 1_627_219_200_000_000_000);
        assert_eq!(
            points[0].tags,
            vec![
                ("appVersion".to_string(), "1.9.1".to_string()),
                ("device name".to_string(), "Pixel".to_string()),
            ]
        );
    }

    #[test]
    fn test_measurement_escaping() {
        assert_eq!(escape_measurement("My Sensor,1"), "My\\ Sensor\\,1");
        assert_eq!(escape_key("a=b"), "a\\=b");
    }

    #[test]
    fn test_line_breaks_never_split_a_line() {
        let mut p = point(vec![("x\ny", FieldValue::Float(1.0))]);
        p.measurement = "Loc\r\nation".into();
        p.tags = vec![("device\nname".into(), "Pixel\n4a".into())];
        let line = p.to_line().unwrap();
        assert!(!line.contains('\n') && !line.contains('\r'));
        assert_eq!(
            line,
            "Loc\\ \\ ation,device\\ name=Pixel\\ 4a x\\ y=1.0 1627219200123456789"
        );
    }

    #[test]
    fn test_field_type_is_stable_across_samples() {
        let doc = r#"[
            {"sensor": "Location", "time": "1627219200000000000", "latitude": "47.07", "longitude": "15.43", "speed": "0"},
            {"sensor": "Location", "time": "1627219201000000000", "latitude": "47.08", "longitude": "15.44", "speed": "1.25"},
            {"sensor": "Location", "time": "1627219202000000000", "latitude": "47.09", "longitude": "15.45", "speed": "5"}
        ]"#;
        let set = JsonLoader.load(doc.as_bytes()).unwrap();
        let lines: Vec<String> = points_from(&set).iter().filter_map(Point::to_line).collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("speed=0.0 "));
        assert!(lines[1].contains("speed=1.25 "));
        assert!(lines[2].contains("speed=5.0 "));
        for line in &lines {
            let fields = line.split(' ').nth(1).unwrap();
            for field in fields.split(',') {
                let (_, value) = field.split_once('=').unwrap();
                assert!(value.contains('.'), "{} is not a float field", field);
            }
        }
    }
}
