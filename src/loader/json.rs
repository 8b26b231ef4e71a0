use serde_json::{Map, Value};
use std::sync::Arc;

use super::timestamp::{self, recording_epoch};
use super::{RecordLoader, ELAPSED_KEY, SENSOR_KEY, TIME_KEY};
use crate::error::{Result, SensorLoggerError};
use crate::types::{FieldValue, Metadata, RecordSet, SensorRecord, METADATA_CHANNEL};

/// Loader for JSON captures (raw app export or reformatted document)
pub struct JsonLoader;

impl RecordLoader for JsonLoader {
    fn name(&self) -> &'static str {
        "json"
    }

    fn load(&self, bytes: &[u8]) -> Result<RecordSet> {
        let document: Value = serde_json::from_slice(bytes).map_err(|e| {
            SensorLoggerError::UnrecognizedInput(format!("invalid JSON document: {}", e))
        })?;

        match document {
            Value::Array(items) => load_export(&items),
            Value::Object(channels) => load_reformatted(&channels),
            _ => Err(SensorLoggerError::UnrecognizedInput(
                "JSON document is neither an array of records nor an object of channels".into(),
            )),
        }
    }
}

/// Raw export: `[{"sensor": "Location", "time": "...", ...}, ...]`
fn load_export(items: &[Value]) -> Result<RecordSet> {
    let mut set = RecordSet::new();

    if let Some(meta) = items
        .iter()
        .filter_map(Value::as_object)
        .find(|obj| obj.get(SENSOR_KEY).and_then(Value::as_str) == Some(METADATA_CHANNEL))
    {
        set.metadata = metadata_from_object(meta);
    }
    let epoch = recording_epoch(&set.metadata);

    let mut skipped = 0usize;
    for item in items {
        let Some(obj) = item.as_object() else {
            skipped += 1;
            continue;
        };
        let Some(sensor) = obj.get(SENSOR_KEY).and_then(Value::as_str) else {
            log::debug!("skipping sample without sensor name: {}", item);
            skipped += 1;
            continue;
        };
        if sensor == METADATA_CHANNEL {
            continue;
        }
        match record_from_object(Arc::from(sensor), obj, epoch) {
            Some(record) => set.push(record),
            None => {
                log::debug!("skipping sample: {}", item);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        log::debug!("skipped {} unusable samples", skipped);
    }
    Ok(set)
}

/// Reformatted document: `{"Location": [{...}, ...], "Metadata": {...}}`
fn load_reformatted(channels: &Map<String, Value>) -> Result<RecordSet> {
    let mut set = RecordSet::new();

    match channels.get(METADATA_CHANNEL) {
        Some(Value::Object(meta)) => set.metadata = metadata_from_object(meta),
        Some(Value::Array(rows)) => {
            if let Some(meta) = rows.first().and_then(Value::as_object) {
                set.metadata = metadata_from_object(meta);
            }
        }
        _ => {}
    }
    let epoch = recording_epoch(&set.metadata);

    for (name, value) in channels {
        if name == METADATA_CHANNEL {
            continue;
        }
        let Value::Array(rows) = value else {
            return Err(SensorLoggerError::UnrecognizedInput(format!(
                "channel {:?} is not an array of records",
                name
            )));
        };

        set.ensure_channel(name);
        let channel: Arc<str> = Arc::from(name.as_str());
        for row in rows {
            let record = row
                .as_object()
                .and_then(|obj| record_from_object(channel.clone(), obj, epoch));
            match record {
                Some(record) => set.push(record),
                None => log::debug!("skipping sample: {}", row),
            }
        }
    }
    Ok(set)
}

fn record_from_object(
    channel: Arc<str>,
    obj: &Map<String, Value>,
    epoch: Option<chrono::DateTime<chrono::Utc>>,
) -> Option<SensorRecord> {
    let time = obj.get(TIME_KEY).and_then(timestamp::from_json);
    let elapsed = obj
        .get(ELAPSED_KEY)
        .and_then(FieldValue::from_json)
        .and_then(|v| v.as_f64());
    let mut record = SensorRecord::new(channel, timestamp::resolve(time, elapsed, epoch)?);

    for (key, value) in obj {
        if key == SENSOR_KEY || key == TIME_KEY || key == ELAPSED_KEY {
            continue;
        }
        if let Some(field) = FieldValue::from_json(value) {
            record.fields.insert(key.clone(), field);
        }
    }
    Some(record)
}

fn metadata_from_object(obj: &Map<String, Value>) -> Metadata {
    obj.iter()
        .filter(|(key, _)| key.as_str() != SENSOR_KEY)
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), text)
        })
        .collect()
}
