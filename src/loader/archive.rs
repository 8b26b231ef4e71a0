use csv::ReaderBuilder;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;
use zip::ZipArchive;

use super::timestamp::{self, recording_epoch};
use super::{RecordLoader, ELAPSED_KEY, SENSOR_KEY, TIME_KEY};
use crate::error::{Result, SensorLoggerError};
use crate::types::{FieldValue, Metadata, RecordSet, SensorRecord, METADATA_CHANNEL};

/// Loader for the app's zipped CSV export: one `<Channel>.csv` per sensor
pub struct ArchiveLoader;

impl RecordLoader for ArchiveLoader {
    fn name(&self) -> &'static str {
        "csv-archive"
    }

    fn load(&self, bytes: &[u8]) -> Result<RecordSet> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| {
            SensorLoggerError::UnrecognizedInput(format!("unreadable zip archive: {}", e))
        })?;

        let mut members: Vec<String> = archive.file_names().map(str::to_string).collect();
        // Archive order otherwise; Metadata first so its recording epoch is known
        members.sort_by_key(|name| member_channel(name).as_deref() != Some(METADATA_CHANNEL));

        let mut set = RecordSet::new();
        let mut epoch = None;

        for member in members {
            let Some(channel) = member_channel(&member) else {
                log::debug!("ignoring archive member {}", member);
                continue;
            };

            let mut contents = Vec::new();
            archive.by_name(&member)?.read_to_end(&mut contents)?;
            log::debug!("read member={} ({} bytes)", member, contents.len());

            if channel == METADATA_CHANNEL {
                if let Some(meta) = read_metadata(&contents)? {
                    set.metadata = meta;
                    epoch = recording_epoch(&set.metadata);
                }
                continue;
            }

            let records = read_channel(Arc::from(channel.as_str()), &contents, epoch)?;
            if records.is_empty() {
                log::debug!("{}: no samples", channel);
                continue;
            }
            for record in records {
                set.push(record);
            }
        }
        Ok(set)
    }
}

/// Channel name for a CSV member (`dir/Location.csv` -> `Location`)
fn member_channel(member: &str) -> Option<String> {
    let path = Path::new(member);
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    if !is_csv || member.ends_with('/') {
        return None;
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn read_metadata(contents: &[u8]) -> Result<Option<Metadata>> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(contents);
    let headers = reader.headers()?.clone();
    let row = match reader.records().next() {
        Some(row) => row?,
        None => return Ok(None),
    };
    Ok(Some(
        headers
            .iter()
            .zip(row.iter())
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
    ))
}

fn read_channel(
    channel: Arc<str>,
    contents: &[u8],
    epoch: Option<chrono::DateTime<chrono::Utc>>,
) -> Result<Vec<SensorRecord>> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(contents);
    let headers = reader.headers()?.clone();
    let mut records = Vec::new();

    for (line, row) in reader.records().enumerate() {
        let row = row?;
        let mut time = None;
        let mut elapsed = None;
        for (key, cell) in headers.iter().zip(row.iter()) {
            match key {
                TIME_KEY => time = timestamp::from_text(cell),
                ELAPSED_KEY => elapsed = FieldValue::from_text(cell).as_f64(),
                _ => {}
            }
        }

        let Some(ts) = timestamp::resolve(time, elapsed, epoch) else {
            // +2: header row and 1-based line numbers
            log::debug!("{}: skipping untimed sample at line {}", channel, line + 2);
            continue;
        };

        let mut record = SensorRecord::new(channel.clone(), ts);
        for (key, cell) in headers.iter().zip(row.iter()) {
            if key == TIME_KEY || key == ELAPSED_KEY || key == SENSOR_KEY {
                continue;
            }
            record.fields.insert(key.to_string(), FieldValue::from_text(cell));
        }
        records.push(record);
    }
    Ok(records)
}
