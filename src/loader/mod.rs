//! Loading a Sensor Logger capture into a [`RecordSet`].
//!
//! Two input shapes are supported, selected by sniffing the payload:
//! - JSON: either the app's raw export (an array of records tagged with a
//!   `sensor` key) or the reformatted document this tool writes
//!   (an object mapping channel name to its records)
//! - Zip: one CSV member per channel, header row holding the field names
//!
//! Either may arrive gzip-compressed. Every timestamp is normalized to
//! `DateTime<Utc>` following [`timestamp`]'s reconciliation rules.

pub mod archive;
pub mod json;
pub mod timestamp;

pub use archive::ArchiveLoader;
pub use json::JsonLoader;

use flate2::read::GzDecoder;
use std::io::Read;

use crate::error::{Result, SensorLoggerError};
use crate::types::RecordSet;

/// Keys that describe a record rather than being sensor fields
pub(crate) const SENSOR_KEY: &str = "sensor";
pub(crate) const TIME_KEY: &str = "time";
pub(crate) const ELAPSED_KEY: &str = "seconds_elapsed";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const ZIP_MAGIC: [u8; 4] = [b'P', b'K', 0x03, 0x04];

/// One input shape; `load` turns raw bytes into a record set.
pub trait RecordLoader {
    fn name(&self) -> &'static str;

    fn load(&self, bytes: &[u8]) -> Result<RecordSet>;
}

/// Pick the loader for a payload by looking at its first bytes
pub fn sniff(bytes: &[u8]) -> Option<Box<dyn RecordLoader>> {
    if bytes.starts_with(&ZIP_MAGIC) {
        return Some(Box::new(ArchiveLoader));
    }
    match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'[') | Some(b'{') => Some(Box::new(JsonLoader)),
        _ => None,
    }
}

/// Load a capture from raw file contents.
///
/// `source` names the input in log and error messages.
pub fn load(bytes: &[u8], source: &str) -> Result<RecordSet> {
    let inflated;
    let payload = if bytes.starts_with(&GZIP_MAGIC) {
        let mut buffer = Vec::new();
        GzDecoder::new(bytes).read_to_end(&mut buffer).map_err(|e| {
            SensorLoggerError::UnrecognizedInput(format!("{}: corrupt gzip stream: {}", source, e))
        })?;
        log::debug!("{}: inflated {} -> {} bytes", source, bytes.len(), buffer.len());
        inflated = buffer;
        &inflated[..]
    } else {
        bytes
    };

    let loader = sniff(payload).ok_or_else(|| {
        SensorLoggerError::UnrecognizedInput(format!(
            "{}: neither a JSON document nor a zip archive of CSV files",
            source
        ))
    })?;
    log::debug!("{}: loading as {}", source, loader.name());

    let set = loader.load(payload)?;
    if set.is_empty() {
        return Err(SensorLoggerError::EmptyInput(source.to_string()));
    }

    for channel in set.channels() {
        log::debug!("sensor: {} {} samples", channel.name, channel.len());
    }
    Ok(set)
}
