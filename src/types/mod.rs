pub mod value;

pub use value::FieldValue;

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Channel carrying GPS fixes; the only one the track simplifier touches.
pub const LOCATION_CHANNEL: &str = "Location";

/// Pseudo-channel holding capture-wide key/value metadata.
pub const METADATA_CHANNEL: &str = "Metadata";

/// Capture-wide metadata (device name, app version, sample rates, ...).
pub type Metadata = BTreeMap<String, String>;

/// WGS84 position carried by a Location record
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
}

/// One timestamped sample of one sensor channel
#[derive(Clone, Debug, PartialEq)]
pub struct SensorRecord {
    pub channel: Arc<str>,
    pub timestamp: DateTime<Utc>,
    pub fields: BTreeMap<String, FieldValue>,
}

impl SensorRecord {
    pub fn new(channel: Arc<str>, timestamp: DateTime<Utc>) -> Self {
        SensorRecord {
            channel,
            timestamp,
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field insertion, mostly for tests and loaders
    pub fn with_field(mut self, name: &str, value: FieldValue) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    pub fn field_f64(&self, name: &str) -> Option<f64> {
        self.fields.get(name).and_then(FieldValue::as_f64)
    }

    /// Latitude/longitude (and altitude when recorded), if this is a fix
    pub fn position(&self) -> Option<Position> {
        Some(Position {
            latitude: self.field_f64("latitude")?,
            longitude: self.field_f64("longitude")?,
            altitude: self.field_f64("altitude"),
        })
    }
}

/// Chronological samples of one named sensor stream
#[derive(Clone, Debug, PartialEq)]
pub struct Channel {
    pub name: Arc<str>,
    pub records: Vec<SensorRecord>,
}

impl Channel {
    pub fn new(name: &str) -> Self {
        Channel {
            name: Arc::from(name),
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// In-memory capture: every channel's records plus the capture metadata.
///
/// Channels keep load order; records keep their per-channel insertion
/// order. Pipeline stages only drop records, they never reorder them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordSet {
    pub metadata: Metadata,
    channels: Vec<Channel>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to its channel, creating the channel on first use
    pub fn push(&mut self, record: SensorRecord) {
        match self
            .channels
            .iter_mut()
            .find(|c| *c.name == *record.channel)
        {
            Some(channel) => channel.records.push(record),
            None => self.channels.push(Channel {
                name: record.channel.clone(),
                records: vec![record],
            }),
        }
    }

    /// Register an empty channel so it keeps its position in load order
    pub fn ensure_channel(&mut self, name: &str) {
        if self.channel(name).is_none() {
            self.channels.push(Channel::new(name));
        }
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channels_mut(&mut self) -> &mut [Channel] {
        &mut self.channels
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| &*c.name == name)
    }

    pub fn channel_mut(&mut self, name: &str) -> Option<&mut Channel> {
        self.channels.iter_mut().find(|c| &*c.name == name)
    }

    pub fn location(&self) -> Option<&Channel> {
        self.channel(LOCATION_CHANNEL)
    }

    pub fn record_count(&self) -> usize {
        self.channels.iter().map(Channel::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }

    /// Earliest and latest timestamp across all channels
    pub fn time_bounds(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let mut timestamps = self
            .channels
            .iter()
            .flat_map(|c| c.records.iter().map(|r| r.timestamp));
        let first = timestamps.next()?;
        Some(timestamps.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t))))
    }
}
