//! Destinations for assembled artifacts: files beside the input and the
//! InfluxDB HTTP API.

pub mod file;
pub mod influx;

pub use file::{write_atomic, GPX_SUFFIX, JSON_SUFFIX};
pub use influx::InfluxSink;
