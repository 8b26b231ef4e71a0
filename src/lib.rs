//! Reformat, trim and simplify Sensor Logger captures, and write them out as
//! JSON, GPX or InfluxDB points.

pub mod cli;
pub mod config;
pub mod error;
pub mod loader;
pub mod output;
pub mod pipeline;
pub mod simplify;
pub mod sinks;
pub mod source;
pub mod stats;
pub mod timeparse;
pub mod types;
pub mod window;

pub use config::Config;
pub use error::{Result, SensorLoggerError};
pub use pipeline::{FileReport, Pipeline};
pub use types::{Channel, RecordSet, SensorRecord};
