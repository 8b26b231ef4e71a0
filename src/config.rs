//! Typed run configuration, validated from the raw command line.

use crate::cli::Cli;
use crate::error::{Result, SensorLoggerError};
use crate::output::{ArtifactRequest, TimestampFormat};
use crate::timeparse::{parse_duration, parse_instant};
use crate::window::WindowSpec;

pub const DEFAULT_URL: &str = "http://localhost:8086";
pub const DEFAULT_DATABASE: &str = "sensorlogger";
pub const DEFAULT_BUCKET: &str = "sensorlogger";
pub const DEFAULT_ORG: &str = "-";
pub const DEFAULT_RETENTION_POLICY: &str = "autogen";
pub const DEFAULT_BATCH_SIZE: usize = 5000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OutputOptions {
    pub json: bool,
    pub gpx: bool,
    pub iso: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dialect {
    V1 {
        database: String,
        retention_policy: String,
    },
    V2 {
        org: String,
        bucket: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InfluxConfig {
    pub url: String,
    pub token: Option<String>,
    pub dialect: Dialect,
    pub batch_size: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LogOptions {
    pub debug: bool,
    pub influx_debug: bool,
    pub line_protocol: bool,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub outputs: OutputOptions,
    pub window: WindowSpec,
    pub tolerance: f64,
    pub influx: Option<InfluxConfig>,
    pub log: LogOptions,
    /// Invocation as typed, recorded in the GPX description
    pub command_line: String,
}

impl Config {
    /// Validate every flag before any input is touched
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let window = WindowSpec {
            begin: cli.begin.as_deref().map(parse_instant).transpose()?,
            end: cli.end.as_deref().map(parse_instant).transpose()?,
            skip: cli.skip.as_deref().map(parse_duration).transpose()?,
            trim: cli.trim.as_deref().map(parse_duration).transpose()?,
            duration: cli.duration.as_deref().map(parse_duration).transpose()?,
        };
        window.validate()?;

        if !cli.tolerance.is_finite() || cli.tolerance < 0.0 {
            return Err(SensorLoggerError::InvalidTolerance(cli.tolerance));
        }

        Ok(Config {
            outputs: OutputOptions {
                json: cli.json,
                gpx: cli.gpx,
                iso: cli.iso,
            },
            window,
            tolerance: cli.tolerance,
            influx: influx_config(cli)?,
            log: LogOptions {
                debug: cli.debug,
                influx_debug: cli.influx_debug,
                line_protocol: cli.influx_lineprotocol,
            },
            command_line: std::env::args().collect::<Vec<_>>().join(" "),
        })
    }

    /// Artifacts to assemble for one input whose outputs are named `stem`
    pub fn artifact_request(&self, stem: &str) -> ArtifactRequest {
        let format = if self.outputs.iso {
            TimestampFormat::Iso8601
        } else {
            TimestampFormat::UnixSeconds
        };
        ArtifactRequest {
            json: self.outputs.json.then_some(format),
            gpx: self
                .outputs
                .gpx
                .then(|| (format!("{}.gpx", stem), self.command_line.clone())),
            points: self.influx.is_some(),
        }
    }

    /// True when at least one sink would receive something
    pub fn has_outputs(&self) -> bool {
        self.outputs.json || self.outputs.gpx || self.influx.is_some()
    }
}

fn influx_config(cli: &Cli) -> Result<Option<InfluxConfig>> {
    if cli.influx1 && cli.influx2 {
        return Err(SensorLoggerError::ConflictingFlags(
            "-1/--influx1 and -2/--influx2 are mutually exclusive".into(),
        ));
    }

    let database_flags = [
        ("--url", cli.url.is_some()),
        ("--database", cli.database.is_some()),
        ("--token", cli.token.is_some()),
        ("--bucket", cli.bucket.is_some()),
        ("--org", cli.org.is_some()),
        ("--retention-policy", cli.retention_policy.is_some()),
    ];

    let dialect = if cli.influx1 {
        if cli.bucket.is_some() || cli.org.is_some() {
            log::warn!("--bucket/--org apply to InfluxDB 2.x and are ignored with -1");
        }
        Dialect::V1 {
            database: cli
                .database
                .clone()
                .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            retention_policy: cli
                .retention_policy
                .clone()
                .unwrap_or_else(|| DEFAULT_RETENTION_POLICY.to_string()),
        }
    } else if cli.influx2 {
        if cli.database.is_some() || cli.retention_policy.is_some() {
            log::warn!("--database/--retention-policy apply to InfluxDB 1.x and are ignored with -2");
        }
        Dialect::V2 {
            org: cli.org.clone().unwrap_or_else(|| DEFAULT_ORG.to_string()),
            bucket: cli
                .bucket
                .clone()
                .unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
        }
    } else {
        let given: Vec<&str> = database_flags
            .iter()
            .filter(|(_, set)| *set)
            .map(|(flag, _)| *flag)
            .collect();
        if !given.is_empty() {
            return Err(SensorLoggerError::ConflictingFlags(format!(
                "{} given without -1/--influx1 or -2/--influx2",
                given.join(", ")
            )));
        }
        return Ok(None);
    };

    Ok(Some(InfluxConfig {
        url: cli.url.clone().unwrap_or_else(|| DEFAULT_URL.to_string()),
        token: cli.token.clone(),
        dialect,
        batch_size: DEFAULT_BATCH_SIZE,
    }))
}
