//! Per-channel capture summary, logged at debug level after each file.

use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;

use crate::timeparse::span_seconds;
use crate::types::{Metadata, RecordSet};

/// Nominal sampling interval as configured in the app
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NominalRate {
    /// Sampled as fast as the device allows
    Max,
    Millis(f64),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChannelStats {
    pub name: String,
    pub start: DateTime<Utc>,
    pub span_secs: f64,
    pub samples: usize,
    /// Observed interval; `None` for a zero-length span
    pub actual_ms: Option<f64>,
    pub nominal: Option<NominalRate>,
}

/// `sensors` / `sampleRateMs` are parallel `|`-separated lists
pub fn nominal_rates(metadata: &Metadata) -> HashMap<String, NominalRate> {
    let (Some(sensors), Some(rates)) = (metadata.get("sensors"), metadata.get("sampleRateMs"))
    else {
        return HashMap::new();
    };
    sensors
        .split('|')
        .zip(rates.split('|'))
        .filter_map(|(sensor, rate)| {
            let ms: f64 = rate.trim().parse().ok()?;
            let nominal = if ms.abs() < 0.001 {
                NominalRate::Max
            } else {
                NominalRate::Millis(ms)
            };
            Some((sensor.trim().to_string(), nominal))
        })
        .collect()
}

pub fn summarize(set: &RecordSet) -> Vec<ChannelStats> {
    let nominal = nominal_rates(&set.metadata);
    set.channels()
        .iter()
        .filter_map(|channel| {
            let first = channel.records.first()?;
            let last = channel.records.last()?;
            let span_secs = span_seconds(first.timestamp, last.timestamp);
            let samples = channel.len();
            Some(ChannelStats {
                name: channel.name.to_string(),
                start: first.timestamp,
                span_secs,
                samples,
                actual_ms: (span_secs.abs() >= 1e-5).then(|| 1000.0 * span_secs / samples as f64),
                nominal: nominal.get(&*channel.name).copied(),
            })
        })
        .collect()
}

pub fn format_table(stats: &[ChannelStats], metadata: &Metadata) -> Vec<String> {
    let mut lines = vec![
        format!(
            "{:<25}  {:<25} {:>8} {:>7} {:>8} {:>8}",
            "Sensor", "start", "duration", "samples", "actual", "nominal"
        ),
        format!("{:>86}", "ms/sample"),
    ];
    for s in stats {
        let actual = s
            .actual_ms
            .map(|ms| format!("{:.2}", ms))
            .unwrap_or_default();
        let nominal = match s.nominal {
            Some(NominalRate::Max) => "max".to_string(),
            Some(NominalRate::Millis(ms)) => format!("{:.0}", ms),
            None => String::new(),
        };
        let name: String = s.name.chars().take(25).collect();
        lines.push(format!(
            "{:<25}  {:<25} {:>8.1} {:>7} {:>8} {:>8}",
            name,
            s.start.to_rfc3339_opts(SecondsFormat::Secs, false),
            s.span_secs,
            s.samples,
            actual,
            nominal
        ));
    }
    if !metadata.is_empty() {
        lines.push("Metadata:".to_string());
        lines.extend(metadata.iter().map(|(k, v)| format!("\t{}: {}", k, v)));
    }
    lines
}

pub fn log_summary(set: &RecordSet) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    for line in format_table(&summarize(set), &set.metadata) {
        log::debug!("{}", line);
    }
}
