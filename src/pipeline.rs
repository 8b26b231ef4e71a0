//! Per-file processing: load, select the window, simplify the track,
//! assemble the artifacts, hand them to the sinks.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;
use crate::error::Result;
use crate::loader;
use crate::output::{self, Artifacts};
use crate::simplify::simplify_track;
use crate::sinks::{write_atomic, InfluxSink, GPX_SUFFIX, JSON_SUFFIX};
use crate::source::InputSource;
use crate::stats;
use crate::types::RecordSet;
use crate::window;

/// What one input produced
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FileReport {
    pub source: String,
    pub records: usize,
    pub files: Vec<PathBuf>,
    pub points: usize,
}

/// Window selection then track simplification
pub fn transform(set: RecordSet, config: &Config) -> Result<RecordSet> {
    let (selected, _) = window::select(set, &config.window)?;
    Ok(simplify_track(selected, config.tolerance))
}

pub struct Pipeline {
    config: Config,
    client: reqwest::Client,
    influx: Option<InfluxSink>,
}

impl Pipeline {
    pub fn new(config: Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        let influx = config
            .influx
            .clone()
            .map(|influx| InfluxSink::new(influx, config.log))
            .transpose()?;
        Ok(Pipeline {
            config,
            client,
            influx,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn process(&self, arg: &str) -> Result<FileReport> {
        let source = InputSource::parse(arg);
        let label = source.label();

        let bytes = source.fetch(&self.client).await?;
        let set = transform(loader::load(&bytes, &label)?, &self.config)?;
        stats::log_summary(&set);

        let request = self.config.artifact_request(&source.stem);
        let artifacts = output::assemble(&set, &request)?;

        let mut report = FileReport {
            source: label,
            records: set.record_count(),
            ..Default::default()
        };
        self.deliver(&source, artifacts, &mut report).await?;
        Ok(report)
    }

    async fn deliver(
        &self,
        source: &InputSource,
        artifacts: Artifacts,
        report: &mut FileReport,
    ) -> Result<()> {
        let files = [(artifacts.json, JSON_SUFFIX), (artifacts.gpx, GPX_SUFFIX)];
        for (contents, suffix) in files {
            if let Some(contents) = contents {
                let path = source.artifact_path(suffix);
                write_atomic(&path, &contents)?;
                log::info!("{}: wrote {}", report.source, path.display());
                report.files.push(path);
            }
        }

        if let (Some(sink), Some(points)) = (&self.influx, artifacts.points) {
            report.points = sink.write(&report.source, &points).await?;
        }
        Ok(())
    }
}
