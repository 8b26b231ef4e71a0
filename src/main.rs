use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use sensor_logger_rs::cli::Cli;
use sensor_logger_rs::{Config, Pipeline};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        })
        .parse_default_env()
        .init();

    // Flags are validated before any input is read
    let config = match Config::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("sensorlogger: {}", e);
            std::process::exit(1);
        }
    };
    if !config.has_outputs() {
        log::warn!("no output selected (-j, -g, -1 or -2); inputs are only checked");
    }

    let pipeline = Pipeline::new(config)?;
    let mut failed = 0usize;

    for file in &cli.files {
        match pipeline.process(file).await {
            Ok(report) => {
                log::debug!(
                    "{}: {} records, {} files, {} points",
                    report.source,
                    report.records,
                    report.files.len(),
                    report.points
                );
            }
            Err(e) => {
                failed += 1;
                log::error!("{}: {}", file, e);
                eprintln!("{}: {}", file, e);
            }
        }
    }

    if failed > 0 {
        eprintln!("{} of {} inputs failed", failed, cli.files.len());
        std::process::exit(1);
    }
    Ok(())
}
