use clap::Parser;

/// Command line as typed; values are validated by `Config::from_cli`
#[derive(Parser, Debug, Clone)]
#[command(name = "sensorlogger")]
#[command(
    about = "Reformat Sensor Logger captures to JSON/GPX and write them to InfluxDB",
    long_about = None
)]
pub struct Cli {
    /// Capture files or http(s) URLs (.json, .zip, optionally gzipped)
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<String>,

    /// Show debug output
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Show InfluxDB client debug output
    #[arg(short = 'D', long)]
    pub influx_debug: bool,

    /// Log every line-protocol line sent to InfluxDB
    #[arg(short = 'l', long)]
    pub influx_lineprotocol: bool,

    /// Timestamps in the JSON output as ISO-8601 instead of epoch seconds
    #[arg(short = 'i', long)]
    pub iso: bool,

    /// Write a GPX file (<name>.gpx) from the Location channel
    #[arg(short = 'g', long)]
    pub gpx: bool,

    /// Write the reformatted JSON (<name>_reformat.json)
    #[arg(short = 'j', long)]
    pub json: bool,

    /// Douglas-Peucker tolerance in degrees for the Location track (0 = off)
    #[arg(long, default_value_t = 0.0)]
    pub tolerance: f64,

    /// Drop samples from the start, e.g. 1m30s
    #[arg(long, value_name = "DURATION")]
    pub skip: Option<String>,

    /// Drop samples from the end, e.g. 20s
    #[arg(long, value_name = "DURATION")]
    pub trim: Option<String>,

    /// Keep only this much of the capture, e.g. 2h32m
    #[arg(long, value_name = "DURATION")]
    pub duration: Option<String>,

    /// Start time, e.g. '2021-07-25 13:25'
    #[arg(long, value_name = "TIME")]
    pub begin: Option<String>,

    /// End time, e.g. '2021-07-25 14:00:30'
    #[arg(long, value_name = "TIME")]
    pub end: Option<String>,

    /// Write to an InfluxDB 1.x server
    #[arg(short = '1', long)]
    pub influx1: bool,

    /// Write to an InfluxDB 2.x server
    #[arg(short = '2', long)]
    pub influx2: bool,

    /// InfluxDB URL
    #[arg(short = 'u', long, value_name = "URL")]
    pub url: Option<String>,

    /// InfluxDB 1.x database
    #[arg(long)]
    pub database: Option<String>,

    /// InfluxDB token, or user:password for 1.x servers
    #[arg(short = 't', long)]
    pub token: Option<String>,

    /// InfluxDB 2.x bucket
    #[arg(short = 'b', long)]
    pub bucket: Option<String>,

    /// InfluxDB 2.x organization
    #[arg(short = 'O', long)]
    pub org: Option<String>,

    /// InfluxDB 1.x retention policy
    #[arg(short = 'r', long = "retention-policy", value_name = "POLICY")]
    pub retention_policy: Option<String>,
}
