use thiserror::Error;

/// Sensor Logger conversion error types
///
/// Every variant is terminal for the input file being processed; the driver
/// reports it and moves on to the next file.
#[derive(Error, Debug)]
pub enum SensorLoggerError {
    #[error("{0:?} is not a valid duration. Examples: 20.2s 2h32m")]
    MalformedDuration(String),

    #[error("{0:?} is not a valid time. Example: '2021-07-25 13:25'")]
    MalformedTime(String),

    #[error("unrecognized input: {0}")]
    UnrecognizedInput(String),

    #[error("no sensor records found in {0}")]
    EmptyInput(String),

    #[error("empty time window: start {start} is not before end {end}")]
    EmptyWindow { start: String, end: String },

    #[error("{0} is not a valid tolerance: expected a non-negative number of degrees")]
    InvalidTolerance(f64),

    #[error("conflicting flags: {0}")]
    ConflictingFlags(String),

    #[error("can't create GPX from {0} - no Location records")]
    MissingLocation(String),

    #[error("database write failed: {0}")]
    SinkWrite(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, SensorLoggerError>;
