//! Time-window selection: resolve the extraction interval from the window
//! flags and drop every record outside it.

use chrono::{DateTime, Duration, Utc};

use crate::error::{Result, SensorLoggerError};
use crate::types::RecordSet;

/// Window flags as given on the command line, already parsed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WindowSpec {
    pub begin: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub skip: Option<Duration>,
    pub trim: Option<Duration>,
    pub duration: Option<Duration>,
}

/// Half-open extraction interval `[start, end)`, `start < end`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start >= end {
            return Err(SensorLoggerError::EmptyWindow {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(TimeWindow { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }
}

impl WindowSpec {
    /// `--skip`/`--begin` both set the start and `--trim`/`--end` both set
    /// the end, so each pair is rejected up front.
    pub fn validate(&self) -> Result<()> {
        if self.skip.is_some() && self.begin.is_some() {
            return Err(SensorLoggerError::ConflictingFlags(
                "--skip and --begin arguments are incompatible".into(),
            ));
        }
        if self.trim.is_some() && self.end.is_some() {
            return Err(SensorLoggerError::ConflictingFlags(
                "--trim and --end arguments are incompatible".into(),
            ));
        }
        Ok(())
    }

    pub fn is_unbounded(&self) -> bool {
        *self == WindowSpec::default()
    }

    fn start_anchored(&self) -> bool {
        self.begin.is_some() || self.skip.is_some()
    }

    fn end_anchored(&self) -> bool {
        self.end.is_some() || self.trim.is_some()
    }

    /// Resolve the window against the capture's earliest and latest sample.
    ///
    /// The natural end is one nanosecond past `latest` so an untrimmed
    /// window keeps the final sample. A duration caps the window from the
    /// start unless only the end is anchored, in which case it counts back
    /// from the end. With `begin`, `end` and `duration` all given the
    /// duration still caps from `begin`.
    ///
    /// Offsets that push a bound outside the representable time range give
    /// an empty window, never a panic.
    pub fn resolve(&self, earliest: DateTime<Utc>, latest: DateTime<Utc>) -> Result<TimeWindow> {
        let natural_end = latest
            .checked_add_signed(Duration::nanoseconds(1))
            .unwrap_or(latest);

        let mut start = match (self.begin, self.skip) {
            (Some(begin), _) => begin,
            (None, Some(skip)) => earliest
                .checked_add_signed(skip)
                .ok_or_else(|| {
                    out_of_range(format!("{} + {}", earliest.to_rfc3339(), skip), latest)
                })?,
            (None, None) => earliest,
        };
        let mut end = match (self.end, self.trim) {
            (Some(end), _) => end,
            (None, Some(trim)) => natural_end
                .checked_sub_signed(trim)
                .ok_or_else(|| {
                    out_of_range(start, format!("{} - {}", latest.to_rfc3339(), trim))
                })?,
            (None, None) => natural_end,
        };

        if let Some(duration) = self.duration {
            // an overflowing bound lies beyond the other one, so it never wins
            if self.start_anchored() || !self.end_anchored() {
                if let Some(capped) = start.checked_add_signed(duration) {
                    end = end.min(capped);
                }
            } else if let Some(capped) = end.checked_sub_signed(duration) {
                start = start.max(capped);
            }
        }

        TimeWindow::new(start, end)
    }
}

fn out_of_range(start: impl ToString, end: impl ToString) -> SensorLoggerError {
    SensorLoggerError::EmptyWindow {
        start: start.to_string(),
        end: end.to_string(),
    }
}

/// Resolve `spec` against `set` and filter every channel to the window
pub fn select(set: RecordSet, spec: &WindowSpec) -> Result<(RecordSet, TimeWindow)> {
    let (earliest, latest) = set
        .time_bounds()
        .ok_or_else(|| SensorLoggerError::EmptyInput("record set".into()))?;
    let window = spec.resolve(earliest, latest)?;
    log::debug!(
        "window: {} .. {} (capture {} .. {})",
        window.start().to_rfc3339(),
        window.end().to_rfc3339(),
        earliest.to_rfc3339(),
        latest.to_rfc3339()
    );
    Ok((apply(set, &window), window))
}

/// Keep only records inside `window`; per-channel order is untouched
pub fn apply(mut set: RecordSet, window: &TimeWindow) -> RecordSet {
    for channel in set.channels_mut() {
        let before = channel.records.len();
        let skipped = channel
            .records
            .iter()
            .filter(|r| r.timestamp < window.start())
            .count();
        channel.records.retain(|r| window.contains(r.timestamp));
        let trimmed = before - skipped - channel.records.len();

        if skipped > 0 || trimmed > 0 {
            log::debug!(
                "{}: skipped {}, trimmed {} samples",
                channel.name,
                skipped,
                trimmed
            );
        }
    }
    set
}
