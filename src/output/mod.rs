//! Output assembly: the processed record set projected into up to three
//! independent artifacts (reformatted JSON, GPX track, line-protocol points).

pub mod gpx;
pub mod json;
pub mod line_protocol;

pub use json::TimestampFormat;
pub use line_protocol::Point;

use crate::error::Result;
use crate::types::RecordSet;

/// Which artifacts to build, and the naming they need
#[derive(Clone, Debug, Default)]
pub struct ArtifactRequest {
    pub json: Option<TimestampFormat>,
    /// `(track name, description)`
    pub gpx: Option<(String, String)>,
    pub points: bool,
}

/// Fully rendered artifacts; nothing here has touched a sink yet
#[derive(Clone, Debug, Default)]
pub struct Artifacts {
    pub json: Option<String>,
    pub gpx: Option<String>,
    pub points: Option<Vec<Point>>,
}

impl Artifacts {
    pub fn is_empty(&self) -> bool {
        self.json.is_none() && self.gpx.is_none() && self.points.is_none()
    }
}

/// Build every requested artifact from `set`.
///
/// Each artifact is rendered completely before the function returns, so a
/// failing GPX request leaves nothing half-written.
pub fn assemble(set: &RecordSet, request: &ArtifactRequest) -> Result<Artifacts> {
    let json = request
        .json
        .map(|format| json::render(set, format))
        .transpose()?;
    let gpx = request
        .gpx
        .as_ref()
        .map(|(name, description)| gpx::render(set, name, description))
        .transpose()?;
    let points = request.points.then(|| line_protocol::points_from(set));

    Ok(Artifacts { json, gpx, points })
}
