use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{Result, SensorLoggerError};
use crate::types::{RecordSet, LOCATION_CHANNEL};

const GPX_NAMESPACE: &str = "http://www.topografix.com/GPX/1/1";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str =
    "http://www.topografix.com/GPX/1/1 http://www.topografix.com/GPX/1/1/gpx.xsd";

/// GPX 1.1 track built from the Location channel
#[derive(Clone, Debug)]
pub struct GpxTrack {
    pub name: String,
    pub description: String,
    pub creator: String,
    pub author: String,
    pub track_points: Vec<GpxPoint>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GpxPoint {
    pub lat: f64,
    pub lon: f64,
    pub ele: Option<f64>,
    pub time: DateTime<Utc>,
    pub hdop: Option<f64>,
    pub vdop: Option<f64>,
}

/// Bounding box of the track points
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl GpxTrack {
    /// Track from every positioned Location record in `set`.
    ///
    /// `name` titles the track, `description` lands in `<metadata><desc>`.
    pub fn from_records(set: &RecordSet, name: &str, description: &str) -> Result<Self> {
        let track_points: Vec<GpxPoint> = set
            .location()
            .map(|channel| {
                channel
                    .records
                    .iter()
                    .filter_map(|r| {
                        let fix = r.position()?;
                        Some(GpxPoint {
                            lat: fix.latitude,
                            lon: fix.longitude,
                            ele: fix.altitude,
                            time: r.timestamp,
                            hdop: r.field_f64("horizontalAccuracy"),
                            vdop: r.field_f64("verticalAccuracy"),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        if track_points.is_empty() {
            return Err(SensorLoggerError::MissingLocation(name.to_string()));
        }

        let creator = match set.metadata.get("appVersion") {
            Some(version) => format!("Sensor Logger, app version {}", version),
            None => "Sensor Logger".to_string(),
        };
        let author = set
            .metadata
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(GpxTrack {
            name: name.to_string(),
            description: description.to_string(),
            creator,
            author,
            track_points,
        })
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let first = self.track_points.first()?;
        let init = Bounds {
            min_lat: first.lat,
            min_lon: first.lon,
            max_lat: first.lat,
            max_lon: first.lon,
        };
        Some(self.track_points.iter().fold(init, |b, p| Bounds {
            min_lat: b.min_lat.min(p.lat),
            min_lon: b.min_lon.min(p.lon),
            max_lat: b.max_lat.max(p.lat),
            max_lon: b.max_lon.max(p.lon),
        }))
    }

    pub fn to_gpx_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str(&format!(
            "<gpx version=\"1.1\" creator=\"{}\" xmlns=\"{}\" xmlns:xsi=\"{}\" xsi:schemaLocation=\"{}\">\n",
            escape(&self.creator),
            GPX_NAMESPACE,
            XSI_NAMESPACE,
            SCHEMA_LOCATION
        ));
        xml.push_str("  <metadata>\n");
        xml.push_str(&format!("    <name>{}</name>\n", escape(&self.name)));
        xml.push_str(&format!("    <desc>{}</desc>\n", escape(&self.description)));
        if !self.author.is_empty() {
            xml.push_str(&format!(
                "    <author>\n      <name>{}</name>\n    </author>\n",
                escape(&self.author)
            ));
        }
        if let Some(first) = self.track_points.first() {
            xml.push_str(&format!("    <time>{}</time>\n", format_time(first.time)));
        }
        if let Some(b) = self.bounds() {
            xml.push_str(&format!(
                "    <bounds minlat=\"{}\" minlon=\"{}\" maxlat=\"{}\" maxlon=\"{}\"/>\n",
                b.min_lat, b.min_lon, b.max_lat, b.max_lon
            ));
        }
        xml.push_str("  </metadata>\n");
        xml.push_str("  <trk>\n");
        xml.push_str(&format!("    <name>{}</name>\n", escape(&self.name)));
        xml.push_str("    <trkseg>\n");

        for point in &self.track_points {
            xml.push_str(&format!(
                "      <trkpt lat=\"{}\" lon=\"{}\">\n",
                point.lat, point.lon
            ));
            // element order is fixed by the GPX 1.1 schema
            if let Some(ele) = point.ele {
                xml.push_str(&format!("        <ele>{}</ele>\n", ele));
            }
            xml.push_str(&format!("        <time>{}</time>\n", format_time(point.time)));
            if let Some(hdop) = point.hdop {
                xml.push_str(&format!("        <hdop>{}</hdop>\n", hdop));
            }
            if let Some(vdop) = point.vdop {
                xml.push_str(&format!("        <vdop>{}</vdop>\n", vdop));
            }
            xml.push_str("      </trkpt>\n");
        }

        xml.push_str("    </trkseg>\n");
        xml.push_str("  </trk>\n");
        xml.push_str("</gpx>\n");

        xml
    }
}

/// Render the GPX document for `set`, or fail when it has no position fixes
pub fn render(set: &RecordSet, name: &str, description: &str) -> Result<String> {
    let track = GpxTrack::from_records(set, name, description)?;
    log::debug!(
        "gpx: {} {} points",
        LOCATION_CHANNEL,
        track.track_points.len()
    );
    Ok(track.to_gpx_xml())
}

fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldValue, SensorRecord};
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    fn track_set() -> RecordSet {
        let t0 = Utc.with_ymd_and_hms(2021, 7, 25, 13, 20, 0).unwrap();
        let location: Arc<str> = Arc::from(LOCATION_CHANNEL);
        let mut set = RecordSet::new();
        set.metadata.insert("appVersion".into(), "1.9.1".into());
        set.metadata.insert("device name".into(), "Pixel <4a>".into());
        for i in 0..3 {
            set.push(
                SensorRecord::new(location.clone(), t0 + Duration::seconds(i))
                    .with_field("latitude", FieldValue::Float(47.0 + i as f64 * 0.5))
                    .with_field("longitude", FieldValue::Float(15.0 - i as f64))
                    .with_field("altitude", FieldValue::Float(350.0))
                    .with_field("horizontalAccuracy", FieldValue::Float(4.5))
                    .with_field("verticalAccuracy", FieldValue::Int(3)),
            );
        }
        set
    }

    #[test]
    fn test_gpx_track_creation() {
        let track = GpxTrack::from_records(&track_set(), "ride", "sensorlogger -g ride.zip").unwrap();
        assert_eq!(track.track_points.len(), 3);
        assert_eq!(track.creator, "Sensor Logger, app version 1.9.1");
        assert_eq!(track.author, "appVersion: 1.9.1, device name: Pixel <4a>");
        assert_eq!(track.track_points[1].vdop, Some(3.0));

        let b = track.bounds().unwrap();
        assert_eq!((b.min_lat, b.max_lat), (47.0, 48.0));
        assert_eq!((b.min_lon, b.max_lon), (13.0, 15.0));
    }

    #[test]
    fn test_gpx_xml() {
        let xml = render(&track_set(), "ride", "sensorlogger -g ride.zip").unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<gpx version=\"1.1\""));
        assert!(xml.contains("<trkpt lat=\"47.5\" lon=\"14\">"));
        assert!(xml.contains("<ele>350</ele>"));
        assert!(xml.contains("<time>2021-07-25T13:20:01Z</time>"));
        assert!(xml.contains("<hdop>4.5</hdop>"));
        assert!(xml.contains("<bounds minlat=\"47\" minlon=\"13\" maxlat=\"48\" maxlon=\"15\"/>"));
        assert!(xml.contains("Pixel &lt;4a&gt;"));
        assert_eq!(xml.matches("<trkpt ").count(), 3);
        assert!(xml.trim_end().ends_with("</gpx>"));
    }

    #[test]
    fn test_missing_location() {
        let mut set = RecordSet::new();
        set.push(SensorRecord::new(Arc::from("Battery"), Utc::now()));
        assert!(matches!(
            render(&set, "x", ""),
            Err(SensorLoggerError::MissingLocation(_))
        ));

        // a Location channel without fixes is no better
        set.push(
            SensorRecord::new(Arc::from(LOCATION_CHANNEL), Utc::now())
                .with_field("speed", FieldValue::Float(1.0)),
        );
        assert!(render(&set, "x", "").is_err());
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a & b \"c\" 'd'"), "a &amp; b &quot;c&quot; &apos;d&apos;");
    }
}
