//! Geotemporal metadata extraction via exiftool.

use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use core_types::SignedDegrees;
use serde::Deserialize;

use crate::IngestError;

/// Geotemporal metadata for one media file. All fields are optional;
/// files without EXIF data ingest fine with everything unset.
#[derive(Debug, Clone, Default)]
pub struct MediaMetadata {
    pub taken_at: Option<DateTime<Utc>>,
    pub taken_at_fallback: Option<DateTime<Utc>>,
    pub latitude: Option<SignedDegrees>,
    pub longitude: Option<SignedDegrees>,
}

impl MediaMetadata {
    /// Capture timestamp policy: the primary capture field wins, then
    /// the container creation time, then nothing.
    pub fn resolved_taken_at(&self) -> Option<DateTime<Utc>> {
        self.taken_at.or(self.taken_at_fallback)
    }
}

/// Extracts geotemporal metadata from a media file.
///
/// The production implementation shells out to exiftool; tests
/// substitute canned values to keep pipeline logic away from the
/// subprocess boundary.
pub trait MetadataExtractor {
    fn extract(&self, path: &Path) -> Result<MediaMetadata, IngestError>;
}

/// Date format handed to exiftool so timestamps come back as RFC 3339.
const EXIFTOOL_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Clone)]
pub struct ExiftoolExtractor {
    command: PathBuf,
}

impl Default for ExiftoolExtractor {
    fn default() -> Self {
        Self::new("exiftool")
    }
}

impl ExiftoolExtractor {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl MetadataExtractor for ExiftoolExtractor {
    fn extract(&self, path: &Path) -> Result<MediaMetadata, IngestError> {
        // The `#` tag suffix asks for machine-readable values, so
        // coordinates arrive as signed decimal degrees.
        let output = Command::new(&self.command)
            .arg("-TAG")
            .arg("-GPSLatitude#")
            .arg("-GPSLongitude#")
            .arg("-DateTimeOriginal")
            .arg("-TrackCreateDate")
            .arg("-j")
            .arg("-d")
            .arg(EXIFTOOL_DATE_FORMAT)
            .arg(path)
            .output()
            .map_err(|err| IngestError::MetadataExtraction {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;

        if !output.status.success() {
            return Err(IngestError::MetadataExtraction {
                path: path.to_path_buf(),
                reason: format!("exiftool exited with {}", output.status),
            });
        }

        parse_exiftool_output(path, &output.stdout)
    }
}

#[derive(Debug, Deserialize)]
struct ExiftoolRecord {
    #[serde(rename = "GPSLatitude")]
    latitude: Option<SignedDegrees>,
    #[serde(rename = "GPSLongitude")]
    longitude: Option<SignedDegrees>,
    #[serde(rename = "DateTimeOriginal")]
    taken_at: Option<DateTime<Utc>>,
    #[serde(rename = "TrackCreateDate")]
    track_create_date: Option<DateTime<Utc>>,
}

/// Parse exiftool `-j` output: a one-element array holding an object
/// with the requested tags. Stdout is the only data channel; anything
/// that is not JSON means the tool itself misbehaved, while valid JSON
/// of the wrong shape is a format error.
fn parse_exiftool_output(path: &Path, stdout: &[u8]) -> Result<MediaMetadata, IngestError> {
    let value: serde_json::Value =
        serde_json::from_slice(stdout).map_err(|err| IngestError::MetadataExtraction {
            path: path.to_path_buf(),
            reason: format!("unparseable exiftool output: {err}"),
        })?;

    let mut records: Vec<ExiftoolRecord> =
        serde_json::from_value(value).map_err(|err| IngestError::MetadataFormat {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;

    if records.is_empty() {
        return Err(IngestError::MetadataFormat {
            path: path.to_path_buf(),
            reason: "empty result array".to_string(),
        });
    }
    let record = records.swap_remove(0);

    Ok(MediaMetadata {
        taken_at: record.taken_at,
        taken_at_fallback: record.track_create_date,
        latitude: record.latitude,
        longitude: record.longitude,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> &'static Path {
        Path::new("/media/IMG_0001.jpg")
    }

    #[test]
    fn parses_full_record_with_string_coordinates() {
        let stdout = br#"[{
            "GPSLatitude": "+45.4641",
            "GPSLongitude": "-9.1393",
            "DateTimeOriginal": "2024-06-01T10:30:00Z"
        }]"#;
        let meta = parse_exiftool_output(path(), stdout).unwrap();
        assert_eq!(meta.latitude.map(SignedDegrees::value), Some(45.4641));
        assert_eq!(meta.longitude.map(SignedDegrees::value), Some(-9.1393));
        assert!(meta.taken_at.is_some());
        assert_eq!(meta.resolved_taken_at(), meta.taken_at);
    }

    #[test]
    fn parses_numeric_coordinates() {
        let stdout = br#"[{"GPSLatitude": 45.4641, "GPSLongitude": 9.1393}]"#;
        let meta = parse_exiftool_output(path(), stdout).unwrap();
        assert_eq!(meta.latitude.map(SignedDegrees::value), Some(45.4641));
        assert_eq!(meta.longitude.map(SignedDegrees::value), Some(9.1393));
        assert_eq!(meta.resolved_taken_at(), None);
    }

    #[test]
    fn unsigned_string_coordinate_is_a_format_error() {
        let stdout = br#"[{"GPSLatitude": "45.4641", "GPSLongitude": "-9.1393"}]"#;
        let err = parse_exiftool_output(path(), stdout).unwrap_err();
        assert!(matches!(err, IngestError::MetadataFormat { .. }));
    }

    #[test]
    fn empty_object_yields_empty_metadata() {
        let meta = parse_exiftool_output(path(), b"[{}]").unwrap();
        assert!(meta.latitude.is_none());
        assert!(meta.longitude.is_none());
        assert_eq!(meta.resolved_taken_at(), None);
    }

    #[test]
    fn fallback_timestamp_is_used_when_primary_absent() {
        let stdout = br#"[{"TrackCreateDate": "2024-06-01T10:30:00Z"}]"#;
        let meta = parse_exiftool_output(path(), stdout).unwrap();
        assert!(meta.taken_at.is_none());
        assert_eq!(meta.resolved_taken_at(), meta.taken_at_fallback);
    }

    #[test]
    fn non_json_output_is_an_extraction_error() {
        let err = parse_exiftool_output(path(), b"File not found").unwrap_err();
        assert!(matches!(err, IngestError::MetadataExtraction { .. }));
    }

    #[test]
    fn empty_array_is_a_format_error() {
        let err = parse_exiftool_output(path(), b"[]").unwrap_err();
        assert!(matches!(err, IngestError::MetadataFormat { .. }));
    }
}
