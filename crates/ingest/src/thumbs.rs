//! Thumbnail generation via ImageMagick.

use std::path::{Path, PathBuf};
use std::process::Command;

use core_types::MediaKind;

use crate::IngestError;

/// Bounding box for generated thumbnails, aspect ratio preserved.
pub const THUMBNAIL_BOUND: &str = "500x500";

/// Produces a thumbnail for a stored original.
///
/// `thumb_dir` and `thumb_path` both come in because the still-image
/// tool takes a target directory while the video tool takes an output
/// file. Failure is fatal for the file and never retried here.
pub trait ThumbnailGenerator {
    fn generate(
        &self,
        source: &Path,
        thumb_dir: &Path,
        thumb_path: &Path,
        kind: MediaKind,
    ) -> Result<(), IngestError>;
}

/// ImageMagick-backed generator: `mogrify` for stills (auto-oriented,
/// bounded), `magick convert` frame extraction for videos.
#[derive(Debug, Clone)]
pub struct MagickThumbnailer {
    mogrify: PathBuf,
    magick: PathBuf,
}

impl Default for MagickThumbnailer {
    fn default() -> Self {
        Self::new("mogrify", "magick")
    }
}

impl MagickThumbnailer {
    pub fn new(mogrify: impl Into<PathBuf>, magick: impl Into<PathBuf>) -> Self {
        Self {
            mogrify: mogrify.into(),
            magick: magick.into(),
        }
    }

    fn run(command: &mut Command, source: &Path) -> Result<(), IngestError> {
        let output = command
            .output()
            .map_err(|err| IngestError::ThumbnailGeneration {
                path: source.to_path_buf(),
                reason: err.to_string(),
            })?;
        if !output.status.success() {
            return Err(IngestError::ThumbnailGeneration {
                path: source.to_path_buf(),
                reason: format!(
                    "exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(())
    }
}

impl ThumbnailGenerator for MagickThumbnailer {
    fn generate(
        &self,
        source: &Path,
        thumb_dir: &Path,
        thumb_path: &Path,
        kind: MediaKind,
    ) -> Result<(), IngestError> {
        match kind {
            MediaKind::Image => {
                let mut cmd = Command::new(&self.mogrify);
                cmd.arg("-auto-orient")
                    .arg("-path")
                    .arg(thumb_dir)
                    .arg("-thumbnail")
                    .arg(THUMBNAIL_BOUND)
                    .arg(source);
                Self::run(&mut cmd, source)
            }
            MediaKind::Video => {
                // Second frame of the stream; `>` only ever shrinks.
                let mut frame = source.as_os_str().to_os_string();
                frame.push("[1]");
                let mut cmd = Command::new(&self.magick);
                cmd.arg("convert")
                    .arg("-resize")
                    .arg(format!("{THUMBNAIL_BOUND}>"))
                    .arg(frame)
                    .arg(thumb_path);
                Self::run(&mut cmd, source)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tool_is_a_generation_error() {
        let thumbnailer = MagickThumbnailer::new("/nonexistent/mogrify", "/nonexistent/magick");
        let err = thumbnailer
            .generate(
                Path::new("/tmp/1.jpg"),
                Path::new("/tmp/thumbs"),
                Path::new("/tmp/thumbs/1.jpg"),
                MediaKind::Image,
            )
            .unwrap_err();
        assert!(matches!(err, IngestError::ThumbnailGeneration { .. }));
    }
}
