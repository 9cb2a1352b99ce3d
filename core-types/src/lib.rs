use std::path::Path;

pub mod coords;

pub use coords::{ParseCoordinateError, SignedDegrees};

/// Still-image extensions accepted for ingestion (lowercase, no dot).
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "gif", "jpg", "jpeg", "jfif", "pjpeg", "pjp", "png", "svg", "webp",
];

/// Video extensions accepted for ingestion (lowercase, no dot).
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv"];

/// Broad classification of an ingestable media file. Thumbnailing and
/// thumbnail naming differ between the two kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a bare extension, case-insensitively. `None` means the
    /// extension is not on either allow-list.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    pub fn is_video(self) -> bool {
        matches!(self, MediaKind::Video)
    }
}

/// Classify a path by its extension, returning the kind together with
/// the normalized (lowercase) extension.
pub fn classify_path(path: &Path) -> Option<(MediaKind, String)> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    MediaKind::from_extension(&ext).map(|kind| (kind, ext))
}
