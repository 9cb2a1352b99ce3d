pub mod content;
pub mod metadata;
pub mod pipeline;
pub mod thumbs;

pub use content::{path_stays_within, ContentStore, EventBucket};
pub use metadata::{ExiftoolExtractor, MediaMetadata, MetadataExtractor};
pub use pipeline::{IngestReport, Ingestor};
pub use thumbs::{MagickThumbnailer, ThumbnailGenerator};

use std::path::PathBuf;

use thiserror::Error;

/// Error taxonomy for the ingestion pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("metadata extraction failed for {}: {reason}", .path.display())]
    MetadataExtraction { path: PathBuf, reason: String },
    #[error("metadata output for {} has an unexpected shape: {reason}", .path.display())]
    MetadataFormat { path: PathBuf, reason: String },
    #[error("thumbnail generation failed for {}: {reason}", .path.display())]
    ThumbnailGeneration { path: PathBuf, reason: String },
    #[error("storage I/O failure: {0}")]
    Storage(#[from] std::io::Error),
    #[error("path {} escapes the storage root", .0.display())]
    PathTraversal(PathBuf),
    #[error("unsupported media file: {}", .0.display())]
    UnsupportedFile(PathBuf),
    #[error("event {0:?} does not exist")]
    UnknownEvent(String),
    #[error(transparent)]
    Store(#[from] gallery::StoreError),
}
