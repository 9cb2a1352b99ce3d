//! The ingestion pipeline: one file at a time from source bytes to a
//! consistent row + original + thumbnail triple, or no trace at all.

use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use core_types::classify_path;
use gallery::{Event, GalleryDb, NewPhoto, Photo, StoreError};

use crate::content::{ContentStore, EventBucket};
use crate::metadata::MetadataExtractor;
use crate::thumbs::ThumbnailGenerator;
use crate::IngestError;

/// Outcome of a batch ingestion. A failed or unsupported file never
/// aborts the rest of the batch; a traversal rejection does.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub ingested: Vec<Photo>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, IngestError)>,
}

pub struct Ingestor<'a> {
    db: &'a GalleryDb,
    content: &'a ContentStore,
    extractor: &'a dyn MetadataExtractor,
    thumbnailer: &'a dyn ThumbnailGenerator,
}

impl<'a> Ingestor<'a> {
    pub fn new(
        db: &'a GalleryDb,
        content: &'a ContentStore,
        extractor: &'a dyn MetadataExtractor,
        thumbnailer: &'a dyn ThumbnailGenerator,
    ) -> Self {
        Self {
            db,
            content,
            extractor,
            thumbnailer,
        }
    }

    /// Ingest a single file into the given event (by name) or into the
    /// unassigned bucket.
    ///
    /// Steps run in a fixed order: classify, extract metadata, resolve
    /// the event, insert the row, copy the original, generate the
    /// thumbnail. Each failure after the insert undoes everything the
    /// earlier steps produced, so a failed ingest leaves no partial
    /// state behind.
    pub fn ingest_file(&self, source: &Path, event: Option<&str>) -> Result<Photo, IngestError> {
        let Some((kind, extension)) = classify_path(source) else {
            return Err(IngestError::UnsupportedFile(source.to_path_buf()));
        };

        let metadata = self.extractor.extract(source)?;
        let event_id = self.resolve_event(event)?;
        let bucket = EventBucket::from_event(event_id);

        self.content.ensure_dirs(bucket)?;

        let photo = Photo::insert(
            self.db,
            NewPhoto {
                taken_at: metadata.resolved_taken_at(),
                latitude: metadata.latitude.map(|c| c.value()),
                longitude: metadata.longitude.map(|c| c.value()),
                event: event_id,
                extension,
            },
        )?;

        if let Err(err) = self.copy_original(bucket, &photo, source) {
            self.compensate_row(&photo);
            return Err(err);
        }

        let original = self.content.original_path(bucket, &photo.file_name());
        let thumb_dir = self.content.thumbnails_dir(bucket);
        let thumb_path = self.content.thumbnail_path(bucket, &photo.thumb_name());
        if let Err(err) = self
            .thumbnailer
            .generate(&original, &thumb_dir, &thumb_path, kind)
        {
            self.compensate_row(&photo);
            self.compensate_files(bucket, &photo);
            return Err(err);
        }

        info!(photo = photo.id, file = %photo.file_name(), "ingested");
        Ok(photo)
    }

    /// Walk a directory depth-first in lexicographic order, ingesting
    /// every supported file as an independent unit of work.
    pub fn ingest_directory(
        &self,
        dir: &Path,
        event: Option<&str>,
    ) -> Result<IngestReport, IngestError> {
        let mut report = IngestReport::default();
        for entry in WalkDir::new(dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.into_path();
            if classify_path(&path).is_none() {
                warn!(file = %path.display(), "skipping unsupported file type");
                report.skipped.push(path);
                continue;
            }
            match self.ingest_file(&path, event) {
                Ok(photo) => report.ingested.push(photo),
                Err(err @ IngestError::PathTraversal(_)) => return Err(err),
                Err(err) => {
                    warn!(file = %path.display(), error = %err, "ingestion failed");
                    report.failed.push((path, err));
                }
            }
        }
        Ok(report)
    }

    /// Ingest an uploaded buffer. The upload's own name is consulted
    /// only for its extension; bytes are staged under the storage root
    /// and the staged copy is removed whatever the outcome.
    pub fn ingest_upload(
        &self,
        file_name: &str,
        bytes: &[u8],
        event: Option<&str>,
    ) -> Result<Photo, IngestError> {
        let Some((_, extension)) = classify_path(Path::new(file_name)) else {
            return Err(IngestError::UnsupportedFile(PathBuf::from(file_name)));
        };
        let staged = self.content.stage_upload(&extension, bytes)?;
        let result = self.ingest_file(&staged, event);
        self.content.discard_staged(&staged);
        result
    }

    /// Delete a photo row together with its stored original and
    /// thumbnail.
    pub fn delete_photo(&self, id: i64) -> Result<(), IngestError> {
        let photo = Photo::get_by_id(self.db, id)?;
        let bucket = EventBucket::from_event(photo.event);
        Photo::delete(self.db, id)?;
        self.content.remove_thumbnail(bucket, &photo.thumb_name())?;
        self.content.remove_original(bucket, &photo.file_name())?;
        info!(photo = id, "deleted");
        Ok(())
    }

    /// Delete an event. Its photo rows cascade in the store, then both
    /// bucket directories are removed.
    pub fn delete_event(&self, id: i64) -> Result<(), IngestError> {
        Event::delete(self.db, id)?;
        self.content.remove_bucket(EventBucket::Event(id))?;
        info!(event = id, "deleted event");
        Ok(())
    }

    fn resolve_event(&self, event: Option<&str>) -> Result<Option<i64>, IngestError> {
        match event {
            None => Ok(None),
            Some(name) => match Event::get_by_name(self.db, name) {
                Ok(event) => Ok(Some(event.id)),
                Err(StoreError::RecordNotFound) => {
                    Err(IngestError::UnknownEvent(name.to_string()))
                }
                Err(err) => Err(err.into()),
            },
        }
    }

    fn copy_original(
        &self,
        bucket: EventBucket,
        photo: &Photo,
        source: &Path,
    ) -> Result<(), IngestError> {
        match self.content.store_original(bucket, &photo.file_name(), source) {
            Ok(_) => Ok(()),
            Err(err) => {
                // The copy may have left a partial file behind.
                if let Err(cleanup) = self.content.remove_original(bucket, &photo.file_name()) {
                    warn!(photo = photo.id, error = %cleanup, "rollback: partial original not removed");
                }
                Err(err)
            }
        }
    }

    fn compensate_row(&self, photo: &Photo) {
        if let Err(err) = Photo::delete(self.db, photo.id) {
            warn!(photo = photo.id, error = %err, "rollback: photo row not deleted");
        }
    }

    fn compensate_files(&self, bucket: EventBucket, photo: &Photo) {
        if let Err(err) = self.content.remove_thumbnail(bucket, &photo.thumb_name()) {
            warn!(photo = photo.id, error = %err, "rollback: partial thumbnail not removed");
        }
        if let Err(err) = self.content.remove_original(bucket, &photo.file_name()) {
            warn!(photo = photo.id, error = %err, "rollback: stored original not removed");
        }
    }
}
