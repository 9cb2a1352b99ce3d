//! Filesystem layout for stored originals and thumbnails.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::IngestError;

const PHOTOS_DIR: &str = "photos";
const THUMBNAILS_DIR: &str = "thumbnails";
const STAGING_DIR: &str = "tmp";

/// Bucket a photo's files live under: its event, or the shared
/// unassigned area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventBucket {
    Event(i64),
    Unassigned,
}

impl EventBucket {
    pub fn from_event(event: Option<i64>) -> Self {
        match event {
            Some(id) => Self::Event(id),
            None => Self::Unassigned,
        }
    }

    fn segment(self) -> String {
        match self {
            Self::Event(id) => id.to_string(),
            Self::Unassigned => "unassigned".to_string(),
        }
    }
}

/// Lexically check that `path` cannot escape `root`.
///
/// Purely textual so it works for paths that do not exist yet: `.`
/// components are dropped and `..` components resolve against the
/// already-accepted prefix. Anything that climbs above the root fails
/// the prefix check.
pub fn path_stays_within(path: &Path, root: &Path) -> bool {
    normalize_lexically(path).starts_with(normalize_lexically(root))
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Storage area holding originals under `photos/<bucket>` and
/// thumbnails under `thumbnails/<bucket>`, keyed by id-derived file
/// names. Every computed path is guarded against traversal before use.
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn photos_root(&self) -> PathBuf {
        self.root.join(PHOTOS_DIR)
    }

    pub fn thumbnails_root(&self) -> PathBuf {
        self.root.join(THUMBNAILS_DIR)
    }

    pub fn photos_dir(&self, bucket: EventBucket) -> PathBuf {
        self.photos_root().join(bucket.segment())
    }

    pub fn thumbnails_dir(&self, bucket: EventBucket) -> PathBuf {
        self.thumbnails_root().join(bucket.segment())
    }

    pub fn original_path(&self, bucket: EventBucket, file_name: &str) -> PathBuf {
        self.photos_dir(bucket).join(file_name)
    }

    pub fn thumbnail_path(&self, bucket: EventBucket, thumb_name: &str) -> PathBuf {
        self.thumbnails_dir(bucket).join(thumb_name)
    }

    /// Create both bucket directories if absent. Creation is
    /// idempotent; already-existing directories are not an error.
    pub fn ensure_dirs(&self, bucket: EventBucket) -> Result<(), IngestError> {
        let photos = self.photos_dir(bucket);
        self.guard(&photos, &self.photos_root())?;
        fs::create_dir_all(&photos)?;

        let thumbs = self.thumbnails_dir(bucket);
        self.guard(&thumbs, &self.thumbnails_root())?;
        fs::create_dir_all(&thumbs)?;
        Ok(())
    }

    /// Copy a source file into the bucket's original slot.
    pub fn store_original(
        &self,
        bucket: EventBucket,
        file_name: &str,
        source: &Path,
    ) -> Result<PathBuf, IngestError> {
        let dest = self.original_path(bucket, file_name);
        self.guard(&dest, &self.photos_root())?;
        fs::copy(source, &dest)?;
        Ok(dest)
    }

    pub fn remove_original(&self, bucket: EventBucket, file_name: &str) -> Result<(), IngestError> {
        let path = self.original_path(bucket, file_name);
        self.guard(&path, &self.photos_root())?;
        remove_if_exists(&path)
    }

    pub fn remove_thumbnail(
        &self,
        bucket: EventBucket,
        thumb_name: &str,
    ) -> Result<(), IngestError> {
        let path = self.thumbnail_path(bucket, thumb_name);
        self.guard(&path, &self.thumbnails_root())?;
        remove_if_exists(&path)
    }

    /// Remove both bucket directories and everything inside them.
    pub fn remove_bucket(&self, bucket: EventBucket) -> Result<(), IngestError> {
        for (dir, root) in [
            (self.photos_dir(bucket), self.photos_root()),
            (self.thumbnails_dir(bucket), self.thumbnails_root()),
        ] {
            self.guard(&dir, &root)?;
            if dir.exists() {
                fs::remove_dir_all(&dir)?;
            }
        }
        Ok(())
    }

    /// Write untrusted upload bytes to a staging file under the
    /// storage root, so ingestion only ever reads from a real path.
    /// Nothing of the upload's own name survives except the extension.
    pub fn stage_upload(&self, extension: &str, bytes: &[u8]) -> Result<PathBuf, IngestError> {
        let staging = self.root.join(STAGING_DIR);
        fs::create_dir_all(&staging)?;

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let path = staging.join(format!("upload-{nanos}.{extension}"));
        self.guard(&path, &staging)?;
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Drop a staged upload. Best effort, the staging area is
    /// disposable.
    pub fn discard_staged(&self, path: &Path) {
        let _ = fs::remove_file(path);
    }

    fn guard(&self, path: &Path, root: &Path) -> Result<(), IngestError> {
        if path_stays_within(path, root) {
            Ok(())
        } else {
            Err(IngestError::PathTraversal(path.to_path_buf()))
        }
    }
}

fn remove_if_exists(path: &Path) -> Result<(), IngestError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn traversal_check_is_lexical() {
        let root = Path::new("/storage/photos");
        assert!(path_stays_within(Path::new("/storage/photos/1/2.jpg"), root));
        assert!(path_stays_within(Path::new("/storage/photos/./1.jpg"), root));
        assert!(!path_stays_within(
            Path::new("/storage/photos/../secrets"),
            root
        ));
        assert!(!path_stays_within(Path::new("/storage/thumbnails"), root));
        assert!(!path_stays_within(
            Path::new("/storage/photos/1/../../../etc/passwd"),
            root
        ));
    }

    #[test]
    fn traversal_check_needs_no_existing_files() {
        let root = Path::new("/nowhere/at/all");
        assert!(path_stays_within(Path::new("/nowhere/at/all/new.jpg"), root));
        assert!(!path_stays_within(Path::new("/nowhere/at/other"), root));
    }

    #[test]
    fn layout_splits_by_bucket() {
        let store = ContentStore::new("/storage");
        assert_eq!(
            store.original_path(EventBucket::Event(7), "12.jpg"),
            PathBuf::from("/storage/photos/7/12.jpg")
        );
        assert_eq!(
            store.thumbnail_path(EventBucket::Unassigned, "12.mp4.jpg"),
            PathBuf::from("/storage/thumbnails/unassigned/12.mp4.jpg")
        );
    }

    #[test]
    fn ensure_dirs_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = ContentStore::new(dir.path());

        store.ensure_dirs(EventBucket::Event(3)).unwrap();
        store.ensure_dirs(EventBucket::Event(3)).unwrap();

        assert!(store.photos_dir(EventBucket::Event(3)).is_dir());
        assert!(store.thumbnails_dir(EventBucket::Event(3)).is_dir());
    }

    #[test]
    fn store_and_remove_original_round_trip() {
        let dir = tempdir().unwrap();
        let store = ContentStore::new(dir.path().join("storage"));
        let source = dir.path().join("source.jpg");
        fs::write(&source, b"bytes").unwrap();

        store.ensure_dirs(EventBucket::Unassigned).unwrap();
        let stored = store
            .store_original(EventBucket::Unassigned, "1.jpg", &source)
            .unwrap();
        assert!(stored.is_file());

        store.remove_original(EventBucket::Unassigned, "1.jpg").unwrap();
        assert!(!stored.exists());

        // Removing again is fine.
        store.remove_original(EventBucket::Unassigned, "1.jpg").unwrap();
    }

    #[test]
    fn traversal_in_file_name_is_fatal() {
        let dir = tempdir().unwrap();
        let store = ContentStore::new(dir.path());
        let source = dir.path().join("source.jpg");
        fs::write(&source, b"bytes").unwrap();

        let err = store
            .store_original(EventBucket::Unassigned, "../../escape.jpg", &source)
            .unwrap_err();
        assert!(matches!(err, IngestError::PathTraversal(_)));
    }

    #[test]
    fn staged_uploads_live_under_the_root_and_keep_the_extension() {
        let dir = tempdir().unwrap();
        let store = ContentStore::new(dir.path());

        let staged = store.stage_upload("png", b"upload bytes").unwrap();
        assert!(staged.starts_with(dir.path().join("tmp")));
        assert_eq!(staged.extension().and_then(|e| e.to_str()), Some("png"));
        assert_eq!(fs::read(&staged).unwrap(), b"upload bytes");

        store.discard_staged(&staged);
        assert!(!staged.exists());
    }

    #[test]
    fn remove_bucket_clears_both_sides() {
        let dir = tempdir().unwrap();
        let store = ContentStore::new(dir.path());
        store.ensure_dirs(EventBucket::Event(5)).unwrap();
        fs::write(store.original_path(EventBucket::Event(5), "1.jpg"), b"x").unwrap();
        fs::write(store.thumbnail_path(EventBucket::Event(5), "1.jpg"), b"x").unwrap();

        store.remove_bucket(EventBucket::Event(5)).unwrap();
        assert!(!store.photos_dir(EventBucket::Event(5)).exists());
        assert!(!store.thumbnails_dir(EventBucket::Event(5)).exists());

        // Absent buckets are fine too.
        store.remove_bucket(EventBucket::Event(5)).unwrap();
    }
}
