use std::path::Path;

use chrono::{DateTime, Utc};
use core_types::MediaKind;
use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::db::{
    map_constraint_violation, parse_datetime, parse_datetime_opt, query_all, query_one,
    to_rfc3339, to_rfc3339_opt, DbHandle, DbResult,
};
use crate::filters::{Filters, PageInfo};
use crate::StoreError;

/// Sort keys callers may request when listing photos.
pub const PHOTO_SORT_SAFELIST: &[&str] = &[
    "id",
    "-id",
    "taken_at",
    "-taken_at",
    "latitude",
    "-latitude",
    "longitude",
    "-longitude",
];

/// Caller-supplied fields for a new photo row. `created_at` and the id
/// are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewPhoto {
    pub taken_at: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub event: Option<i64>,
    pub extension: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Photo {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub taken_at: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub event: Option<i64>,
    pub extension: String,
    /// File names of the neighboring photos in the same event, in
    /// capture order. Populated only by [`Photo::get_with_neighbors`].
    pub previous_file: Option<String>,
    pub next_file: Option<String>,
}

impl Photo {
    /// Insert a new photo row. The extension is re-validated against
    /// the media allow-lists; the coordinate CHECK rejects partial or
    /// out-of-range pairs.
    pub fn insert<H: DbHandle>(db: &H, new: NewPhoto) -> DbResult<Self> {
        if MediaKind::from_extension(&new.extension).is_none() {
            return Err(StoreError::UnsupportedExtension(new.extension));
        }

        let created_at = Utc::now();
        db.execute(
            "INSERT INTO photos (created_at, taken_at, latitude, longitude, event, extension)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                to_rfc3339(created_at),
                to_rfc3339_opt(new.taken_at),
                new.latitude,
                new.longitude,
                new.event,
                new.extension
            ],
        )
        .map_err(map_constraint_violation)?;

        Ok(Self {
            id: db.last_insert_rowid(),
            created_at,
            taken_at: new.taken_at,
            latitude: new.latitude,
            longitude: new.longitude,
            event: new.event,
            extension: new.extension,
            previous_file: None,
            next_file: None,
        })
    }

    pub fn delete<H: DbHandle>(db: &H, id: i64) -> DbResult<()> {
        let affected = db.execute("DELETE FROM photos WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(StoreError::RecordNotFound);
        }
        Ok(())
    }

    pub fn get_by_id<H: DbHandle>(db: &H, id: i64) -> DbResult<Self> {
        query_one(
            db,
            "SELECT id, created_at, taken_at, latitude, longitude, event, extension
             FROM photos WHERE id = ?1",
            params![id],
            Photo::from_row,
        )
    }

    /// Look up a photo by its derived file name (`<id>.<ext>`), also
    /// accepting the video-thumbnail form (`<id>.<ext>.jpg`). Neighbors
    /// are populated.
    pub fn get_by_file<H: DbHandle>(db: &H, file: &str) -> DbResult<Self> {
        let id = parse_file_name(file).ok_or(StoreError::RecordNotFound)?;
        Self::get_with_neighbors(db, id)
    }

    /// Load a photo together with the file names of its neighbors in
    /// capture order, within the rows sharing its event. The event
    /// match is NULL-safe, so unassigned photos neighbor each other.
    pub fn get_with_neighbors<H: DbHandle>(db: &H, id: i64) -> DbResult<Self> {
        query_one(
            db,
            "SELECT id, created_at, taken_at, latitude, longitude, event, extension,
                    prev_file, next_file
             FROM (
                 SELECT id, created_at, taken_at, latitude, longitude, event, extension,
                        lag(CAST(id AS TEXT) || '.' || extension) OVER w AS prev_file,
                        lead(CAST(id AS TEXT) || '.' || extension) OVER w AS next_file
                 FROM photos
                 WHERE event IS (SELECT event FROM photos WHERE id = ?1)
                 WINDOW w AS (ORDER BY taken_at IS NULL, taken_at ASC, id ASC)
             )
             WHERE id = ?1",
            params![id],
            |row| {
                let mut photo = Photo::from_row(row)?;
                photo.previous_file = row.get(7)?;
                photo.next_file = row.get(8)?;
                Ok(photo)
            },
        )
    }

    /// List photos, optionally restricted to one event, sorted by an
    /// allow-listed key. The capture-time and id tiebreaks keep the
    /// ordering total, so rows cannot migrate between pages when the
    /// requested key ties.
    pub fn get_filtered<H: DbHandle>(
        db: &H,
        event: Option<i64>,
        filters: &Filters,
    ) -> DbResult<(Vec<Self>, PageInfo)> {
        let column = filters.sort_column();
        let direction = filters.sort_direction();
        // Nullable sort keys carry an explicit null marker ahead of the
        // key itself; nulls sort as the largest value, so undated rows
        // trail an ascending capture-time listing exactly as they do in
        // the neighbor and summary queries.
        let order_by = if column == "id" {
            format!("{column} {direction}")
        } else {
            format!("{column} IS NULL {direction}, {column} {direction}")
        };
        let sql = format!(
            "SELECT COUNT(*) OVER () AS total,
                    id, created_at, taken_at, latitude, longitude, event, extension
             FROM photos
             WHERE (?1 IS NULL OR event = ?1)
             ORDER BY {order_by}, taken_at IS NULL, taken_at ASC, id ASC
             LIMIT ?2 OFFSET ?3"
        );

        let mut total = 0_i64;
        let photos = query_all(
            db,
            &sql,
            params![event, filters.limit(), filters.offset()],
            |row| {
                total = row.get(0)?;
                Photo::from_row_at(row, 1)
            },
        )?;

        let info = PageInfo::calculate(total, filters.page(), filters.page_size());
        Ok((photos, info))
    }

    /// First `per_event` photos of every event in capture order, with
    /// events sequenced by their day. Photos without an event are not
    /// part of the summary.
    pub fn summary<H: DbHandle>(db: &H, per_event: i64) -> DbResult<Vec<Self>> {
        query_all(
            db,
            "SELECT id, created_at, taken_at, latitude, longitude, event, extension
             FROM (
                 SELECT p.id, p.created_at, p.taken_at, p.latitude, p.longitude,
                        p.event, p.extension, e.day AS day,
                        row_number() OVER (
                            PARTITION BY p.event
                            ORDER BY p.taken_at IS NULL, p.taken_at ASC, p.id ASC
                        ) AS rank
                 FROM photos p
                 INNER JOIN events e ON p.event = e.id
             )
             WHERE rank <= ?1
             ORDER BY day IS NULL, day ASC, taken_at IS NULL, taken_at ASC, id ASC",
            params![per_event],
            Photo::from_row,
        )
    }

    /// Name of the stored original, derived from id and extension.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.id, self.extension)
    }

    /// Thumbnail file name. Video thumbnails keep the full original
    /// name with a `.jpg` suffix appended, so two videos differing only
    /// in extension cannot collide.
    pub fn thumb_name(&self) -> String {
        match MediaKind::from_extension(&self.extension) {
            Some(MediaKind::Video) => format!("{}.jpg", self.file_name()),
            _ => self.file_name(),
        }
    }

    fn from_row(row: &rusqlite::Row<'_>) -> DbResult<Self> {
        Self::from_row_at(row, 0)
    }

    fn from_row_at(row: &rusqlite::Row<'_>, base: usize) -> DbResult<Self> {
        Ok(Self {
            id: row.get(base)?,
            created_at: parse_datetime(row.get::<_, String>(base + 1)?)?,
            taken_at: parse_datetime_opt(row.get::<_, Option<String>>(base + 2)?)?,
            latitude: row.get(base + 3)?,
            longitude: row.get(base + 4)?,
            event: row.get(base + 5)?,
            extension: row.get(base + 6)?,
            previous_file: None,
            next_file: None,
        })
    }
}

/// Parse a derived file name back to its photo id. Accepts
/// `<id>.<ext>` and the video-thumbnail form `<id>.<ext>.jpg`.
pub fn parse_file_name(file: &str) -> Option<i64> {
    let base = match file.strip_suffix(".jpg") {
        Some(stripped)
            if matches!(
                Path::new(stripped)
                    .extension()
                    .and_then(|e| e.to_str())
                    .and_then(MediaKind::from_extension),
                Some(MediaKind::Video)
            ) =>
        {
            stripped
        }
        _ => file,
    };
    let (stem, ext) = base.split_once('.')?;
    MediaKind::from_extension(ext)?;
    stem.parse().ok()
}
