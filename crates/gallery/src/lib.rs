pub mod db;
pub mod filters;
pub mod schema;

pub use db::events::{Event, EVENT_SORT_SAFELIST};
pub use db::photos::{NewPhoto, Photo, PHOTO_SORT_SAFELIST};
pub use db::GalleryDb;
pub use filters::{FilterError, Filters, PageInfo};

use thiserror::Error;

/// Closed error taxonomy for the store layer. Callers match on these
/// variants to decide between conflict handling, not-found responses,
/// and validation feedback.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a record with this name already exists")]
    DuplicateName,
    #[error("record not found")]
    RecordNotFound,
    #[error("edit conflict, the record was modified concurrently")]
    EditConflict,
    #[error("latitude/longitude out of range or only one of the pair present")]
    InvalidCoordinates,
    #[error("unsupported media extension: {0}")]
    UnsupportedExtension(String),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("malformed stored timestamp: {0}")]
    Time(#[from] chrono::ParseError),
}
