//! Store bindings for the gallery SQLite schema.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, Row};

pub mod db;
pub mod events;
pub mod photos;

pub use db::GalleryDb;
pub use events::Event;
pub use photos::{NewPhoto, Photo};

use crate::StoreError;

pub type DbResult<T> = Result<T, StoreError>;

/// Common trait allowing modules to operate over a raw `Connection` or a `GalleryDb`.
pub trait DbHandle {
    fn execute(&self, sql: &str, params: impl rusqlite::Params) -> rusqlite::Result<usize>;
    fn prepare<'a>(&'a self, sql: &str) -> rusqlite::Result<rusqlite::Statement<'a>>;
    fn last_insert_rowid(&self) -> i64;
}

impl DbHandle for Connection {
    fn execute(&self, sql: &str, params: impl rusqlite::Params) -> rusqlite::Result<usize> {
        Connection::execute(self, sql, params)
    }

    fn prepare<'a>(&'a self, sql: &str) -> rusqlite::Result<rusqlite::Statement<'a>> {
        Connection::prepare(self, sql)
    }

    fn last_insert_rowid(&self) -> i64 {
        Connection::last_insert_rowid(self)
    }
}

/// Map a single row result to a typed value; no rows is `RecordNotFound`.
pub fn query_one<T, H, P, F>(db: &H, sql: &str, params: P, map: F) -> DbResult<T>
where
    H: DbHandle + ?Sized,
    P: rusqlite::Params,
    F: FnOnce(&Row) -> DbResult<T>,
{
    let mut stmt = db.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let row = rows.next()?.ok_or(StoreError::RecordNotFound)?;
    map(row)
}

/// Collect all rows from a query into a vector.
pub fn query_all<T, H, P, F>(db: &H, sql: &str, params: P, mut map: F) -> DbResult<Vec<T>>
where
    H: DbHandle + ?Sized,
    P: rusqlite::Params,
    F: FnMut(&Row) -> DbResult<T>,
{
    let mut stmt = db.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(map(row)?);
    }
    Ok(out)
}

pub fn to_rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn to_rfc3339_opt(ts: Option<DateTime<Utc>>) -> Option<String> {
    ts.map(to_rfc3339)
}

pub fn parse_datetime(raw: String) -> DbResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(&raw).map(|dt| dt.with_timezone(&Utc))?)
}

pub fn parse_datetime_opt(raw: Option<String>) -> DbResult<Option<DateTime<Utc>>> {
    raw.map(parse_datetime).transpose()
}

/// Translate SQLite constraint failures into the store's error taxonomy.
///
/// Matching is done on extended result codes, with the CHECK case
/// narrowed by constraint name since a table can carry several CHECKs.
pub(crate) fn map_constraint_violation(err: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(failure, message) = &err {
        match failure.extended_code {
            rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
            | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                return StoreError::DuplicateName;
            }
            rusqlite::ffi::SQLITE_CONSTRAINT_CHECK => {
                if message
                    .as_deref()
                    .is_some_and(|m| m.contains("valid_coords"))
                {
                    return StoreError::InvalidCoordinates;
                }
            }
            _ => {}
        }
    }
    StoreError::Sqlite(err)
}
