//! SQLite schema DDL and initialization for the gallery database.

use rusqlite::{Connection, Error as SqliteError, ErrorCode};

/// SQLite schema version supported by this build.
pub const TARGET_SCHEMA_VERSION: i64 = 1;

/// Packed SQL definition for the complete gallery schema.
pub const GALLERY_SCHEMA_SQL: &str = include_str!("../schema/gallery_schema.sql");

/// Applies the gallery schema (or upgrades an existing database) on the
/// provided connection.
///
/// Enforces WAL journaling + foreign keys, runs any pending migrations,
/// and keeps `PRAGMA user_version` aligned with the Rust-side
/// [`TARGET_SCHEMA_VERSION`].
pub fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", true)?;

    let user_version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if user_version > TARGET_SCHEMA_VERSION {
        return Err(newer_schema_error(user_version));
    }

    if user_version < TARGET_SCHEMA_VERSION {
        apply_migrations(conn, user_version)?;
    }

    conn.pragma_update(None, "user_version", &TARGET_SCHEMA_VERSION)?;
    Ok(())
}

fn apply_migrations(conn: &Connection, from_version: i64) -> rusqlite::Result<()> {
    match from_version {
        0 => {
            conn.execute_batch(GALLERY_SCHEMA_SQL)?;
        }
        _ => {
            return Err(newer_schema_error(from_version));
        }
    }
    Ok(())
}

fn newer_schema_error(version: i64) -> SqliteError {
    SqliteError::SqliteFailure(
        rusqlite::ffi::Error {
            code: ErrorCode::DatabaseCorrupt,
            extended_code: 0,
        },
        Some(format!(
            "gallery schema version {version} is newer than supported {TARGET_SCHEMA_VERSION}"
        )),
    )
}
