use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::db::{
    map_constraint_violation, parse_datetime_opt, query_all, query_one, to_rfc3339_opt, DbHandle,
    DbResult,
};
use crate::filters::Filters;
use crate::StoreError;

/// Sort keys callers may request when listing events.
pub const EVENT_SORT_SAFELIST: &[&str] = &["id", "-id", "name", "-name", "day", "-day"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub day: Option<DateTime<Utc>>,
    pub version: i64,
}

impl Event {
    /// Insert a new event. The stored version token starts at 1.
    pub fn insert<H: DbHandle>(db: &H, name: &str, day: Option<DateTime<Utc>>) -> DbResult<Self> {
        db.execute(
            "INSERT INTO events (name, day) VALUES (?1, ?2)",
            params![name, to_rfc3339_opt(day)],
        )
        .map_err(map_constraint_violation)?;
        Ok(Self {
            id: db.last_insert_rowid(),
            name: name.to_string(),
            day,
            version: 1,
        })
    }

    pub fn get_by_id<H: DbHandle>(db: &H, id: i64) -> DbResult<Self> {
        query_one(
            db,
            "SELECT id, name, day, version FROM events WHERE id = ?1",
            params![id],
            Event::from_row,
        )
    }

    pub fn get_by_name<H: DbHandle>(db: &H, name: &str) -> DbResult<Self> {
        query_one(
            db,
            "SELECT id, name, day, version FROM events WHERE name = ?1",
            params![name],
            Event::from_row,
        )
    }

    /// Persist name and day, guarded by the optimistic version token.
    ///
    /// A zero affected-row count means the row was updated or deleted
    /// since this value was read; the caller must re-read before
    /// retrying. On success the in-memory version is bumped to match
    /// the stored one.
    pub fn update<H: DbHandle>(&mut self, db: &H) -> DbResult<()> {
        let affected = db
            .execute(
                "UPDATE events
                 SET name = ?1, day = ?2, version = version + 1
                 WHERE id = ?3 AND version = ?4",
                params![self.name, to_rfc3339_opt(self.day), self.id, self.version],
            )
            .map_err(map_constraint_violation)?;
        if affected == 0 {
            return Err(StoreError::EditConflict);
        }
        self.version += 1;
        Ok(())
    }

    pub fn delete<H: DbHandle>(db: &H, id: i64) -> DbResult<()> {
        let affected = db.execute("DELETE FROM events WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(StoreError::RecordNotFound);
        }
        Ok(())
    }

    /// List events sorted by an allow-listed key with a name tiebreak.
    pub fn list<H: DbHandle>(db: &H, filters: &Filters) -> DbResult<Vec<Self>> {
        let column = filters.sort_column();
        let direction = filters.sort_direction();
        // day is nullable; the marker makes nulls sort as the largest
        // value, the same rule the photo listings follow.
        let order_by = if column == "day" {
            format!("day IS NULL {direction}, day {direction}")
        } else {
            format!("{column} {direction}")
        };
        let sql = format!(
            "SELECT id, name, day, version FROM events
             ORDER BY {order_by}, name ASC
             LIMIT ?1 OFFSET ?2"
        );
        query_all(
            db,
            &sql,
            params![filters.limit(), filters.offset()],
            Event::from_row,
        )
    }

    fn from_row(row: &rusqlite::Row<'_>) -> DbResult<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            day: parse_datetime_opt(row.get::<_, Option<String>>(2)?)?,
            version: row.get(3)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::GalleryDb;

    fn day(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn insert_assigns_id_and_version_one() {
        let db = GalleryDb::in_memory().unwrap();
        let event = Event::insert(&db, "Wedding", Some(day("2024-06-01T00:00:00Z"))).unwrap();

        assert!(event.id > 0);
        assert_eq!(event.version, 1);

        let loaded = Event::get_by_id(&db, event.id).unwrap();
        assert_eq!(loaded.name, "Wedding");
        assert_eq!(loaded.day, Some(day("2024-06-01T00:00:00Z")));
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let db = GalleryDb::in_memory().unwrap();
        Event::insert(&db, "Wedding", None).unwrap();

        let err = Event::insert(&db, "Wedding", None).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName));
    }

    #[test]
    fn update_bumps_version() {
        let db = GalleryDb::in_memory().unwrap();
        let mut event = Event::insert(&db, "Trip", None).unwrap();

        event.name = "Road trip".into();
        event.update(&db).unwrap();
        assert_eq!(event.version, 2);

        let loaded = Event::get_by_id(&db, event.id).unwrap();
        assert_eq!(loaded.name, "Road trip");
        assert_eq!(loaded.version, 2);
    }

    #[test]
    fn stale_version_is_an_edit_conflict() {
        let db = GalleryDb::in_memory().unwrap();
        let event = Event::insert(&db, "Trip", None).unwrap();

        let mut first = event.clone();
        let mut second = event;
        first.name = "Trip A".into();
        first.update(&db).unwrap();

        second.name = "Trip B".into();
        let err = second.update(&db).unwrap_err();
        assert!(matches!(err, StoreError::EditConflict));

        // The losing write must not have touched the row.
        let loaded = Event::get_by_id(&db, first.id).unwrap();
        assert_eq!(loaded.name, "Trip A");
        assert_eq!(loaded.version, 2);
    }

    #[test]
    fn rename_onto_existing_name_is_a_duplicate() {
        let db = GalleryDb::in_memory().unwrap();
        Event::insert(&db, "Wedding", None).unwrap();
        let mut event = Event::insert(&db, "Trip", None).unwrap();

        event.name = "Wedding".into();
        let err = event.update(&db).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName));
    }

    #[test]
    fn delete_missing_event_is_not_found() {
        let db = GalleryDb::in_memory().unwrap();
        let err = Event::delete(&db, 42).unwrap_err();
        assert!(matches!(err, StoreError::RecordNotFound));
    }

    #[test]
    fn get_by_name_missing_is_not_found() {
        let db = GalleryDb::in_memory().unwrap();
        let err = Event::get_by_name(&db, "nope").unwrap_err();
        assert!(matches!(err, StoreError::RecordNotFound));
    }

    #[test]
    fn undated_events_trail_ascending_day_listings() {
        let db = GalleryDb::in_memory().unwrap();
        Event::insert(&db, "Undated", None).unwrap();
        Event::insert(&db, "Dated", Some(day("2024-06-01T00:00:00Z"))).unwrap();

        let filters = Filters::new(1, 10, "day", EVENT_SORT_SAFELIST).unwrap();
        let page = Event::list(&db, &filters).unwrap();
        let names: Vec<&str> = page.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Dated", "Undated"]);

        let filters = Filters::new(1, 10, "-day", EVENT_SORT_SAFELIST).unwrap();
        let page = Event::list(&db, &filters).unwrap();
        let names: Vec<&str> = page.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Undated", "Dated"]);
    }

    #[test]
    fn list_honors_sort_and_pagination() {
        let db = GalleryDb::in_memory().unwrap();
        for name in ["Cherry", "Apple", "Banana"] {
            Event::insert(&db, name, None).unwrap();
        }

        let filters = Filters::new(1, 2, "name", EVENT_SORT_SAFELIST).unwrap();
        let page = Event::list(&db, &filters).unwrap();
        let names: Vec<&str> = page.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Apple", "Banana"]);

        let filters = Filters::new(2, 2, "name", EVENT_SORT_SAFELIST).unwrap();
        let page = Event::list(&db, &filters).unwrap();
        let names: Vec<&str> = page.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Cherry"]);

        let filters = Filters::new(1, 10, "-name", EVENT_SORT_SAFELIST).unwrap();
        let page = Event::list(&db, &filters).unwrap();
        let names: Vec<&str> = page.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Cherry", "Banana", "Apple"]);
    }
}
