//! Facility database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::Facility;

fn map_facility(row: &Row<'_>) -> rusqlite::Result<Facility> {
    Ok(Facility {
        id: row.get(0)?,
        name: row.get(1)?,
        code: row.get(2)?,
        location: row.get(3)?,
        created_at: row.get(4)?,
    })
}

const FACILITY_COLUMNS: &str = "id, name, code, location, created_at";

impl Database {
    /// Insert a new facility. Name and code must be non-empty.
    pub fn insert_facility(&self, facility: &Facility) -> DbResult<()> {
        if facility.name.trim().is_empty() {
            return Err(DbError::Constraint("facility name must not be empty".into()));
        }
        if facility.code.trim().is_empty() {
            return Err(DbError::Constraint("facility code must not be empty".into()));
        }

        self.conn.execute(
            "INSERT INTO facilities (id, name, code, location, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                facility.id,
                facility.name,
                facility.code,
                facility.location,
                facility.created_at,
            ],
        )?;
        Ok(())
    }

    /// Get a facility by ID.
    pub fn get_facility(&self, id: &str) -> DbResult<Option<Facility>> {
        self.conn
            .query_row(
                &format!("SELECT {FACILITY_COLUMNS} FROM facilities WHERE id = ?"),
                [id],
                map_facility,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get a facility by name, case-insensitively.
    pub fn get_facility_by_name(&self, name: &str) -> DbResult<Option<Facility>> {
        self.conn
            .query_row(
                &format!("SELECT {FACILITY_COLUMNS} FROM facilities WHERE name = ? COLLATE NOCASE"),
                [name.trim()],
                map_facility,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List all facilities, ordered by name.
    pub fn list_facilities(&self) -> DbResult<Vec<Facility>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {FACILITY_COLUMNS} FROM facilities ORDER BY name"))?;
        let rows = stmt.query_map([], map_facility)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Delete a facility; its refill records are removed by the cascade.
    pub fn delete_facility(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM facilities WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}
