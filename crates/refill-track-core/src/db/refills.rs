//! Refill record database operations.
//!
//! Every save path runs [`RefillRecord::recompute`] first, so the stored
//! derived fields always reflect the current inputs.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{ArtStatus, RefillRecord, Sex};

const REFILL_COLUMNS: &str = "id, facility_id, unique_id, sex, last_pickup_date, refill_months, \
     current_regimen, case_manager, remark, art_status, next_appointment, \
     expected_iit_date, missed_appointment, art_start_date, vl_sample_date, \
     vl_result, created_at";

fn map_refill(row: &Row<'_>) -> rusqlite::Result<RefillRecord> {
    let sex_text: String = row.get(3)?;
    let sex = Sex::parse(&sex_text).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("invalid sex: {sex_text}").into(),
        )
    })?;

    let status_text: String = row.get(9)?;
    let art_status = ArtStatus::parse(&status_text).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            9,
            rusqlite::types::Type::Text,
            format!("invalid ART status: {status_text}").into(),
        )
    })?;

    Ok(RefillRecord {
        id: row.get(0)?,
        facility_id: row.get(1)?,
        unique_id: row.get(2)?,
        sex,
        last_pickup_date: row.get(4)?,
        refill_months: row.get(5)?,
        current_regimen: row.get(6)?,
        case_manager: row.get(7)?,
        remark: row.get(8)?,
        art_status,
        next_appointment: row.get(10)?,
        expected_iit_date: row.get(11)?,
        missed_appointment: row.get(12)?,
        art_start_date: row.get(13)?,
        vl_sample_date: row.get(14)?,
        vl_result: row.get(15)?,
        created_at: row.get(16)?,
    })
}

fn insert_refill_row(conn: &Connection, record: &RefillRecord) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO refills (
            id, facility_id, unique_id, sex, last_pickup_date, refill_months,
            current_regimen, case_manager, remark, art_status, next_appointment,
            expected_iit_date, missed_appointment, art_start_date, vl_sample_date,
            vl_result, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        params![
            record.id,
            record.facility_id,
            record.unique_id,
            record.sex.as_str(),
            record.last_pickup_date,
            record.refill_months,
            record.current_regimen,
            record.case_manager,
            record.remark,
            record.art_status.as_str(),
            record.next_appointment,
            record.expected_iit_date,
            record.missed_appointment,
            record.art_start_date,
            record.vl_sample_date,
            record.vl_result,
            record.created_at,
        ],
    )?;
    Ok(())
}

impl Database {
    /// Insert a new refill record, recomputing derived fields first.
    pub fn insert_refill(&self, record: &mut RefillRecord, as_of: NaiveDate) -> DbResult<()> {
        record.recompute(as_of);
        insert_refill_row(&self.conn, record)?;
        Ok(())
    }

    /// Update an existing refill record by ID, recomputing derived fields
    /// first. Returns false when no such record exists.
    pub fn update_refill(&self, record: &mut RefillRecord, as_of: NaiveDate) -> DbResult<bool> {
        record.recompute(as_of);
        let rows_affected = self.conn.execute(
            "UPDATE refills SET
                facility_id = ?2,
                unique_id = ?3,
                sex = ?4,
                last_pickup_date = ?5,
                refill_months = ?6,
                current_regimen = ?7,
                case_manager = ?8,
                remark = ?9,
                art_status = ?10,
                next_appointment = ?11,
                expected_iit_date = ?12,
                missed_appointment = ?13,
                art_start_date = ?14,
                vl_sample_date = ?15,
                vl_result = ?16
            WHERE id = ?1",
            params![
                record.id,
                record.facility_id,
                record.unique_id,
                record.sex.as_str(),
                record.last_pickup_date,
                record.refill_months,
                record.current_regimen,
                record.case_manager,
                record.remark,
                record.art_status.as_str(),
                record.next_appointment,
                record.expected_iit_date,
                record.missed_appointment,
                record.art_start_date,
                record.vl_sample_date,
                record.vl_result,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a refill record by ID.
    pub fn get_refill(&self, id: &str) -> DbResult<Option<RefillRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {REFILL_COLUMNS} FROM refills WHERE id = ?"),
                [id],
                map_refill,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get a refill record by its identity key.
    pub fn get_refill_by_key(
        &self,
        facility_id: &str,
        unique_id: &str,
    ) -> DbResult<Option<RefillRecord>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {REFILL_COLUMNS} FROM refills
                     WHERE facility_id = ?1 AND unique_id = ?2"
                ),
                [facility_id, unique_id],
                map_refill,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List all refill records, optionally for one facility, newest pickup
    /// first.
    pub fn list_refills(&self, facility_id: Option<&str>) -> DbResult<Vec<RefillRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REFILL_COLUMNS} FROM refills
             WHERE (?1 IS NULL OR facility_id = ?1)
             ORDER BY last_pickup_date DESC, unique_id"
        ))?;
        let rows = stmt.query_map(params![facility_id], map_refill)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// List records with ART status Active or Active Restart, optionally for
    /// one facility.
    pub fn list_active_refills(&self, facility_id: Option<&str>) -> DbResult<Vec<RefillRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REFILL_COLUMNS} FROM refills
             WHERE art_status IN ('Active', 'Active Restart')
               AND (?1 IS NULL OR facility_id = ?1)
             ORDER BY unique_id"
        ))?;
        let rows = stmt.query_map(params![facility_id], map_refill)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// List active-cohort records whose next appointment falls inside the
    /// inclusive date window, optionally for one facility.
    pub fn list_refills_expected_between(
        &self,
        facility_id: Option<&str>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DbResult<Vec<RefillRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REFILL_COLUMNS} FROM refills
             WHERE art_status IN ('Active', 'Active Restart')
               AND next_appointment IS NOT NULL
               AND next_appointment BETWEEN ?2 AND ?3
               AND (?1 IS NULL OR facility_id = ?1)
             ORDER BY next_appointment, unique_id"
        ))?;
        let rows = stmt.query_map(params![facility_id, start, end], map_refill)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// List active-cohort records whose last pickup falls inside the
    /// inclusive date window, optionally for one facility.
    pub fn list_refills_picked_up_between(
        &self,
        facility_id: Option<&str>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DbResult<Vec<RefillRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REFILL_COLUMNS} FROM refills
             WHERE art_status IN ('Active', 'Active Restart')
               AND last_pickup_date IS NOT NULL
               AND last_pickup_date BETWEEN ?2 AND ?3
               AND (?1 IS NULL OR facility_id = ?1)
             ORDER BY last_pickup_date, unique_id"
        ))?;
        let rows = stmt.query_map(params![facility_id, start, end], map_refill)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// List the VL reporting cohort: on-treatment records with a known ART
    /// start date, optionally for one facility.
    pub fn list_vl_cohort(&self, facility_id: Option<&str>) -> DbResult<Vec<RefillRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REFILL_COLUMNS} FROM refills
             WHERE art_status IN ('Active', 'Active Restart')
               AND art_start_date IS NOT NULL
               AND (?1 IS NULL OR facility_id = ?1)
             ORDER BY unique_id"
        ))?;
        let rows = stmt.query_map(params![facility_id], map_refill)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Delete all refill records for a facility. Returns the number removed.
    pub fn delete_refills_for_facility(&self, facility_id: &str) -> DbResult<usize> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM refills WHERE facility_id = ?", [facility_id])?;
        Ok(rows_affected)
    }

    /// Replace every touched facility's refill records with the given batch,
    /// as one atomic unit.
    ///
    /// Deletes all existing records for each facility present in the batch,
    /// then inserts the batch rows (derived fields recomputed as of `as_of`).
    /// Any failure rolls the whole operation back.
    pub fn replace_facility_refills(
        &mut self,
        records: &mut [RefillRecord],
        as_of: NaiveDate,
    ) -> DbResult<usize> {
        let mut facility_ids: Vec<String> = Vec::new();
        for record in records.iter() {
            if !facility_ids.contains(&record.facility_id) {
                facility_ids.push(record.facility_id.clone());
            }
        }
        if facility_ids.is_empty() {
            return Err(DbError::Constraint("empty replacement batch".into()));
        }

        let tx = self.transaction()?;
        for facility_id in &facility_ids {
            tx.execute("DELETE FROM refills WHERE facility_id = ?", [facility_id])?;
        }
        for record in records.iter_mut() {
            record.recompute(as_of);
            insert_refill_row(&tx, record)?;
        }
        tx.commit()?;

        Ok(records.len())
    }
}
