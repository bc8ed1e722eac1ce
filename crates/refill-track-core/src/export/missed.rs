//! Missed-refill report: records missed as of the evaluation date.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{date_cell, escape_csv};
use crate::db::{Database, DbResult};
use crate::schedule;

/// Fixed header for the missed-refill report.
pub const MISSED_REFILL_HEADER: &str = "Unique ID,Facility,Sex,Current Regimen,Case Manager,\
     Last Pickup Date,Next Appointment,Days Missed,IIT Status,VL Status";

/// One row of the missed-refill report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissedRefillRow {
    pub unique_id: String,
    pub facility: String,
    pub sex: String,
    pub current_regimen: String,
    pub case_manager: String,
    pub last_pickup_date: Option<NaiveDate>,
    pub next_appointment: Option<NaiveDate>,
    pub days_missed: i64,
    pub iit_status: String,
    pub vl_status: String,
}

/// The missed-refill report for one evaluation date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissedRefillReport {
    /// Evaluation date missed-ness was recomputed against
    pub as_of: NaiveDate,
    pub rows: Vec<MissedRefillRow>,
}

impl MissedRefillReport {
    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();
        csv.push_str(MISSED_REFILL_HEADER);
        csv.push('\n');

        for row in &self.rows {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{},{},{}\n",
                escape_csv(&row.unique_id),
                escape_csv(&row.facility),
                escape_csv(&row.sex),
                escape_csv(&row.current_regimen),
                escape_csv(&row.case_manager),
                date_cell(row.last_pickup_date),
                date_cell(row.next_appointment),
                row.days_missed,
                escape_csv(&row.iit_status),
                escape_csv(&row.vl_status),
            ));
        }

        csv
    }
}

/// Builds missed-refill reports from the record store.
pub struct MissedRefillExporter<'a> {
    db: &'a Database,
}

impl<'a> MissedRefillExporter<'a> {
    /// Create a new exporter.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Export every record missed as of the given date, optionally narrowed
    /// to one facility. Missed-ness is recomputed here, never read from the
    /// stored snapshot flag.
    pub fn export(
        &self,
        facility_id: Option<&str>,
        as_of: NaiveDate,
    ) -> DbResult<MissedRefillReport> {
        let facility_names: HashMap<String, String> = self
            .db
            .list_facilities()?
            .into_iter()
            .map(|f| (f.id, f.name))
            .collect();

        let rows = self
            .db
            .list_refills(facility_id)?
            .into_iter()
            .filter(|record| schedule::is_missed(record, as_of))
            .map(|record| {
                let vl_status = match schedule::is_suppressed(&record) {
                    Some(true) => "Suppressed",
                    Some(false) => "Unsuppressed",
                    None => "Unknown",
                };
                MissedRefillRow {
                    unique_id: record.unique_id.clone(),
                    facility: facility_names
                        .get(&record.facility_id)
                        .cloned()
                        .unwrap_or_default(),
                    sex: record.sex.as_str().to_string(),
                    current_regimen: record.current_regimen.clone(),
                    case_manager: record.case_manager.clone(),
                    last_pickup_date: record.last_pickup_date,
                    next_appointment: record.next_appointment,
                    days_missed: schedule::days_missed(&record, as_of),
                    iit_status: schedule::iit_status(&record, as_of).to_string(),
                    vl_status: vl_status.to_string(),
                }
            })
            .collect();

        Ok(MissedRefillReport { as_of, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Facility, RefillRecord, Sex};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup_db() -> (Database, Facility) {
        let db = Database::open_in_memory().unwrap();
        let facility = Facility::new("General Hospital".into(), "GH-01".into());
        db.insert_facility(&facility).unwrap();
        (db, facility)
    }

    #[test]
    fn test_header_column_order_pinned() {
        assert_eq!(
            MISSED_REFILL_HEADER,
            "Unique ID,Facility,Sex,Current Regimen,Case Manager,Last Pickup Date,\
             Next Appointment,Days Missed,IIT Status,VL Status"
        );
    }

    #[test]
    fn test_only_missed_records_exported() {
        let (db, facility) = setup_db();

        // On time as of Feb 10 (next appointment Apr 1).
        let mut on_time =
            RefillRecord::new(facility.id.clone(), "PAT-001".into(), Sex::Male, 3.0);
        on_time.last_pickup_date = Some(date(2025, 1, 1));
        db.insert_refill(&mut on_time, date(2025, 1, 2)).unwrap();

        // Missed (next appointment Jan 31), suppressed.
        let mut missed =
            RefillRecord::new(facility.id.clone(), "PAT-002".into(), Sex::Female, 1.0);
        missed.last_pickup_date = Some(date(2025, 1, 1));
        missed.vl_result = Some(40);
        db.insert_refill(&mut missed, date(2025, 1, 2)).unwrap();

        let report = MissedRefillExporter::new(&db)
            .export(None, date(2025, 2, 10))
            .unwrap();
        assert_eq!(report.rows.len(), 1);

        let row = &report.rows[0];
        assert_eq!(row.unique_id, "PAT-002");
        assert_eq!(row.days_missed, 10);
        assert_eq!(row.iit_status, "18 days to IIT");
        assert_eq!(row.vl_status, "Suppressed");
    }

    #[test]
    fn test_iit_and_vl_status_cells() {
        let (db, facility) = setup_db();

        // Next appointment 2024-11-15; far past the grace period.
        let mut record =
            RefillRecord::new(facility.id.clone(), "PAT-001".into(), Sex::Male, 0.5);
        record.last_pickup_date = Some(date(2024, 10, 31));
        record.vl_result = Some(5000);
        db.insert_refill(&mut record, date(2024, 11, 1)).unwrap();

        let report = MissedRefillExporter::new(&db)
            .export(None, date(2025, 2, 10))
            .unwrap();
        let row = &report.rows[0];
        assert_eq!(row.iit_status, "IIT");
        assert_eq!(row.vl_status, "Unsuppressed");

        let csv = report.to_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], MISSED_REFILL_HEADER);
        assert!(lines[1].ends_with("IIT,Unsuppressed"));
    }

    #[test]
    fn test_stale_snapshot_flag_not_trusted() {
        let (db, facility) = setup_db();

        // Saved while on time, so the stored flag is false; the export still
        // reports it missed later.
        let mut record =
            RefillRecord::new(facility.id.clone(), "PAT-001".into(), Sex::Female, 1.0);
        record.last_pickup_date = Some(date(2025, 1, 1));
        db.insert_refill(&mut record, date(2025, 1, 2)).unwrap();
        assert!(!record.missed_appointment);

        let report = MissedRefillExporter::new(&db)
            .export(None, date(2025, 6, 1))
            .unwrap();
        assert_eq!(report.rows.len(), 1);
    }
}
