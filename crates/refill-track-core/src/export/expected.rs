//! Expected-refill report over the active cohort.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{date_cell, escape_csv};
use crate::db::{Database, DbResult};
use crate::schedule;

/// Fixed header for the expected-refill report.
pub const EXPECTED_REFILL_HEADER: &str = "Unique ID,Facility,Sex,Current Regimen,Case Manager,\
     Last Pickup Date,Next Appointment,Days Missed,VL Eligibility";

/// One row of the expected-refill report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectedRefillRow {
    pub unique_id: String,
    pub facility: String,
    pub sex: String,
    pub current_regimen: String,
    pub case_manager: String,
    pub last_pickup_date: Option<NaiveDate>,
    pub next_appointment: Option<NaiveDate>,
    pub days_missed: i64,
    pub vl_eligibility: String,
}

/// The expected-refill report for one evaluation date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectedRefillReport {
    /// Evaluation date the derived columns were computed against
    pub as_of: NaiveDate,
    pub rows: Vec<ExpectedRefillRow>,
}

impl ExpectedRefillReport {
    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();
        csv.push_str(EXPECTED_REFILL_HEADER);
        csv.push('\n');

        for row in &self.rows {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{},{}\n",
                escape_csv(&row.unique_id),
                escape_csv(&row.facility),
                escape_csv(&row.sex),
                escape_csv(&row.current_regimen),
                escape_csv(&row.case_manager),
                date_cell(row.last_pickup_date),
                date_cell(row.next_appointment),
                row.days_missed,
                escape_csv(&row.vl_eligibility),
            ));
        }

        csv
    }
}

/// Builds expected-refill reports from the record store.
pub struct ExpectedRefillExporter<'a> {
    db: &'a Database,
}

impl<'a> ExpectedRefillExporter<'a> {
    /// Create a new exporter.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Export the active cohort, optionally narrowed to one facility, with
    /// derived columns recomputed as of the given date.
    pub fn export(
        &self,
        facility_id: Option<&str>,
        as_of: NaiveDate,
    ) -> DbResult<ExpectedRefillReport> {
        let facility_names: HashMap<String, String> = self
            .db
            .list_facilities()?
            .into_iter()
            .map(|f| (f.id, f.name))
            .collect();

        let rows = self
            .db
            .list_active_refills(facility_id)?
            .into_iter()
            .map(|record| {
                let eligibility = if schedule::is_vl_eligible(&record, as_of) {
                    "Eligible"
                } else {
                    "Not Eligible"
                };
                ExpectedRefillRow {
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
                    vl_eligibility: eligibility.to_string(),
                }
            })
            .collect();

        Ok(ExpectedRefillReport { as_of, rows })
    }
}
