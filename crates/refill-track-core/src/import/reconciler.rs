//! Whole-batch validation and atomic replace.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use tracing::info;

use super::sheet::{
    Sheet, COL_ART_START, COL_ART_STATUS, COL_CASE_MANAGER, COL_FACILITY, COL_LAST_PICKUP,
    COL_REFILL_MONTHS, COL_REGIMEN, COL_SEX, COL_UNIQUE_ID, COL_VL_SAMPLE, REQUIRED_COLUMNS,
};
use super::{ImportError, ImportResult};
use crate::db::Database;
use crate::models::{ArtStatus, RefillRecord, Sex};
use crate::schedule;

/// Upload payloads above this size are rejected before parsing (1 GiB).
pub const DEFAULT_MAX_PAYLOAD_BYTES: u64 = 1 << 30;

const DATE_FORMAT: &str = "%Y-%m-%d";

fn parse_date(cell: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(cell, DATE_FORMAT).ok()
}

/// Validates a tabular batch and replaces the touched facilities' records.
pub struct Reconciler<'a> {
    db: &'a mut Database,
    max_payload_bytes: u64,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler with the default payload limit.
    pub fn new(db: &'a mut Database) -> Self {
        Self {
            db,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }

    /// Override the payload limit.
    pub fn with_max_payload_bytes(mut self, max: u64) -> Self {
        self.max_payload_bytes = max;
        self
    }

    /// Reject oversized uploads. Callers run this against the raw file size
    /// before parsing anything.
    pub fn check_payload_size(&self, payload_bytes: u64) -> ImportResult<()> {
        if payload_bytes > self.max_payload_bytes {
            return Err(ImportError::PayloadTooLarge {
                size: payload_bytes,
                max: self.max_payload_bytes,
            });
        }
        Ok(())
    }

    /// Validate the whole batch, then replace every touched facility's
    /// refill records with it as one atomic unit. Returns the number of
    /// records inserted.
    pub fn reconcile(&mut self, sheet: &Sheet, as_of: NaiveDate) -> ImportResult<usize> {
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|column| !sheet.has_column(column))
            .map(|column| column.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ImportError::MissingColumns(missing));
        }

        // Only on-treatment rows enter the tracked cohort. Sheet row numbers
        // are kept from before the filter so errors point at the right row.
        let eligible: Vec<_> = sheet
            .rows()
            .enumerate()
            .filter(|(_, row)| {
                row.get(COL_ART_STATUS)
                    .and_then(ArtStatus::parse)
                    .is_some_and(|status| status.is_on_treatment())
            })
            .collect();
        if eligible.is_empty() {
            return Err(ImportError::NoEligibleRows);
        }

        // Resolve facility names case-insensitively; any unknown name fails
        // the batch, listing every unmatched name once.
        let facilities: HashMap<String, String> = self
            .db
            .list_facilities()?
            .into_iter()
            .map(|f| (f.canonical_name(), f.id))
            .collect();

        let mut unknown: Vec<String> = Vec::new();
        for (sheet_index, row) in &eligible {
            let Some(name) = row.get(COL_FACILITY) else {
                return Err(ImportError::MissingFacilityName {
                    row: sheet_index + 1,
                    unique_id: row.get(COL_UNIQUE_ID).unwrap_or("").to_string(),
                });
            };
            if !facilities.contains_key(&name.trim().to_lowercase())
                && !unknown.iter().any(|u| u.eq_ignore_ascii_case(name))
            {
                unknown.push(name.to_string());
            }
        }
        if !unknown.is_empty() {
            return Err(ImportError::UnknownFacilities(unknown));
        }

        let mut records = Vec::with_capacity(eligible.len());
        let mut seen: HashSet<(String, String)> = HashSet::new();

        for (sheet_index, row) in &eligible {
            let unique_id = row
                .get(COL_UNIQUE_ID)
                .ok_or(ImportError::MissingUniqueId { row: sheet_index + 1 })?;

            let facility_name = row.get(COL_FACILITY).unwrap_or("");
            // Present: the unknown-name pass above already ran.
            let facility_id = facilities
                .get(&facility_name.trim().to_lowercase())
                .cloned()
                .ok_or_else(|| ImportError::UnknownFacilities(vec![facility_name.into()]))?;

            let sex_cell = row.get(COL_SEX).unwrap_or("");
            let sex = Sex::parse(sex_cell).ok_or_else(|| ImportError::InvalidSex {
                unique_id: unique_id.into(),
                value: sex_cell.into(),
            })?;

            let pickup_cell =
                row.get(COL_LAST_PICKUP)
                    .ok_or_else(|| ImportError::MissingPickupDate {
                        unique_id: unique_id.into(),
                    })?;
            let last_pickup =
                parse_date(pickup_cell).ok_or_else(|| ImportError::InvalidPickupDate {
                    unique_id: unique_id.into(),
                    value: pickup_cell.into(),
                })?;

            let months_cell = row.get(COL_REFILL_MONTHS).unwrap_or("");
            let refill_months = months_cell
                .parse::<f64>()
                .ok()
                .filter(|months| schedule::is_allowed_refill_months(*months))
                .ok_or_else(|| ImportError::InvalidRefillDuration {
                    unique_id: unique_id.into(),
                    value: months_cell.into(),
                })?;

            if !seen.insert((facility_id.clone(), unique_id.to_string())) {
                return Err(ImportError::DuplicateRow {
                    facility: facility_name.into(),
                    unique_id: unique_id.into(),
                });
            }

            let mut record =
                RefillRecord::new(facility_id, unique_id.to_string(), sex, refill_months);
            record.last_pickup_date = Some(last_pickup);
            record.current_regimen = row.get(COL_REGIMEN).unwrap_or("").to_string();
            record.case_manager = row.get(COL_CASE_MANAGER).unwrap_or("").to_string();
            record.art_status = row
                .get(COL_ART_STATUS)
                .and_then(ArtStatus::parse)
                .unwrap_or(ArtStatus::Active);
            // Optional columns: stored absent when missing or unparseable.
            record.art_start_date = row.get(COL_ART_START).and_then(parse_date);
            record.vl_sample_date = row.get(COL_VL_SAMPLE).and_then(parse_date);

            records.push(record);
        }

        info!(
            rows = records.len(),
            skipped = sheet.row_count() - records.len(),
            "import batch validated"
        );

        let inserted = self.db.replace_facility_refills(&mut records, as_of)?;
        info!(inserted, "facility refill records replaced");
        Ok(inserted)
    }
}
