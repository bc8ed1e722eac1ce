//! Cohort-level aggregation: VL coverage, missed/IIT counts, suppression.
//!
//! Missed-ness is always recomputed at query time from the stored schedule
//! fields; the save-time `missed_appointment` snapshot is never trusted
//! here.

mod risk;

pub use risk::*;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::{Database, DbResult};
use crate::models::RefillRecord;
use crate::schedule::{self, IitStatus, Quarter};

/// Quarterly VL testing coverage over the eligible cohort.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VlCoverage {
    pub year: i32,
    pub quarter: Quarter,
    /// Cohort members whose ART start date falls on or before quarter end
    pub denominator: u64,
    /// Denominator subset sampled within the quarter
    pub numerator: u64,
    /// numerator / denominator × 100, one decimal place; 0 when the
    /// denominator is 0
    pub coverage_pct: f64,
}

/// Point-in-time counts over the active cohort.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CohortSummary {
    pub total: u64,
    /// Missed as of the evaluation date
    pub missed: u64,
    /// Missed for 28 days or more
    pub iit: u64,
    /// VL result below the suppression threshold
    pub suppressed: u64,
    /// VL result at or above the suppression threshold
    pub unsuppressed: u64,
    /// No VL result recorded
    pub vl_unknown: u64,
}

/// Daily/weekly/monthly refill-tracking windows over the active cohort.
///
/// Expected windows look forward from `today` (today, the next seven days,
/// the rest of the current calendar month); picked-up windows look back
/// (today, since Monday, since the first of the month).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefillTracking {
    pub today: NaiveDate,
    /// Next appointment falls on `today`
    pub daily_expected: Vec<RefillRecord>,
    /// Next appointment within `[today, today + 7]`
    pub weekly_expected: Vec<RefillRecord>,
    /// Next appointment within the current calendar month
    pub monthly_expected: Vec<RefillRecord>,
    /// Picked up on `today`
    pub daily_picked_up: Vec<RefillRecord>,
    /// Picked up since the start of the week
    pub weekly_picked_up: Vec<RefillRecord>,
    /// Picked up since the start of the month
    pub monthly_picked_up: Vec<RefillRecord>,
}

/// Aggregation engine over the refill record store.
pub struct Reporter<'a> {
    db: &'a Database,
}

impl<'a> Reporter<'a> {
    /// Create a new reporter.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Compute VL testing coverage for one quarter, optionally narrowed to
    /// one facility.
    pub fn quarterly_vl_coverage(
        &self,
        year: i32,
        quarter: Quarter,
        facility_id: Option<&str>,
    ) -> DbResult<VlCoverage> {
        let quarter_start = quarter.start_date(year);
        let quarter_end = quarter.end_date(year);

        let cohort = self.db.list_vl_cohort(facility_id)?;

        let mut denominator = 0u64;
        let mut numerator = 0u64;
        for record in &cohort {
            let Some(start) = record.art_start_date else {
                continue;
            };
            if start > quarter_end {
                continue;
            }
            denominator += 1;
            if let Some(sample) = record.vl_sample_date {
                if sample >= quarter_start && sample <= quarter_end {
                    numerator += 1;
                }
            }
        }

        let coverage_pct = if denominator == 0 {
            0.0
        } else {
            round1(numerator as f64 / denominator as f64 * 100.0)
        };

        debug!(year, %quarter, denominator, numerator, coverage_pct, "VL coverage computed");

        Ok(VlCoverage {
            year,
            quarter,
            denominator,
            numerator,
            coverage_pct,
        })
    }

    /// Count missed, IIT, and suppression buckets over the active cohort as
    /// of the given date.
    pub fn cohort_summary(
        &self,
        facility_id: Option<&str>,
        as_of: NaiveDate,
    ) -> DbResult<CohortSummary> {
        let cohort = self.db.list_active_refills(facility_id)?;

        let mut summary = CohortSummary {
            total: cohort.len() as u64,
            missed: 0,
            iit: 0,
            suppressed: 0,
            unsuppressed: 0,
            vl_unknown: 0,
        };

        for record in &cohort {
            if schedule::is_missed(record, as_of) {
                summary.missed += 1;
            }
            if schedule::iit_status(record, as_of) == IitStatus::Iit {
                summary.iit += 1;
            }
            match schedule::is_suppressed(record) {
                Some(true) => summary.suppressed += 1,
                Some(false) => summary.unsuppressed += 1,
                None => summary.vl_unknown += 1,
            }
        }

        Ok(summary)
    }

    /// Build the daily/weekly/monthly tracking windows as of `today`,
    /// optionally narrowed to one facility.
    pub fn refill_tracking(
        &self,
        facility_id: Option<&str>,
        today: NaiveDate,
    ) -> DbResult<RefillTracking> {
        let week_end = today + chrono::Duration::days(7);
        let week_start = schedule::week_start(today);
        let month_start = schedule::month_start(today);
        let month_end = schedule::month_end(today);

        let tracking = RefillTracking {
            today,
            daily_expected: self
                .db
                .list_refills_expected_between(facility_id, today, today)?,
            weekly_expected: self
                .db
                .list_refills_expected_between(facility_id, today, week_end)?,
            monthly_expected: self
                .db
                .list_refills_expected_between(facility_id, month_start, month_end)?,
            daily_picked_up: self
                .db
                .list_refills_picked_up_between(facility_id, today, today)?,
            weekly_picked_up: self
                .db
                .list_refills_picked_up_between(facility_id, week_start, today)?,
            monthly_picked_up: self
                .db
                .list_refills_picked_up_between(facility_id, month_start, today)?,
        };

        debug!(
            %today,
            daily_expected = tracking.daily_expected.len(),
            weekly_expected = tracking.weekly_expected.len(),
            monthly_expected = tracking.monthly_expected.len(),
            "refill tracking windows computed"
        );

        Ok(tracking)
    }
}

/// Round to one decimal place.
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
