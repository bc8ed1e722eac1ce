//! Patient refill records and their derived-field recomputation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::schedule;

/// Patient sex.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Stored/display form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "Male",
            Sex::Female => "Female",
        }
    }

    /// Parse from a stored or imported cell (case-insensitive, trimmed).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Some(Sex::Male),
            "female" | "f" => Some(Sex::Female),
            _ => None,
        }
    }
}

/// Current ART status of a patient.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ArtStatus {
    /// On treatment
    Active,
    /// Returned to treatment after an interruption
    ActiveRestart,
    /// Off treatment
    Inactive,
}

impl ArtStatus {
    /// Stored/display form, matching the upstream feed's labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtStatus::Active => "Active",
            ArtStatus::ActiveRestart => "Active Restart",
            ArtStatus::Inactive => "Inactive",
        }
    }

    /// Parse from a stored or imported cell (case-insensitive, trimmed).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" => Some(ArtStatus::Active),
            "active restart" => Some(ArtStatus::ActiveRestart),
            "inactive" => Some(ArtStatus::Inactive),
            _ => None,
        }
    }

    /// Whether this status keeps the patient in the tracked cohort.
    pub fn is_on_treatment(&self) -> bool {
        matches!(self, ArtStatus::Active | ArtStatus::ActiveRestart)
    }
}

/// A patient's ART refill record at one facility.
///
/// `(facility_id, unique_id)` is the identity key. The three derived fields
/// (`next_appointment`, `expected_iit_date`, `missed_appointment`) are
/// recomputed by [`RefillRecord::recompute`] at every save and are never
/// accepted from a caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefillRecord {
    /// Surrogate ID - UUID, generated locally
    pub id: String,
    /// Owning facility
    pub facility_id: String,
    /// Patient identifier, unique per facility
    pub unique_id: String,
    /// Patient sex
    pub sex: Sex,
    /// Date of the most recent pickup; absent means never picked up
    pub last_pickup_date: Option<NaiveDate>,
    /// Months of medication dispensed (validated against the allowed set)
    pub refill_months: f64,
    /// Current ART regimen
    pub current_regimen: String,
    /// Assigned case manager
    pub case_manager: String,
    /// Free-text remark from the case manager
    pub remark: Option<String>,
    /// Current ART status
    pub art_status: ArtStatus,
    /// Derived: date the patient is next expected
    pub next_appointment: Option<NaiveDate>,
    /// Derived: date a missed appointment becomes a treatment interruption
    pub expected_iit_date: Option<NaiveDate>,
    /// Derived: save-time snapshot of missed-ness; reporting recomputes
    /// missed-ness at query time instead of trusting this flag
    pub missed_appointment: bool,
    /// Date the patient started ART
    pub art_start_date: Option<NaiveDate>,
    /// Date the latest VL sample was collected
    pub vl_sample_date: Option<NaiveDate>,
    /// Latest VL result in copies/ml
    pub vl_result: Option<i64>,
    /// Creation timestamp
    pub created_at: String,
}

impl RefillRecord {
    /// Create a new record with required fields. Derived fields start empty
    /// and are filled by [`RefillRecord::recompute`] when the record is saved.
    pub fn new(facility_id: String, unique_id: String, sex: Sex, refill_months: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            facility_id,
            unique_id,
            sex,
            last_pickup_date: None,
            refill_months,
            current_regimen: String::new(),
            case_manager: String::new(),
            remark: None,
            art_status: ArtStatus::Active,
            next_appointment: None,
            expected_iit_date: None,
            missed_appointment: false,
            art_start_date: None,
            vl_sample_date: None,
            vl_result: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Recompute all derived fields from the current input fields,
    /// overwriting any previously stored values.
    ///
    /// The schedule is derived first; the missed flag is then snapshotted
    /// against the fresh `next_appointment`, never the stale one.
    pub fn recompute(&mut self, as_of: NaiveDate) {
        let (next, iit) =
            schedule::compute_schedule(self.last_pickup_date, Some(self.refill_months));
        self.next_appointment = next;
        self.expected_iit_date = iit;
        self.missed_appointment = schedule::is_missed(self, as_of);
    }
}
