//! Date-driven scheduling and eligibility rules.
//!
//! Everything here is a pure function over a [`RefillRecord`] and an
//! evaluation date, so the rules are testable without a database and the
//! persistence layer can invoke them explicitly at save time.
//!
//! Two documented simplifications carried from the source program:
//! - a refill month is a fixed 30 days, not a calendar month;
//! - patient age is approximated as whole years on ART, because the record
//!   carries no birth date. The VL eligibility branching runs on that proxy.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::RefillRecord;

/// Fixed days-per-month approximation used for all refill math.
pub const DAYS_PER_MONTH: f64 = 30.0;

/// Grace period after a missed appointment before IIT classification.
pub const IIT_GRACE_DAYS: i64 = 28;

/// Minimum days on ART before first VL eligibility.
pub const MIN_DAYS_ON_ART_FOR_VL: i64 = 180;

/// Maximum sample age for children/adolescents before retesting is due.
pub const CHILD_VL_WINDOW_DAYS: i64 = 180;

/// Age (in proxy years) at which the adult VL cadence applies.
pub const ADULT_AGE_YEARS: i64 = 15;

/// VL results below this threshold (copies/ml) count as suppressed.
pub const VL_SUPPRESSION_THRESHOLD: i64 = 1000;

/// Dispensing durations (in months) accepted at import time.
pub const ALLOWED_REFILL_MONTHS: [f64; 8] = [0.5, 1.0, 2.0, 2.8, 3.0, 4.0, 5.0, 6.0];

/// Check a refill duration against the allowed set.
///
/// Tolerant comparison so parsed decimals ("2.8") match reliably.
pub fn is_allowed_refill_months(months: f64) -> bool {
    ALLOWED_REFILL_MONTHS
        .iter()
        .any(|allowed| (allowed - months).abs() < 1e-9)
}

/// Convert a refill duration in months to dispensed days.
pub fn refill_days(months: f64) -> i64 {
    (months * DAYS_PER_MONTH).round() as i64
}

/// Derive `(next_appointment, expected_iit_date)` from the last pickup and
/// refill duration. If either input is absent, both outputs are absent —
/// no guessing.
pub fn compute_schedule(
    last_pickup_date: Option<NaiveDate>,
    refill_months: Option<f64>,
) -> (Option<NaiveDate>, Option<NaiveDate>) {
    match (last_pickup_date, refill_months) {
        (Some(pickup), Some(months)) => {
            let next = pickup + chrono::Duration::days(refill_days(months));
            let iit = next + chrono::Duration::days(IIT_GRACE_DAYS);
            (Some(next), Some(iit))
        }
        _ => (None, None),
    }
}

/// Whether the record's appointment is missed as of the given date.
///
/// A record whose last pickup is on or after the stored next appointment is
/// considered already resolved (e.g. re-synced), even if that stale
/// appointment date is in the past.
pub fn is_missed(record: &RefillRecord, as_of: NaiveDate) -> bool {
    let Some(next) = record.next_appointment else {
        return false;
    };
    let unresolved = match record.last_pickup_date {
        Some(pickup) => pickup < next,
        None => true,
    };
    unresolved && next < as_of
}

/// Days elapsed since the missed appointment; 0 when not missed.
pub fn days_missed(record: &RefillRecord, as_of: NaiveDate) -> i64 {
    if is_missed(record, as_of) {
        match record.next_appointment {
            Some(next) => (as_of - next).num_days(),
            None => 0,
        }
    } else {
        0
    }
}

/// Where a record sits in the missed-appointment lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IitStatus {
    /// No missed appointment
    NotMissed,
    /// Missed, with this many days left before IIT classification
    DaysToIit(i64),
    /// Interruption in treatment: missed for 28 days or more
    Iit,
}

impl fmt::Display for IitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IitStatus::NotMissed => write!(f, "Not Missed"),
            IitStatus::DaysToIit(n) => write!(f, "{} days to IIT", n),
            IitStatus::Iit => write!(f, "IIT"),
        }
    }
}

/// Classify a record's IIT status as of the given date.
pub fn iit_status(record: &RefillRecord, as_of: NaiveDate) -> IitStatus {
    let missed_for = days_missed(record, as_of);
    if missed_for >= IIT_GRACE_DAYS {
        IitStatus::Iit
    } else if missed_for > 0 {
        IitStatus::DaysToIit(IIT_GRACE_DAYS - missed_for)
    } else {
        IitStatus::NotMissed
    }
}

/// Whether the patient is due for a VL test as of `today`.
///
/// Requires a known ART start date and at least 180 days on treatment.
/// Adults (proxy age >= 15) are due unless a sample was already collected in
/// the current calendar year; children are due unless a sample was collected
/// within the last 180 days. The age proxy is days-on-ART divided by 365 —
/// a data-model shortcut, not true patient age.
pub fn is_vl_eligible(record: &RefillRecord, today: NaiveDate) -> bool {
    let Some(start) = record.art_start_date else {
        return false;
    };
    let days_on_art = (today - start).num_days();
    if days_on_art < MIN_DAYS_ON_ART_FOR_VL {
        return false;
    }

    let age_years = days_on_art / 365;
    match record.vl_sample_date {
        None => true,
        Some(sample) => {
            if age_years >= ADULT_AGE_YEARS {
                sample.year() != today.year()
            } else {
                (today - sample).num_days() >= CHILD_VL_WINDOW_DAYS
            }
        }
    }
}

/// Whether the latest VL result indicates suppression.
///
/// `None` when no result is recorded: unknown, not false.
pub fn is_suppressed(record: &RefillRecord) -> Option<bool> {
    record.vl_result.map(|copies| copies < VL_SUPPRESSION_THRESHOLD)
}

/// Calendar quarter of a reporting year.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    /// Quarter containing the given month (1-12).
    pub fn from_month(month: u32) -> Self {
        match month {
            1..=3 => Quarter::Q1,
            4..=6 => Quarter::Q2,
            7..=9 => Quarter::Q3,
            _ => Quarter::Q4,
        }
    }

    /// First day of this quarter in the given year.
    pub fn start_date(&self, year: i32) -> NaiveDate {
        let month = match self {
            Quarter::Q1 => 1,
            Quarter::Q2 => 4,
            Quarter::Q3 => 7,
            Quarter::Q4 => 10,
        };
        // Month 1/4/7/10, day 1 always exists.
        NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_default()
    }

    /// Last day of this quarter in the given year (Q4 rolls into the next
    /// year to land on Dec 31).
    pub fn end_date(&self, year: i32) -> NaiveDate {
        let next_start = match self {
            Quarter::Q1 => Quarter::Q2.start_date(year),
            Quarter::Q2 => Quarter::Q3.start_date(year),
            Quarter::Q3 => Quarter::Q4.start_date(year),
            Quarter::Q4 => Quarter::Q1.start_date(year + 1),
        };
        next_start - chrono::Duration::days(1)
    }

    /// Display label ("Q1".."Q4").
    pub fn label(&self) -> &'static str {
        match self {
            Quarter::Q1 => "Q1",
            Quarter::Q2 => "Q2",
            Quarter::Q3 => "Q3",
            Quarter::Q4 => "Q4",
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Calendar quarter containing the given date.
pub fn quarter_of(date: NaiveDate) -> Quarter {
    Quarter::from_month(date.month())
}

/// First day of the week containing the given date (weeks start Monday).
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - chrono::Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// First day of the month containing the given date.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    // Day 1 always exists.
    date.with_day(1).unwrap_or(date)
}

/// Last day of the month containing the given date.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_default() - chrono::Duration::days(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sex;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record_with_pickup(pickup: Option<NaiveDate>, months: f64) -> RefillRecord {
        let mut record = RefillRecord::new("fac-1".into(), "PAT-001".into(), Sex::Female, months);
        record.last_pickup_date = pickup;
        let (next, iit) = compute_schedule(pickup, Some(months));
        record.next_appointment = next;
        record.expected_iit_date = iit;
        record
    }

    #[test]
    fn test_compute_schedule_two_month_refill() {
        // 2025-01-01 + 2 months (60 days) => 2025-03-02, IIT 2025-03-30.
        let (next, iit) = compute_schedule(Some(date(2025, 1, 1)), Some(2.0));
        assert_eq!(next, Some(date(2025, 3, 2)));
        assert_eq!(iit, Some(date(2025, 3, 30)));
    }

    #[test]
    fn test_compute_schedule_absent_inputs() {
        assert_eq!(compute_schedule(None, Some(3.0)), (None, None));
        assert_eq!(compute_schedule(Some(date(2025, 1, 1)), None), (None, None));
        assert_eq!(compute_schedule(None, None), (None, None));
    }

    #[test]
    fn test_refill_days_decimal_months() {
        assert_eq!(refill_days(0.5), 15);
        assert_eq!(refill_days(1.0), 30);
        assert_eq!(refill_days(2.8), 84);
        assert_eq!(refill_days(6.0), 180);
    }

    #[test]
    fn test_allowed_refill_months() {
        for months in ALLOWED_REFILL_MONTHS {
            assert!(is_allowed_refill_months(months));
        }
        assert!(is_allowed_refill_months(2.8000000001));
        assert!(!is_allowed_refill_months(1.5));
        assert!(!is_allowed_refill_months(12.0));
    }

    #[test]
    fn test_is_missed_basic() {
        let record = record_with_pickup(Some(date(2025, 1, 1)), 1.0);
        // Next appointment is Jan 31.
        assert!(!is_missed(&record, date(2025, 1, 31)));
        assert!(is_missed(&record, date(2025, 2, 1)));
    }

    #[test]
    fn test_is_missed_resolved_by_later_pickup() {
        // Stale stored appointment, but the pickup already happened on/after it.
        let mut record = record_with_pickup(Some(date(2025, 3, 2)), 1.0);
        record.next_appointment = Some(date(2025, 3, 2));
        assert!(!is_missed(&record, date(2025, 6, 1)));

        record.next_appointment = Some(date(2025, 1, 1));
        assert!(!is_missed(&record, date(2025, 6, 1)));
    }

    #[test]
    fn test_is_missed_without_next_appointment() {
        let record = record_with_pickup(None, 1.0);
        assert!(!is_missed(&record, date(2025, 6, 1)));
        assert_eq!(days_missed(&record, date(2025, 6, 1)), 0);
    }

    #[test]
    fn test_iit_status_transitions() {
        let record = record_with_pickup(Some(date(2025, 1, 1)), 1.0);
        let next = date(2025, 1, 31);

        assert_eq!(iit_status(&record, next), IitStatus::NotMissed);
        assert_eq!(
            iit_status(&record, next + chrono::Duration::days(1)),
            IitStatus::DaysToIit(27)
        );
        assert_eq!(
            iit_status(&record, next + chrono::Duration::days(27)),
            IitStatus::DaysToIit(1)
        );
        assert_eq!(
            iit_status(&record, next + chrono::Duration::days(28)),
            IitStatus::Iit
        );
        assert_eq!(
            iit_status(&record, next + chrono::Duration::days(200)),
            IitStatus::Iit
        );
    }

    #[test]
    fn test_iit_status_display() {
        assert_eq!(IitStatus::NotMissed.to_string(), "Not Missed");
        assert_eq!(IitStatus::DaysToIit(5).to_string(), "5 days to IIT");
        assert_eq!(IitStatus::Iit.to_string(), "IIT");
    }

    #[test]
    fn test_vl_eligibility_requires_art_start() {
        let record = record_with_pickup(Some(date(2025, 1, 1)), 1.0);
        assert!(!is_vl_eligible(&record, date(2025, 6, 1)));
    }

    #[test]
    fn test_vl_eligibility_minimum_days_on_art() {
        let mut record = record_with_pickup(Some(date(2025, 1, 1)), 1.0);
        record.art_start_date = Some(date(2025, 1, 1));
        // 179 days on ART: not yet eligible.
        assert!(!is_vl_eligible(&record, date(2025, 6, 29)));
        // 180 days: eligible (no sample yet).
        assert!(is_vl_eligible(&record, date(2025, 6, 30)));
    }

    #[test]
    fn test_vl_eligibility_adult_calendar_year_rule() {
        let mut record = record_with_pickup(Some(date(2025, 1, 1)), 1.0);
        // ~20 proxy years on ART.
        record.art_start_date = Some(date(2005, 1, 1));

        record.vl_sample_date = Some(date(2025, 2, 10));
        assert!(!is_vl_eligible(&record, date(2025, 11, 1)));

        record.vl_sample_date = Some(date(2024, 12, 20));
        assert!(is_vl_eligible(&record, date(2025, 11, 1)));
    }

    #[test]
    fn test_vl_eligibility_child_window_rule() {
        let mut record = record_with_pickup(Some(date(2025, 1, 1)), 1.0);
        // ~2 proxy years on ART: child cadence.
        record.art_start_date = Some(date(2023, 6, 1));

        let today = date(2025, 6, 1);
        record.vl_sample_date = Some(today - chrono::Duration::days(179));
        assert!(!is_vl_eligible(&record, today));

        record.vl_sample_date = Some(today - chrono::Duration::days(180));
        assert!(is_vl_eligible(&record, today));
    }

    #[test]
    fn test_is_suppressed() {
        let mut record = record_with_pickup(Some(date(2025, 1, 1)), 1.0);
        assert_eq!(is_suppressed(&record), None);

        record.vl_result = Some(999);
        assert_eq!(is_suppressed(&record), Some(true));

        record.vl_result = Some(1000);
        assert_eq!(is_suppressed(&record), Some(false));

        record.vl_result = Some(0);
        assert_eq!(is_suppressed(&record), Some(true));
    }

    #[test]
    fn test_quarter_buckets() {
        assert_eq!(quarter_of(date(2025, 1, 15)), Quarter::Q1);
        assert_eq!(quarter_of(date(2025, 3, 31)), Quarter::Q1);
        assert_eq!(quarter_of(date(2025, 4, 1)), Quarter::Q2);
        assert_eq!(quarter_of(date(2025, 9, 30)), Quarter::Q3);
        assert_eq!(quarter_of(date(2025, 12, 31)), Quarter::Q4);
    }

    #[test]
    fn test_calendar_windows() {
        // 2025-03-15 is a Saturday.
        assert_eq!(week_start(date(2025, 3, 15)), date(2025, 3, 10));
        assert_eq!(week_start(date(2025, 3, 10)), date(2025, 3, 10));

        assert_eq!(month_start(date(2025, 3, 15)), date(2025, 3, 1));
        assert_eq!(month_end(date(2025, 2, 10)), date(2025, 2, 28));
        assert_eq!(month_end(date(2024, 2, 10)), date(2024, 2, 29));
        assert_eq!(month_end(date(2025, 12, 5)), date(2025, 12, 31));
    }

    #[test]
    fn test_quarter_date_ranges() {
        assert_eq!(Quarter::Q1.start_date(2025), date(2025, 1, 1));
        assert_eq!(Quarter::Q1.end_date(2025), date(2025, 3, 31));
        assert_eq!(Quarter::Q2.end_date(2025), date(2025, 6, 30));
        assert_eq!(Quarter::Q4.start_date(2025), date(2025, 10, 1));
        assert_eq!(Quarter::Q4.end_date(2025), date(2025, 12, 31));
    }

    proptest! {
        #[test]
        fn prop_schedule_offsets(
            days_offset in 0i64..20_000,
            months_idx in 0usize..ALLOWED_REFILL_MONTHS.len(),
        ) {
            let pickup = date(2000, 1, 1) + chrono::Duration::days(days_offset);
            let months = ALLOWED_REFILL_MONTHS[months_idx];

            let (next, iit) = compute_schedule(Some(pickup), Some(months));
            let next = next.unwrap();
            let iit = iit.unwrap();

            prop_assert_eq!((next - pickup).num_days(), refill_days(months));
            prop_assert_eq!((iit - next).num_days(), IIT_GRACE_DAYS);

            // Idempotence: recomputing from unchanged inputs is identical.
            let again = compute_schedule(Some(pickup), Some(months));
            prop_assert_eq!(again, (Some(next), Some(iit)));
        }

        #[test]
        fn prop_iit_monotonic(days_after in 1i64..400) {
            let record = record_with_pickup(Some(date(2025, 1, 1)), 1.0);
            let next = date(2025, 1, 31);
            let status = iit_status(&record, next + chrono::Duration::days(days_after));
            if days_after >= IIT_GRACE_DAYS {
                prop_assert_eq!(status, IitStatus::Iit);
            } else {
                prop_assert_eq!(status, IitStatus::DaysToIit(IIT_GRACE_DAYS - days_after));
            }
        }
    }
}
