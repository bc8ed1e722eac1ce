//! Heuristic IIT-risk scoring from appointment state and remark keywords.
//!
//! Advisory triage only, not a statistically calibrated clinical model.
//! Scores are additive and capped at 100:
//! - Missed appointment state: 40
//! - Days missed over 30: 25, over 7: 15
//! - Each distinct matched remark keyword: its rule weight
//! - ART status Inactive: 30, Active Restart: 20

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{ArtStatus, RefillRecord};
use crate::schedule;

/// Maximum risk score.
pub const MAX_SCORE: u32 = 100;

/// Points for being in the missed-appointment state.
const MISSED_POINTS: u32 = 40;

/// Points when the appointment has been missed for more than 30 days.
const LONG_OVERDUE_POINTS: u32 = 25;

/// Points when missed for more than 7 days (but not more than 30).
const OVERDUE_POINTS: u32 = 15;

/// Points for ART status Inactive.
const INACTIVE_POINTS: u32 = 30;

/// Points for ART status Active Restart.
const RESTART_POINTS: u32 = 20;

/// Default weight of high-risk remark keywords.
pub const HIGH_RISK_WEIGHT: u32 = 20;

/// Default weight of medium-risk remark keywords.
pub const MEDIUM_RISK_WEIGHT: u32 = 10;

const HIGH_RISK_KEYWORDS: [&str; 9] = [
    "transport",
    "money",
    "travel",
    "forgot",
    "busy",
    "sick",
    "hospital",
    "defaulted",
    "side effect",
];

const MEDIUM_RISK_KEYWORDS: [&str; 6] = [
    "delay",
    "reschedule",
    "family issue",
    "school",
    "funeral",
    "religious",
];

/// A remark keyword with its score contribution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RiskRule {
    /// Matched as a case-insensitive substring of the remark
    pub pattern: String,
    /// Points added when the pattern matches (once per distinct pattern)
    pub weight: u32,
}

impl RiskRule {
    /// Create a rule.
    pub fn new(pattern: impl Into<String>, weight: u32) -> Self {
        Self {
            pattern: pattern.into(),
            weight,
        }
    }
}

/// Scores refill records against a configurable keyword rule list.
#[derive(Debug, Clone)]
pub struct RiskScorer {
    rules: Vec<RiskRule>,
}

impl Default for RiskScorer {
    /// The stock keyword list.
    fn default() -> Self {
        let mut rules: Vec<RiskRule> = HIGH_RISK_KEYWORDS
            .iter()
            .map(|k| RiskRule::new(*k, HIGH_RISK_WEIGHT))
            .collect();
        rules.extend(
            MEDIUM_RISK_KEYWORDS
                .iter()
                .map(|k| RiskRule::new(*k, MEDIUM_RISK_WEIGHT)),
        );
        Self { rules }
    }
}

impl RiskScorer {
    /// Create a scorer with a custom rule list.
    pub fn new(rules: Vec<RiskRule>) -> Self {
        Self { rules }
    }

    /// The active rule list.
    pub fn rules(&self) -> &[RiskRule] {
        &self.rules
    }

    /// Score a record in `0..=100` as of the given date.
    pub fn score(&self, record: &RefillRecord, as_of: NaiveDate) -> u32 {
        let mut score = 0u32;

        if schedule::is_missed(record, as_of) {
            score += MISSED_POINTS;
        }

        let missed_for = schedule::days_missed(record, as_of);
        if missed_for > 30 {
            score += LONG_OVERDUE_POINTS;
        } else if missed_for > 7 {
            score += OVERDUE_POINTS;
        }

        if let Some(remark) = &record.remark {
            let remark = remark.to_lowercase();
            for rule in &self.rules {
                if remark.contains(&rule.pattern.to_lowercase()) {
                    score += rule.weight;
                }
            }
        }

        score += match record.art_status {
            ArtStatus::Inactive => INACTIVE_POINTS,
            ArtStatus::ActiveRestart => RESTART_POINTS,
            ArtStatus::Active => 0,
        };

        score.min(MAX_SCORE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sex;
    use crate::schedule::compute_schedule;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record_picked_up(pickup: NaiveDate, months: f64) -> RefillRecord {
        let mut record = RefillRecord::new("fac-1".into(), "PAT-001".into(), Sex::Male, months);
        record.last_pickup_date = Some(pickup);
        let (next, iit) = compute_schedule(Some(pickup), Some(months));
        record.next_appointment = next;
        record.expected_iit_date = iit;
        record
    }

    #[test]
    fn test_on_time_active_scores_zero() {
        let record = record_picked_up(date(2025, 1, 1), 3.0);
        let score = RiskScorer::default().score(&record, date(2025, 1, 15));
        assert_eq!(score, 0);
    }

    #[test]
    fn test_missed_points() {
        // Next appointment Jan 31; 3 days missed => only the missed bonus.
        let record = record_picked_up(date(2025, 1, 1), 1.0);
        let score = RiskScorer::default().score(&record, date(2025, 2, 3));
        assert_eq!(score, 40);
    }

    #[test]
    fn test_overdue_tiers() {
        let record = record_picked_up(date(2025, 1, 1), 1.0);
        let scorer = RiskScorer::default();
        let next = date(2025, 1, 31);

        // 8 days missed: 40 + 15.
        assert_eq!(scorer.score(&record, next + chrono::Duration::days(8)), 55);
        // 31 days missed: 40 + 25.
        assert_eq!(scorer.score(&record, next + chrono::Duration::days(31)), 65);
    }

    #[test]
    fn test_keyword_weights_and_case_insensitivity() {
        let mut record = record_picked_up(date(2025, 1, 1), 3.0);
        record.remark = Some("No TRANSPORT money; asked to reschedule".into());

        // transport (20) + money (20) + reschedule (10).
        let score = RiskScorer::default().score(&record, date(2025, 1, 15));
        assert_eq!(score, 50);
    }

    #[test]
    fn test_distinct_keywords_add_once() {
        let mut record = record_picked_up(date(2025, 1, 1), 3.0);
        record.remark = Some("sick, still sick, very sick".into());

        let score = RiskScorer::default().score(&record, date(2025, 1, 15));
        assert_eq!(score, 20);
    }

    #[test]
    fn test_status_bonuses_mutually_exclusive() {
        let scorer = RiskScorer::default();

        let mut record = record_picked_up(date(2025, 1, 1), 3.0);
        record.art_status = ArtStatus::Inactive;
        assert_eq!(scorer.score(&record, date(2025, 1, 15)), 30);

        record.art_status = ArtStatus::ActiveRestart;
        assert_eq!(scorer.score(&record, date(2025, 1, 15)), 20);
    }

    #[test]
    fn test_score_caps_at_100() {
        let mut record = record_picked_up(date(2025, 1, 1), 0.5);
        record.art_status = ArtStatus::ActiveRestart;
        record.remark = Some(
            "defaulted; no transport or money, was sick in hospital, \
             travel for a funeral, school fees"
                .into(),
        );

        // 40 + 25 + far more than 35 keyword points, clamped.
        let score = RiskScorer::default().score(&record, date(2025, 6, 1));
        assert_eq!(score, 100);
    }

    #[test]
    fn test_score_monotone_as_conditions_accumulate() {
        let scorer = RiskScorer::default();
        let as_of = date(2025, 3, 20);

        let mut record = record_picked_up(date(2025, 1, 1), 3.0);
        let mut last = scorer.score(&record, as_of);

        // Shorter refill => missed appointment.
        record = record_picked_up(date(2025, 1, 1), 1.0);
        let missed = scorer.score(&record, as_of);
        assert!(missed >= last);
        last = missed;

        record.remark = Some("no transport".into());
        let with_remark = scorer.score(&record, as_of);
        assert!(with_remark >= last);
        last = with_remark;

        record.art_status = ArtStatus::Inactive;
        let inactive = scorer.score(&record, as_of);
        assert!(inactive >= last);
        assert!(inactive <= MAX_SCORE);
    }

    #[test]
    fn test_custom_rules() {
        let scorer = RiskScorer::new(vec![RiskRule::new("stigma", 35)]);
        let mut record = record_picked_up(date(2025, 1, 1), 3.0);
        record.remark = Some("fears stigma at the clinic".into());

        assert_eq!(scorer.score(&record, date(2025, 1, 15)), 35);
        assert_eq!(scorer.rules().len(), 1);
    }
}
