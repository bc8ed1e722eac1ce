//! Refill-Track Core Library
//!
//! Tracks ART medication refills and viral-load monitoring for patients
//! across healthcare facilities: appointment schedules, missed-pickup and
//! IIT flags, VL eligibility and coverage, bulk replace-on-import, and
//! tabular reporting exports.
//!
//! # Architecture
//!
//! ```text
//! Tabular feed (parsed upstream)
//!         │
//!         ▼
//! ┌───────────────────┐   validate whole batch in memory,
//! │ Import Reconciler │   then delete+insert per facility
//! └─────────┬─────────┘   in one transaction
//!           │
//!           ▼
//! ┌───────────────────┐   derived fields recomputed at
//! │  Refill Record    │   every save (schedule rules)
//! │     store         │
//! └─────────┬─────────┘
//!           │
//!     ┌─────┴──────┐
//!     ▼            ▼
//! Aggregation    Exports
//! (coverage,     (expected-refill,
//!  summary,       missed-refill)
//!  risk score)
//! ```
//!
//! # Core principle
//!
//! Scheduling, missed-ness, IIT classification, and VL eligibility are pure
//! functions in [`schedule`], invoked explicitly at the persistence seam and
//! recomputed at query time by reporting code. The stored
//! `missed_appointment` flag is only a save-time snapshot.
//!
//! # Modules
//!
//! - [`db`]: SQLite record store (facilities, refill records, atomic replace)
//! - [`models`]: Domain types (Facility, RefillRecord, Sex, ArtStatus)
//! - [`schedule`]: Pure date/eligibility rules
//! - [`import`]: Bulk import reconciler
//! - [`report`]: Cohort aggregation and heuristic risk scoring
//! - [`export`]: Expected-refill and missed-refill report rows

pub mod db;
pub mod export;
pub mod import;
pub mod models;
pub mod report;
pub mod schedule;

// Re-export commonly used types
pub use db::{Database, DbError, DbResult};
pub use export::{
    ExpectedRefillExporter, ExpectedRefillReport, MissedRefillExporter, MissedRefillReport,
    TrackedRefillExporter, TrackedRefillReport,
};
pub use import::{ImportError, ImportResult, Reconciler, Sheet};
pub use models::{ArtStatus, Facility, RefillRecord, Sex};
pub use report::{CohortSummary, RefillTracking, Reporter, RiskRule, RiskScorer, VlCoverage};
pub use schedule::{IitStatus, Quarter};
