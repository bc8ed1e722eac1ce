//! Bulk import reconciler.
//!
//! Consumes an already-parsed tabular feed ([`Sheet`]) and replaces each
//! touched facility's refill records with the batch contents. The whole
//! batch is validated in memory first; the delete-then-insert replace runs
//! inside one SQLite transaction, so a failing batch leaves prior data
//! untouched.
//!
//! Spreadsheet parsing itself is the caller's job; callers should run
//! [`Reconciler::check_payload_size`] against the raw upload size before
//! parsing anything.

mod reconciler;
mod sheet;

pub use reconciler::*;
pub use sheet::*;

use thiserror::Error;

use crate::db::DbError;

/// Import errors. All of them abort the batch before any mutation.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("payload of {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { size: u64, max: u64 },

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("no Active or Active Restart rows found")]
    NoEligibleRows,

    #[error("unknown facilities: {}", .0.join(", "))]
    UnknownFacilities(Vec<String>),

    #[error("missing unique id in row {row}")]
    MissingUniqueId { row: usize },

    #[error("missing facility name in row {row} for unique id {unique_id:?}")]
    MissingFacilityName { row: usize, unique_id: String },

    #[error("missing last pickup date for unique id {unique_id}")]
    MissingPickupDate { unique_id: String },

    #[error("invalid last pickup date {value:?} for unique id {unique_id}; expected yyyy-mm-dd")]
    InvalidPickupDate { unique_id: String, value: String },

    #[error(
        "invalid refill duration {value:?} for unique id {unique_id}; \
         allowed months: 0.5, 1, 2, 2.8, 3, 4, 5, 6"
    )]
    InvalidRefillDuration { unique_id: String, value: String },

    #[error("invalid sex {value:?} for unique id {unique_id}")]
    InvalidSex { unique_id: String, value: String },

    #[error("duplicate row for unique id {unique_id} at facility {facility}")]
    DuplicateRow { facility: String, unique_id: String },

    #[error("database error: {0}")]
    Db(#[from] DbError),
}

pub type ImportResult<T> = Result<T, ImportError>;
