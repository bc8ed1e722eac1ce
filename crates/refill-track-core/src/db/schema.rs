//! SQLite schema definition.

/// Complete database schema for refill-track.
pub const SCHEMA: &str = r#"
-- Enable foreign keys (required for the facility delete cascade)
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Facilities
-- ============================================================================

CREATE TABLE IF NOT EXISTS facilities (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL COLLATE NOCASE UNIQUE,
    code TEXT NOT NULL UNIQUE,
    location TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ============================================================================
-- Refill Records
-- ============================================================================

CREATE TABLE IF NOT EXISTS refills (
    id TEXT PRIMARY KEY,
    facility_id TEXT NOT NULL REFERENCES facilities(id) ON DELETE CASCADE,
    unique_id TEXT NOT NULL,
    sex TEXT NOT NULL CHECK (sex IN ('Male', 'Female')),
    last_pickup_date TEXT,
    refill_months REAL NOT NULL,
    current_regimen TEXT NOT NULL DEFAULT '',
    case_manager TEXT NOT NULL DEFAULT '',
    remark TEXT,
    art_status TEXT NOT NULL DEFAULT 'Active'
        CHECK (art_status IN ('Active', 'Active Restart', 'Inactive')),
    next_appointment TEXT,
    expected_iit_date TEXT,
    missed_appointment INTEGER NOT NULL DEFAULT 0,
    art_start_date TEXT,
    vl_sample_date TEXT,
    vl_result INTEGER CHECK (vl_result IS NULL OR vl_result >= 0),
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (facility_id, unique_id)
);

CREATE INDEX IF NOT EXISTS idx_refills_facility ON refills(facility_id);
CREATE INDEX IF NOT EXISTS idx_refills_next_appointment ON refills(next_appointment);
CREATE INDEX IF NOT EXISTS idx_refills_last_pickup ON refills(last_pickup_date);
CREATE INDEX IF NOT EXISTS idx_refills_status ON refills(art_status);
"#;
