//! Facility reference data.

use serde::{Deserialize, Serialize};

/// A healthcare facility that dispenses ART refills.
///
/// Names are unique case-insensitively; bulk imports match rows to
/// facilities by name. Deleting a facility deletes its refill records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Facility {
    /// Surrogate ID - UUID, generated locally
    pub id: String,
    /// Facility name (unique, case-insensitive)
    pub name: String,
    /// Facility code (unique)
    pub code: String,
    /// Physical location
    pub location: Option<String>,
    /// Creation timestamp
    pub created_at: String,
}

impl Facility {
    /// Create a new facility with required fields.
    pub fn new(name: String, code: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            code,
            location: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Canonical name used for case-insensitive matching.
    pub fn canonical_name(&self) -> String {
        self.name.trim().to_lowercase()
    }
}
