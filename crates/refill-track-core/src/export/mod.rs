//! Tabular reporting exports.
//!
//! Column order and presence are a compatibility contract with downstream
//! consumers; the header tests pin them.

mod expected;
mod missed;
mod tracked;

pub use expected::*;
pub use missed::*;
pub use tracked::*;

use chrono::NaiveDate;

/// Escape a string for CSV output.
pub(crate) fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Render an optional date as ISO yyyy-mm-dd, or an empty cell.
pub(crate) fn date_cell(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}
