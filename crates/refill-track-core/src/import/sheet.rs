//! The tabular feed contract: named columns plus string cells.

/// Column headers the upstream feed must carry.
pub const COL_UNIQUE_ID: &str = "Unique Id";
pub const COL_LAST_PICKUP: &str = "Last Pickup Date";
pub const COL_REFILL_MONTHS: &str = "Months of ARV Refill";
pub const COL_REGIMEN: &str = "Current ART Regimen";
pub const COL_CASE_MANAGER: &str = "Case Manager";
pub const COL_SEX: &str = "Sex";
pub const COL_ART_STATUS: &str = "Current ART Status";
pub const COL_FACILITY: &str = "Facility Name";

/// Optional columns, parsed when present and valid.
pub const COL_ART_START: &str = "ART Start Date";
pub const COL_VL_SAMPLE: &str = "VL Sample Collection Date";

/// Columns that must all be present for a batch to be accepted.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    COL_UNIQUE_ID,
    COL_LAST_PICKUP,
    COL_REFILL_MONTHS,
    COL_REGIMEN,
    COL_CASE_MANAGER,
    COL_SEX,
    COL_ART_STATUS,
    COL_FACILITY,
];

/// An already-parsed tabular feed: a header row plus string cells.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Sheet {
    /// Create a sheet from its header row.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a data row. Short rows read as empty cells.
    pub fn push_row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    /// Column headers.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Case-insensitive header lookup.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.trim().to_lowercase();
        self.columns
            .iter()
            .position(|c| c.trim().to_lowercase() == wanted)
    }

    /// Whether the given column is present.
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Iterate over the data rows.
    pub fn rows(&self) -> impl Iterator<Item = SheetRow<'_>> {
        self.rows.iter().map(move |cells| SheetRow { sheet: self, cells })
    }
}

/// A borrowed view of one data row.
#[derive(Debug, Clone, Copy)]
pub struct SheetRow<'a> {
    sheet: &'a Sheet,
    cells: &'a [String],
}

impl<'a> SheetRow<'a> {
    /// Get a trimmed cell by column name; blank cells read as `None`.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let index = self.sheet.column_index(column)?;
        let cell = self.cells.get(index)?.trim();
        if cell.is_empty() {
            None
        } else {
            Some(cell)
        }
    }
}
