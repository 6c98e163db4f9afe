use crate::{CellValue, MergeRange, ValidationRule};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Fully discovered sheet content: headers, typed-row candidates, merge and
/// validation metadata, and the freshness/conflict bookkeeping captured at
/// fetch time.
///
/// `rows` retains separator rows in place; `separator_indices` marks which
/// entries of `rows` are visual dividers rather than editable data.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SheetData {
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    /// 0-based row index of the header row in the sheet. Edit operations use
    /// this as the offset between data-row indices and sheet rows.
    pub header_row_index: usize,
    /// Indices into `rows` that are separator rows.
    pub separator_indices: BTreeSet<usize>,
    pub merge_ranges: Vec<MergeRange>,
    /// Raw formula strings parallel to `rows`; an entry is `Some` only when
    /// the cell contains a formula (starts with `=`).
    pub formula_rows: Vec<Vec<Option<String>>>,
    /// Validation rules keyed by column index.
    pub column_validations: BTreeMap<usize, ValidationRule>,
    /// Remote change token captured when this data was fetched. Used for
    /// staleness checks and optimistic-concurrency conflict detection.
    pub change_token: Option<String>,
    /// True if the remote service reports a filter view/table/basic filter on
    /// this tab, implying absolute row addressing.
    pub is_structured_table: bool,
}

impl SheetData {
    /// Cache key for this sheet: `spreadsheetId:sheetName`.
    pub fn cache_key(&self) -> String {
        cache_key(&self.spreadsheet_id, &self.sheet_name)
    }

    /// True if the data row at `index` is a visual separator.
    pub fn is_separator(&self, index: usize) -> bool {
        self.separator_indices.contains(&index)
    }

    /// The first non-separator data row, used as the inference sample.
    pub fn sample_row(&self) -> Option<&[CellValue]> {
        self.rows
            .iter()
            .enumerate()
            .find(|(i, _)| !self.is_separator(*i))
            .map(|(_, row)| row.as_slice())
    }

    /// The formula row parallel to [`SheetData::sample_row`].
    pub fn sample_formula_row(&self) -> Option<&[Option<String>]> {
        let (idx, _) = self
            .rows
            .iter()
            .enumerate()
            .find(|(i, _)| !self.is_separator(*i))?;
        self.formula_rows.get(idx).map(|r| r.as_slice())
    }
}

/// Builds the snapshot cache key for a sheet reference.
pub(crate) fn cache_key(spreadsheet_id: &str, sheet_name: &str) -> String {
    format!("{spreadsheet_id}:{sheet_name}")
}
