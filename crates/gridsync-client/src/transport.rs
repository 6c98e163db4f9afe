//! Remote transport abstraction.
//!
//! [`SheetTransport`] is the seam between the client logic and whatever HTTP
//! stack talks to the spreadsheet service. The client, the conflict guard and
//! the sync worker are all written against this trait, which keeps every data
//! flow testable with an in-memory fake.

use std::collections::BTreeMap;

use async_trait::async_trait;
use gridsync_model::{CellValue, MergeRange, ValidationRule};

use crate::error::ApiResult;

/// Identifies one tab of one spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SheetRef {
    pub spreadsheet_id: String,
    pub sheet_name: String,
}

impl SheetRef {
    pub fn new(spreadsheet_id: impl Into<String>, sheet_name: impl Into<String>) -> Self {
        SheetRef {
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
        }
    }

    /// Key under which this sheet's snapshot is cached.
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.spreadsheet_id, self.sheet_name)
    }
}

/// How cell contents should be rendered by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueRender {
    /// Display strings, as a user sees them in the grid.
    Formatted,
    /// Raw cell input, so `=SUM(A:A)` comes back as the formula text.
    Formula,
}

/// Structural metadata for a sheet that the value grid does not carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetMetadata {
    pub merge_ranges: Vec<MergeRange>,
    pub column_validations: BTreeMap<usize, ValidationRule>,
    /// True when the sheet is backed by a structured table object.
    pub is_structured_table: bool,
}

/// One spreadsheet as listed by the remote drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSpreadsheet {
    pub id: String,
    pub name: String,
    pub modified_time: Option<String>,
}

#[async_trait]
pub trait SheetTransport: Send + Sync {
    /// All spreadsheets visible to the signed-in account.
    async fn list_spreadsheets(&self) -> ApiResult<Vec<RemoteSpreadsheet>>;

    /// The full value grid of one sheet.
    async fn fetch_values(
        &self,
        sheet: &SheetRef,
        render: ValueRender,
    ) -> ApiResult<Vec<Vec<CellValue>>>;

    /// Merge ranges, per-column validation rules and table flags.
    async fn fetch_metadata(&self, sheet: &SheetRef) -> ApiResult<SheetMetadata>;

    /// An opaque token that changes whenever the spreadsheet is modified.
    /// `None` means the service did not report one.
    async fn fetch_change_token(&self, spreadsheet_id: &str) -> ApiResult<Option<String>>;

    /// Append one row after the last data row of the sheet.
    async fn append_row(&self, sheet: &SheetRef, row: &[Option<String>]) -> ApiResult<()>;

    /// Overwrite one existing row. `row_index` is zero-based over the whole
    /// sheet, header included.
    async fn update_row(
        &self,
        sheet: &SheetRef,
        row_index: usize,
        row: &[Option<String>],
    ) -> ApiResult<()>;
}

/// Answers "are we online right now". Implemented over the platform's
/// network monitor in production, over an `AtomicBool` in tests.
pub trait ConnectivityOracle: Send + Sync {
    fn is_online(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_matches_snapshot_key_format() {
        let sheet = SheetRef::new("ss-9", "Q3 Budget");
        assert_eq!(sheet.cache_key(), "ss-9:Q3 Budget");
    }
}
