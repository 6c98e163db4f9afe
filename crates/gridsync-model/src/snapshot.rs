use crate::{CellValue, MergeRange, SheetData, ValidationRule};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};

/// Bump when the persisted snapshot layout changes in an incompatible way.
/// Readers treat any other version as a cache miss, which forces a refetch.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Snapshots older than this are considered stale even when the remote change
/// token still matches (5 minutes).
pub const SNAPSHOT_MAX_AGE_MS: i64 = 5 * 60 * 1000;

/// Persisted form of a discovered sheet, written after every successful fetch.
///
/// Cell values are coerced to plain strings for storage; restoring yields
/// string-level-equal content, not the original value objects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SheetSnapshot {
    /// `spreadsheetId:sheetName`.
    pub cache_key: String,
    pub schema_version: u32,
    /// Stable hash over headers + data rows + formula strings. Lets callers
    /// detect real content changes independent of the remote change token,
    /// which also moves on formatting-only edits.
    pub content_hash: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub formula_rows: Vec<Vec<Option<String>>>,
    pub merge_ranges: Vec<MergeRange>,
    pub column_validations: BTreeMap<usize, ValidationRule>,
    pub change_token: Option<String>,
    pub is_structured_table: bool,
    pub fetched_at_ms: i64,
    pub header_row_index: usize,
    pub separator_indices: BTreeSet<usize>,
}

impl SheetSnapshot {
    /// Captures a snapshot of `data` taken at `fetched_at_ms`.
    pub fn capture(data: &SheetData, fetched_at_ms: i64) -> Self {
        let rows: Vec<Vec<String>> = data
            .rows
            .iter()
            .map(|row| row.iter().map(|cell| cell.as_str().to_string()).collect())
            .collect();
        let content_hash = content_hash(&data.headers, &rows, &data.formula_rows);
        Self {
            cache_key: data.cache_key(),
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            content_hash,
            headers: data.headers.clone(),
            rows,
            formula_rows: data.formula_rows.clone(),
            merge_ranges: data.merge_ranges.clone(),
            column_validations: data.column_validations.clone(),
            change_token: data.change_token.clone(),
            is_structured_table: data.is_structured_table,
            fetched_at_ms,
            header_row_index: data.header_row_index,
            separator_indices: data.separator_indices.clone(),
        }
    }

    /// Rebuilds the domain model from the stored strings.
    pub fn restore(&self) -> SheetData {
        let (spreadsheet_id, sheet_name) = match self.cache_key.split_once(':') {
            Some((id, name)) => (id.to_string(), name.to_string()),
            None => (self.cache_key.clone(), String::new()),
        };
        SheetData {
            spreadsheet_id,
            sheet_name,
            headers: self.headers.clone(),
            rows: self
                .rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|s| {
                            if s.is_empty() {
                                CellValue::Empty
                            } else {
                                CellValue::Text(s.clone())
                            }
                        })
                        .collect()
                })
                .collect(),
            header_row_index: self.header_row_index,
            separator_indices: self.separator_indices.clone(),
            merge_ranges: self.merge_ranges.clone(),
            formula_rows: self.formula_rows.clone(),
            column_validations: self.column_validations.clone(),
            change_token: self.change_token.clone(),
            is_structured_table: self.is_structured_table,
        }
    }

    /// True iff the cached snapshot can be served without a refetch: the
    /// remote change token still matches and the snapshot is younger than
    /// [`SNAPSHOT_MAX_AGE_MS`].
    pub fn is_fresh(&self, remote_change_token: Option<&str>, now_ms: i64) -> bool {
        match (self.change_token.as_deref(), remote_change_token) {
            (Some(cached), Some(remote)) if cached == remote => {
                now_ms - self.fetched_at_ms < SNAPSHOT_MAX_AGE_MS
            }
            _ => false,
        }
    }
}

/// Stable SHA-256 over headers, data-row values, and formula strings,
/// rendered as lowercase hex.
///
/// Every section carries a tag and a count, every string a length prefix, so
/// content cannot shift between headers, rows, or cells without changing the
/// digest.
pub fn content_hash(
    headers: &[String],
    rows: &[Vec<String>],
    formula_rows: &[Vec<Option<String>>],
) -> String {
    fn eat(hasher: &mut Sha256, s: &str) {
        hasher.update((s.len() as u64).to_le_bytes());
        hasher.update(s.as_bytes());
    }

    let mut hasher = Sha256::new();

    hasher.update([b'H']);
    hasher.update((headers.len() as u64).to_le_bytes());
    for h in headers {
        eat(&mut hasher, h);
    }

    hasher.update([b'R']);
    hasher.update((rows.len() as u64).to_le_bytes());
    for row in rows {
        hasher.update((row.len() as u64).to_le_bytes());
        for cell in row {
            eat(&mut hasher, cell);
        }
    }

    hasher.update([b'F']);
    hasher.update((formula_rows.len() as u64).to_le_bytes());
    for row in formula_rows {
        hasher.update((row.len() as u64).to_le_bytes());
        for cell in row {
            match cell {
                Some(formula) => {
                    hasher.update([b'S']);
                    eat(&mut hasher, formula);
                }
                None => hasher.update([b'Z']),
            }
        }
    }

    format!("{:x}", hasher.finalize())
}
