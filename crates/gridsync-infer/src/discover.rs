use gridsync_model::{column_letter, primary_of, CellValue, MergeRange};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Only the first rows of a sheet are scanned for the header; real headers in
/// professional sheets sit below at most a few title/logo rows.
pub const MAX_SCAN_ROWS: usize = 10;

/// A row needs at least this many non-empty cells to be a header candidate.
const MIN_HEADER_DENSITY: usize = 3;

/// Rows with at most this many non-empty cells may be visual separators.
const SEPARATOR_MAX_FILL: usize = 2;

/// Result of header/structure discovery over a raw fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Discovery {
    /// 0-based row index of the header row in the sheet.
    pub header_row_index: usize,
    /// Resolved header labels; merged header cells repeat the primary's label,
    /// blanks become `Untitled Column {letter}`.
    pub headers: Vec<String>,
    /// Rows below the header, in original order, separators included.
    pub data_rows: Vec<Vec<CellValue>>,
    /// Indices into `data_rows` that are separator rows.
    pub separator_indices: BTreeSet<usize>,
    /// `max(header width, widest data row)`; `headers` is expanded to this.
    pub max_column_count: usize,
}

/// Locates the header row and splits headers from data.
///
/// Deterministic and total: identical input always yields the identical
/// result, and malformed input degrades to a single default column rather
/// than failing.
pub fn discover(raw_rows: &[Vec<CellValue>], merge_ranges: &[MergeRange]) -> Discovery {
    if raw_rows.is_empty() {
        return Discovery {
            header_row_index: 0,
            headers: vec!["Column A".to_string()],
            data_rows: Vec::new(),
            separator_indices: BTreeSet::new(),
            max_column_count: 1,
        };
    }

    let resolved = resolve_merged_cell_values(raw_rows, merge_ranges);
    let scan_rows = &resolved[..resolved.len().min(MAX_SCAN_ROWS)];

    let header_row_index = find_header_row(scan_rows);
    let separator_sheet_indices = identify_separator_rows(scan_rows, header_row_index);
    let header_cells = extract_headers_with_merges(scan_rows, merge_ranges, header_row_index);
    let (data_rows, separator_indices) =
        extract_data_rows(&resolved, header_row_index, &separator_sheet_indices);
    let max_column_count = header_cells
        .len()
        .max(data_rows.iter().map(Vec::len).max().unwrap_or(0));
    let headers = expand_headers(&header_cells, max_column_count);

    Discovery {
        header_row_index,
        headers,
        data_rows,
        separator_indices,
        max_column_count,
    }
}

fn density(row: &[CellValue]) -> usize {
    row.iter().filter(|c| !c.is_blank()).count()
}

/// Scores each scanned row for header candidacy.
///
/// Density is the primary signal (headers fill most columns, title rows one
/// or two); type continuity rewards a text row directly above a row of
/// numbers/dates, the "label row followed by data row" pattern.
fn find_header_row(rows: &[Vec<CellValue>]) -> usize {
    if rows.len() <= 1 {
        return 0;
    }

    let densities: Vec<usize> = rows.iter().map(|r| density(r)).collect();
    let continuity: Vec<usize> = rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let Some(next) = rows.get(idx + 1) else {
                return 0;
            };
            row.iter()
                .zip(next.iter())
                .filter(|(cell, below)| {
                    cell_class(cell.as_trimmed()) == CellClass::Text
                        && matches!(
                            cell_class(below.as_trimmed()),
                            CellClass::Number
                                | CellClass::Date
                                | CellClass::Currency
                                | CellClass::Boolean
                        )
                })
                .count()
        })
        .collect();

    let mut best_row = 0;
    let mut best_score: i64 = -1;

    for i in 0..rows.len() {
        let density = densities[i];
        // Skip separator-like rows, but never row 0.
        if density <= SEPARATOR_MAX_FILL && i > 0 {
            continue;
        }
        let score = (density * 2 + continuity[i]) as i64;
        if score > best_score && density >= MIN_HEADER_DENSITY {
            best_score = score;
            best_row = i;
        }
    }

    if best_score < 0 {
        // Fallback: first row with any content at all.
        for (i, d) in densities.iter().enumerate() {
            if *d >= 1 {
                return i;
            }
        }
    }
    best_row
}

/// Sheet-level indices (within the scan window) of near-empty rows that span
/// more than two columns: visual dividers, not real data.
fn identify_separator_rows(rows: &[Vec<CellValue>], header_row_index: usize) -> BTreeSet<usize> {
    rows.iter()
        .enumerate()
        .filter(|(i, row)| {
            *i != header_row_index && density(row) <= SEPARATOR_MAX_FILL && row.len() > 2
        })
        .map(|(i, _)| i)
        .collect()
}

fn extract_headers_with_merges(
    rows: &[Vec<CellValue>],
    merge_ranges: &[MergeRange],
    header_row_index: usize,
) -> Vec<String> {
    let Some(header_row) = rows.get(header_row_index) else {
        return vec!["Column A".to_string()];
    };
    let max_col = rows.iter().map(Vec::len).max().unwrap_or(1);

    (0..max_col)
        .map(|col| {
            let cell = header_row
                .get(col)
                .map(|c| c.as_trimmed())
                .unwrap_or_default();
            if !cell.is_empty() {
                return cell.to_string();
            }
            // Blank header cell: try the merge primary's value before giving up.
            let (pr, pc) = primary_of(merge_ranges, header_row_index, col);
            rows.get(pr)
                .and_then(|r| r.get(pc))
                .map(|c| c.as_trimmed().to_string())
                .unwrap_or_default()
        })
        .collect()
}

fn expand_headers(header_cells: &[String], max_cols: usize) -> Vec<String> {
    (0..max_cols)
        .map(|i| {
            let h = header_cells.get(i).map(|s| s.trim()).unwrap_or_default();
            if h.is_empty() {
                format!("Untitled Column {}", column_letter(i))
            } else {
                h.to_string()
            }
        })
        .collect()
}

fn extract_data_rows(
    resolved: &[Vec<CellValue>],
    header_row_index: usize,
    separator_sheet_indices: &BTreeSet<usize>,
) -> (Vec<Vec<CellValue>>, BTreeSet<usize>) {
    let mut data_rows = Vec::new();
    let mut separators_in_data = BTreeSet::new();

    for (i, row) in resolved.iter().enumerate().skip(header_row_index + 1) {
        if separator_sheet_indices.contains(&i) {
            separators_in_data.insert(data_rows.len());
        }
        data_rows.push(row.clone());
    }
    (data_rows, separators_in_data)
}

/// Read-time merge fill: an empty cell in a non-primary merge position takes
/// the primary cell's raw value. Storage is unaffected.
fn resolve_merged_cell_values(
    raw_rows: &[Vec<CellValue>],
    merge_ranges: &[MergeRange],
) -> Vec<Vec<CellValue>> {
    if merge_ranges.is_empty() {
        return raw_rows.to_vec();
    }
    raw_rows
        .iter()
        .enumerate()
        .map(|(row_idx, row)| {
            row.iter()
                .enumerate()
                .map(|(col_idx, cell)| {
                    if !cell.is_blank() {
                        return cell.clone();
                    }
                    let (pr, pc) = primary_of(merge_ranges, row_idx, col_idx);
                    if (pr, pc) != (row_idx, col_idx) {
                        raw_rows
                            .get(pr)
                            .and_then(|r| r.get(pc))
                            .cloned()
                            .unwrap_or_else(|| cell.clone())
                    } else {
                        cell.clone()
                    }
                })
                .collect()
        })
        .collect()
}

/// Rough per-cell type classes used for header-row scoring.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CellClass {
    Empty,
    Boolean,
    Number,
    Date,
    Currency,
    Text,
}

fn cell_class(s: &str) -> CellClass {
    if s.is_empty() {
        return CellClass::Empty;
    }
    let lower = s.to_lowercase();
    if matches!(lower.as_str(), "true" | "false" | "yes" | "no" | "1" | "0") {
        return CellClass::Boolean;
    }

    static NUMBER_RE: OnceLock<Regex> = OnceLock::new();
    static ISO_DATE_RE: OnceLock<Regex> = OnceLock::new();
    static SLASH_DATE_RE: OnceLock<Regex> = OnceLock::new();
    static CURRENCY_RE: OnceLock<Regex> = OnceLock::new();

    let number = NUMBER_RE.get_or_init(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("valid regex"));
    if number.is_match(s) {
        return CellClass::Number;
    }

    let iso = ISO_DATE_RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").expect("valid regex"));
    let slash =
        SLASH_DATE_RE.get_or_init(|| Regex::new(r"\d{1,2}/\d{1,2}/\d{2,4}").expect("valid regex"));
    if iso.is_match(s) || slash.is_match(s) {
        return CellClass::Date;
    }

    let currency =
        CURRENCY_RE.get_or_init(|| Regex::new(r"^[$€£¥₹]?\s*-?\d").expect("valid regex"));
    if currency.is_match(s) {
        return CellClass::Currency;
    }
    CellClass::Text
}
