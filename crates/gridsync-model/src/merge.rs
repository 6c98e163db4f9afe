use serde::{Deserialize, Serialize};

/// A rectangular merged-cell range with half-open row/column bounds.
///
/// Only the primary (top-left) cell of a merge holds the authoritative value;
/// the remaining cells display the primary's value. Ranges for a sheet are
/// assumed non-overlapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRange {
    pub start_row: usize,
    /// Exclusive.
    pub end_row: usize,
    pub start_col: usize,
    /// Exclusive.
    pub end_col: usize,
}

impl MergeRange {
    pub fn new(start_row: usize, end_row: usize, start_col: usize, end_col: usize) -> Self {
        Self {
            start_row,
            end_row,
            start_col,
            end_col,
        }
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.start_row..self.end_row).contains(&row) && (self.start_col..self.end_col).contains(&col)
    }

    /// True iff `(row, col)` is this range's top-left cell.
    pub fn is_primary(&self, row: usize, col: usize) -> bool {
        row == self.start_row && col == self.start_col
    }

    /// The primary (top-left) cell of this range.
    pub fn primary(&self) -> (usize, usize) {
        (self.start_row, self.start_col)
    }
}

/// First range containing the cell. Linear scan: ranges are few and assumed
/// non-overlapping, so the first match is the only match.
pub fn find_merge(ranges: &[MergeRange], row: usize, col: usize) -> Option<MergeRange> {
    ranges.iter().find(|m| m.contains(row, col)).copied()
}

/// The merge's top-left cell if `(row, col)` is inside a merge, else the input
/// unchanged.
pub fn primary_of(ranges: &[MergeRange], row: usize, col: usize) -> (usize, usize) {
    match find_merge(ranges, row, col) {
        Some(m) => m.primary(),
        None => (row, col),
    }
}

/// True if the cell belongs to a merge but is not its primary cell.
pub fn is_non_primary(ranges: &[MergeRange], row: usize, col: usize) -> bool {
    match find_merge(ranges, row, col) {
        Some(m) => !m.is_primary(row, col),
        None => false,
    }
}
