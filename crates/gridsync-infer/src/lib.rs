//! `gridsync-infer` turns loosely structured, human-authored rows into a
//! typed table shape.
//!
//! Two stages, both pure and total (they never fail; malformed input degrades
//! to defaults):
//! - [`discover`]: locate the header row among title/logo/separator rows,
//!   resolve merged-cell topology, and split header from data rows.
//! - [`infer_field_types`]: assign one [`FieldType`](gridsync_model::FieldType)
//!   per column from header text, a sample row, formula cells, and user
//!   overrides.

mod discover;
mod infer;

pub use discover::{discover, Discovery, MAX_SCAN_ROWS};
pub use infer::infer_field_types;
