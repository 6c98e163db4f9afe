//! `gridsync-model` defines the core data structures shared across the
//! gridsync crates.
//!
//! The crate is intentionally self-contained so it can be reused by:
//! - structure discovery and column type inference (`gridsync-infer`)
//! - the SQLite cache/queue layer (`gridsync-storage`)
//! - the async client orchestration (`gridsync-client`)
//!
//! All types that cross a storage boundary derive `serde` with explicit,
//! JSON-stable layouts.

mod column;
mod field_type;
mod merge;
mod mutation;
mod sheet;
mod snapshot;
mod validation;
mod value;

pub use column::column_letter;
pub use field_type::{FieldType, ParseFieldTypeError};
pub use merge::{find_merge, is_non_primary, primary_of, MergeRange};
pub use mutation::{MutationKind, NewMutation, PendingMutation};
pub use sheet::SheetData;
pub use snapshot::{content_hash, SheetSnapshot, SNAPSHOT_MAX_AGE_MS, SNAPSHOT_SCHEMA_VERSION};
pub use validation::ValidationRule;
pub use value::CellValue;
