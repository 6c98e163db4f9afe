//! SQLite-backed storage for gridsync.
//!
//! This crate is intentionally self-contained so it can sit behind the async
//! client without knowing anything about transports. It exposes:
//! - SQLite schema creation/migration
//! - The sheet-snapshot cache (versioned JSON payloads, age-based purge)
//! - The durable pending-mutation queue (insertion-ordered, never evicted)
//! - Column type overrides keyed by (spreadsheet, column)
//! - The cached spreadsheet list
//!
//! Reads of corrupt or out-of-version cached rows are reported as absence,
//! never as errors; a refetch repairs the cache.

mod schema;
pub mod storage;

pub use storage::{CachedSpreadsheet, Storage, StorageError, SNAPSHOT_PURGE_AGE_MS};
