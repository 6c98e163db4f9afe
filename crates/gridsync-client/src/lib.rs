//! Async spreadsheet client with an offline-first read path, a durable write
//! queue, and optimistic-concurrency conflict detection.
//!
//! The pieces compose around two seams: [`SheetTransport`] hides the remote
//! service, [`gridsync_storage::Storage`] holds snapshots and pending writes.
//! [`SheetClient`] drives reads and writes; [`SyncWorker`] and
//! [`BackgroundSync`] replay queued writes once connectivity returns.

pub mod client;
pub mod conflict;
pub mod error;
pub mod sync;
pub mod transport;

pub use client::{Clock, SheetClient, SystemClock, UpdateOutcome, WriteOutcome};
pub use conflict::{check_conflict, ConflictCheck};
pub use error::{ApiError, ApiResult};
pub use sync::{BackgroundSync, DrainOutcome, DrainReport, DrainScheduler, SyncWorker};
pub use transport::{
    ConnectivityOracle, RemoteSpreadsheet, SheetMetadata, SheetRef, SheetTransport, ValueRender,
};
