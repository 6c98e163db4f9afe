//! Background replay of queued writes.
//!
//! [`SyncWorker`] drains the durable mutation queue in creation order.
//! [`BackgroundSync`] wraps a worker in a tokio task that waits for drain
//! requests, gates them on connectivity, and deduplicates requests so that a
//! burst of queued writes schedules exactly one drain.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gridsync_storage::Storage;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::transport::{ConnectivityOracle, SheetRef, SheetTransport};

/// What one drain pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Mutations applied remotely and removed from the queue.
    pub applied: usize,
    /// Mutations that failed this pass and stay queued.
    pub failed: usize,
    /// Queue depth after the pass.
    pub remaining: usize,
}

/// Overall result of a drain pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The queue was empty; nothing to do.
    Idle,
    /// At least one mutation was applied this pass.
    Applied,
    /// Nothing was applied and entries remain.
    Retry,
}

impl DrainReport {
    pub fn outcome(&self) -> DrainOutcome {
        if self.applied > 0 {
            DrainOutcome::Applied
        } else if self.remaining > 0 {
            DrainOutcome::Retry
        } else {
            DrainOutcome::Idle
        }
    }

    /// A pass that left work behind should be retried later, even when it
    /// also applied some entries.
    pub fn needs_retry(&self) -> bool {
        self.remaining > 0
    }
}

/// Replays pending mutations against the remote service.
pub struct SyncWorker {
    storage: Storage,
    transport: Arc<dyn SheetTransport>,
}

impl SyncWorker {
    pub fn new(storage: Storage, transport: Arc<dyn SheetTransport>) -> Self {
        SyncWorker { storage, transport }
    }

    /// Replay every queued mutation once, oldest first.
    ///
    /// Each entry is removed only after the remote write succeeds; a failure
    /// is recorded on the entry and the pass moves on to the next one, so a
    /// poison entry cannot starve the rest of the queue. An entry is never
    /// dropped for failing too often.
    pub async fn drain_once(&self) -> DrainReport {
        let pending = match self.storage.pending_mutations() {
            Ok(pending) => pending,
            Err(err) => {
                log::warn!("drain skipped, could not read pending queue: {err}");
                return DrainReport::default();
            }
        };

        let mut report = DrainReport::default();
        for entry in pending {
            let sheet = SheetRef::new(&entry.spreadsheet_id, &entry.sheet_name);
            let result = match entry.kind {
                gridsync_model::MutationKind::Append => {
                    self.transport.append_row(&sheet, &entry.row).await
                }
                gridsync_model::MutationKind::Update => match entry.row_index {
                    Some(row_index) => {
                        self.transport.update_row(&sheet, row_index, &entry.row).await
                    }
                    None => {
                        // An update without a target row can never be applied.
                        log::warn!("pending update {} has no row index", entry.id);
                        Err(crate::error::ApiError::Fatal {
                            status: None,
                            message: "queued update is missing its row index".into(),
                        })
                    }
                },
            };

            match result {
                Ok(()) => {
                    if let Err(err) = self.storage.delete_mutation(entry.id) {
                        log::warn!("applied mutation {} but could not dequeue it: {err}", entry.id);
                        report.failed += 1;
                    } else {
                        report.applied += 1;
                    }
                }
                Err(err) => {
                    log::warn!("replay of mutation {} failed: {err}", entry.id);
                    if let Err(record_err) =
                        self.storage.record_mutation_failure(entry.id, &err.to_string())
                    {
                        log::warn!("could not record failure for {}: {record_err}", entry.id);
                    }
                    report.failed += 1;
                }
            }
        }

        report.remaining = match self.storage.pending_count() {
            Ok(count) => count as usize,
            Err(err) => {
                log::warn!("could not count remaining queue entries: {err}");
                report.failed
            }
        };
        report
    }
}

/// Hands drain requests to whatever runs them. The client only needs this
/// much of the scheduler; tests substitute a recorder.
pub trait DrainScheduler: Send + Sync {
    /// Request a drain. Returns false when one is already scheduled and the
    /// request was coalesced into it.
    fn request_drain(&self) -> bool;
}

/// Connectivity-gated drain loop with at-most-one scheduled drain.
pub struct BackgroundSync {
    scheduled: AtomicBool,
    notify: Notify,
    offline_poll: Duration,
}

impl BackgroundSync {
    pub fn new() -> Arc<Self> {
        Arc::new(BackgroundSync {
            scheduled: AtomicBool::new(false),
            notify: Notify::new(),
            offline_poll: Duration::from_secs(5),
        })
    }

    /// Start the drain loop on the current runtime.
    ///
    /// The loop sleeps until a drain is requested, waits for connectivity,
    /// runs one pass, and reschedules itself when entries remain.
    pub fn run(
        self: &Arc<Self>,
        worker: SyncWorker,
        connectivity: Arc<dyn ConnectivityOracle>,
        retry_delay: Duration,
    ) -> JoinHandle<()> {
        let sync = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                sync.notify.notified().await;
                sync.scheduled.store(false, Ordering::SeqCst);

                while !connectivity.is_online() {
                    tokio::time::sleep(sync.offline_poll).await;
                }

                let report = worker.drain_once().await;
                log::info!(
                    "drain pass: {} applied, {} failed, {} remaining",
                    report.applied,
                    report.failed,
                    report.remaining
                );
                if report.needs_retry() {
                    tokio::time::sleep(retry_delay).await;
                    sync.request_drain();
                }
            }
        })
    }
}

impl DrainScheduler for BackgroundSync {
    fn request_drain(&self) -> bool {
        if self.scheduled.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.notify.notify_one();
        true
    }
}
