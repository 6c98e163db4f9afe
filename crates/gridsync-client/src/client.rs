//! Offline-first sheet client.
//!
//! Reads go through the snapshot cache: fresh cache entries short-circuit the
//! network, offline reads serve whatever is cached, and a transient fetch
//! failure falls back to the last good snapshot. Writes are applied directly
//! when possible and parked in the durable queue when the network is the only
//! thing in the way.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use gridsync_infer::{discover, infer_field_types};
use gridsync_model::{CellValue, FieldType, NewMutation, SheetData, SheetSnapshot};
use gridsync_storage::{CachedSpreadsheet, Storage, StorageError};

use crate::conflict::{check_conflict, ConflictCheck};
use crate::error::{ApiError, ApiResult};
use crate::sync::DrainScheduler;
use crate::transport::{
    ConnectivityOracle, SheetMetadata, SheetRef, SheetTransport, ValueRender,
};

/// How a direct write ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The remote service accepted the write.
    Applied,
    /// The write is parked in the pending queue for background replay.
    Queued,
}

/// How a row update ended up. Conflicts are a decision point for the caller,
/// not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    Queued,
    /// The sheet changed remotely since the row was loaded.
    Conflict(String),
}

/// Wall-clock source, injectable so freshness checks are testable.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_millis() as i64
    }
}

pub struct SheetClient {
    transport: Arc<dyn SheetTransport>,
    connectivity: Arc<dyn ConnectivityOracle>,
    storage: Storage,
    scheduler: Arc<dyn DrainScheduler>,
    clock: Arc<dyn Clock>,
}

impl SheetClient {
    pub fn new(
        transport: Arc<dyn SheetTransport>,
        connectivity: Arc<dyn ConnectivityOracle>,
        storage: Storage,
        scheduler: Arc<dyn DrainScheduler>,
    ) -> Self {
        Self::with_clock(transport, connectivity, storage, scheduler, Arc::new(SystemClock))
    }

    pub fn with_clock(
        transport: Arc<dyn SheetTransport>,
        connectivity: Arc<dyn ConnectivityOracle>,
        storage: Storage,
        scheduler: Arc<dyn DrainScheduler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        SheetClient {
            transport,
            connectivity,
            storage,
            scheduler,
            clock,
        }
    }

    /// Spreadsheets visible to the account, newest listing cached locally.
    ///
    /// A transient listing failure (or being offline) serves the cached list;
    /// only an empty cache turns that into [`ApiError::CacheUnavailable`].
    pub async fn list_spreadsheets(&self) -> ApiResult<Vec<CachedSpreadsheet>> {
        if self.connectivity.is_online() {
            match self.transport.list_spreadsheets().await {
                Ok(remote) => {
                    let mut entries: Vec<CachedSpreadsheet> = remote
                        .into_iter()
                        .map(|s| CachedSpreadsheet {
                            id: s.id,
                            name: s.name,
                            modified_time: s.modified_time,
                        })
                        .collect();
                    entries.sort_by(|a, b| a.name.cmp(&b.name));
                    if let Err(err) =
                        self.storage.replace_spreadsheets(&entries, self.clock.now_ms())
                    {
                        log::warn!("could not cache spreadsheet list: {err}");
                    }
                    return Ok(entries);
                }
                Err(err) if err.is_transient() => {
                    log::warn!("spreadsheet listing failed, trying cache: {err}");
                }
                Err(err) => return Err(err),
            }
        }

        let cached = self.storage.cached_spreadsheets().map_err(storage_error)?;
        if cached.is_empty() {
            Err(ApiError::CacheUnavailable)
        } else {
            Ok(cached)
        }
    }

    /// Load one sheet, preferring the cache whenever it is usable.
    pub async fn load_sheet(&self, sheet: &SheetRef) -> ApiResult<SheetData> {
        let cached = match self.storage.get_snapshot(&sheet.cache_key()) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                log::warn!("snapshot lookup failed for {}: {err}", sheet.cache_key());
                None
            }
        };

        if !self.connectivity.is_online() {
            return match cached {
                Some(snapshot) => Ok(snapshot.restore()),
                None => Err(ApiError::CacheUnavailable),
            };
        }

        // A token fetch failure only disables the freshness shortcut.
        let remote_token = match self.transport.fetch_change_token(&sheet.spreadsheet_id).await {
            Ok(token) => token,
            Err(err) => {
                log::warn!("change token fetch failed for {}: {err}", sheet.spreadsheet_id);
                None
            }
        };

        if let Some(snapshot) = &cached {
            if snapshot.is_fresh(remote_token.as_deref(), self.clock.now_ms()) {
                return Ok(snapshot.restore());
            }
        }

        match self.fetch_and_cache(sheet, remote_token, cached.as_ref()).await {
            Ok(data) => Ok(data),
            Err(err) if err.is_transient() => match cached {
                Some(snapshot) => {
                    log::warn!("fetch failed, serving cached snapshot: {err}");
                    Ok(snapshot.restore())
                }
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }

    async fn fetch_and_cache(
        &self,
        sheet: &SheetRef,
        remote_token: Option<String>,
        cached: Option<&SheetSnapshot>,
    ) -> ApiResult<SheetData> {
        let values = self.transport.fetch_values(sheet, ValueRender::Formatted).await?;
        let raw_formulas = self.transport.fetch_values(sheet, ValueRender::Formula).await?;

        // Metadata is an enrichment; a sheet still loads without it.
        let metadata = match self.transport.fetch_metadata(sheet).await {
            Ok(metadata) => metadata,
            Err(err) => {
                log::warn!("metadata fetch failed for {}: {err}", sheet.cache_key());
                SheetMetadata::default()
            }
        };

        let discovery = discover(&values, &metadata.merge_ranges);
        let formula_rows = formula_rows_below_header(
            &raw_formulas,
            discovery.header_row_index,
            discovery.data_rows.len(),
        );

        let change_token =
            remote_token.or_else(|| cached.and_then(|s| s.change_token.clone()));
        let data = SheetData {
            spreadsheet_id: sheet.spreadsheet_id.clone(),
            sheet_name: sheet.sheet_name.clone(),
            headers: discovery.headers,
            rows: discovery.data_rows,
            header_row_index: discovery.header_row_index,
            separator_indices: discovery.separator_indices,
            merge_ranges: metadata.merge_ranges,
            formula_rows,
            column_validations: metadata.column_validations,
            change_token,
            is_structured_table: metadata.is_structured_table,
        };

        let snapshot = SheetSnapshot::capture(&data, self.clock.now_ms());
        if let Err(err) = self.storage.put_snapshot(&snapshot) {
            log::warn!("could not cache snapshot {}: {err}", snapshot.cache_key);
        }
        Ok(data)
    }

    /// Field types for each column of a loaded sheet, stored overrides
    /// applied first. Inference itself never fails.
    pub fn column_types(&self, data: &SheetData) -> Vec<FieldType> {
        let overrides = match self.storage.overrides_for(&data.spreadsheet_id) {
            Ok(overrides) => overrides,
            Err(err) => {
                log::warn!("could not load overrides for {}: {err}", data.spreadsheet_id);
                Default::default()
            }
        };
        let sample = data.sample_row().unwrap_or(&[]);
        infer_field_types(&data.headers, sample, data.sample_formula_row(), &overrides)
    }

    /// Pin a column to a user-chosen type.
    pub fn set_column_override(
        &self,
        spreadsheet_id: &str,
        column: usize,
        field_type: FieldType,
    ) -> Result<(), StorageError> {
        self.storage
            .set_override(spreadsheet_id, column, field_type, self.clock.now_ms())
    }

    /// Remove a pinned type so inference applies again.
    pub fn clear_column_override(
        &self,
        spreadsheet_id: &str,
        column: usize,
    ) -> Result<(), StorageError> {
        self.storage.clear_override(spreadsheet_id, column)
    }

    /// Append one row. Offline or transiently failing appends are queued.
    pub async fn append_row(
        &self,
        sheet: &SheetRef,
        row: Vec<Option<String>>,
    ) -> ApiResult<WriteOutcome> {
        if !self.connectivity.is_online() {
            self.queue(NewMutation::append(
                &sheet.spreadsheet_id,
                &sheet.sheet_name,
                row,
            ))?;
            return Ok(WriteOutcome::Queued);
        }
        match self.transport.append_row(sheet, &row).await {
            Ok(()) => Ok(WriteOutcome::Applied),
            Err(err) if err.is_transient() => {
                log::warn!("append failed, queuing for replay: {err}");
                self.queue(NewMutation::append(
                    &sheet.spreadsheet_id,
                    &sheet.sheet_name,
                    row,
                ))?;
                Ok(WriteOutcome::Queued)
            }
            Err(err) => Err(err),
        }
    }

    /// Overwrite one row, checking for a remote change first.
    ///
    /// `loaded_token` is the change token of the [`SheetData`] the edit was
    /// made against. Offline updates skip the conflict check (there is no
    /// network to ask) and queue directly.
    pub async fn update_row(
        &self,
        sheet: &SheetRef,
        row_index: usize,
        row: Vec<Option<String>>,
        loaded_token: Option<&str>,
    ) -> ApiResult<UpdateOutcome> {
        if !self.connectivity.is_online() {
            self.queue(NewMutation::update(
                &sheet.spreadsheet_id,
                &sheet.sheet_name,
                row_index,
                row,
            ))?;
            return Ok(UpdateOutcome::Queued);
        }

        if let ConflictCheck::Conflict(message) =
            check_conflict(self.transport.as_ref(), &sheet.spreadsheet_id, loaded_token).await
        {
            return Ok(UpdateOutcome::Conflict(message));
        }

        match self.transport.update_row(sheet, row_index, &row).await {
            Ok(()) => Ok(UpdateOutcome::Applied),
            Err(err) if err.is_transient() => {
                log::warn!("update failed, queuing for replay: {err}");
                self.queue(NewMutation::update(
                    &sheet.spreadsheet_id,
                    &sheet.sheet_name,
                    row_index,
                    row,
                ))?;
                Ok(UpdateOutcome::Queued)
            }
            Err(err) => Err(err),
        }
    }

    /// Queue depth, for surfacing "N edits waiting to sync" in a UI.
    pub fn pending_count(&self) -> Result<u64, StorageError> {
        self.storage.pending_count()
    }

    fn queue(&self, mutation: NewMutation) -> ApiResult<()> {
        self.storage
            .enqueue_mutation(&mutation, self.clock.now_ms())
            .map_err(storage_error)?;
        self.scheduler.request_drain();
        Ok(())
    }
}

/// Formula strings for the rows below the header, aligned with discovered
/// data rows. Only cells whose raw input starts with `=` are kept.
fn formula_rows_below_header(
    raw_formulas: &[Vec<CellValue>],
    header_row_index: usize,
    data_row_count: usize,
) -> Vec<Vec<Option<String>>> {
    (0..data_row_count)
        .map(|i| {
            let sheet_row = header_row_index + 1 + i;
            raw_formulas
                .get(sheet_row)
                .map(|row| {
                    row.iter()
                        .map(|cell| {
                            let raw = cell.as_trimmed();
                            if raw.starts_with('=') {
                                Some(raw.to_string())
                            } else {
                                None
                            }
                        })
                        .collect()
                })
                .unwrap_or_default()
        })
        .collect()
}

fn storage_error(err: StorageError) -> ApiError {
    ApiError::Fatal {
        status: None,
        message: format!("local storage failure: {err}"),
    }
}
