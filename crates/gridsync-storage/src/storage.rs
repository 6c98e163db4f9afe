use crate::schema;
use gridsync_model::{
    FieldType, MutationKind, NewMutation, PendingMutation, SheetSnapshot, SNAPSHOT_SCHEMA_VERSION,
};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

/// Snapshots older than this are purged opportunistically on every write
/// (24 hours).
pub const SNAPSHOT_PURGE_AGE_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("pending mutation not found: {0}")]
    MutationNotFound(i64),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// An entry of the cached spreadsheet list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedSpreadsheet {
    pub id: String,
    pub name: String,
    pub modified_time: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Storage {
    conn: Arc<Mutex<Connection>>,
}

impl Storage {
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        schema::init(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.busy_timeout(Duration::from_secs(5))?;
        schema::init(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_uri(uri: &str) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI;
        let conn = Connection::open_with_flags(uri, flags)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        schema::init(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // ── Sheet snapshot cache ────────────────────────────────────────────

    /// Upserts a snapshot by cache key and opportunistically purges entries
    /// older than [`SNAPSHOT_PURGE_AGE_MS`] relative to the new snapshot's
    /// fetch time.
    pub fn put_snapshot(&self, snapshot: &SheetSnapshot) -> Result<()> {
        let payload = serde_json::to_value(snapshot)?;
        let conn = self.conn.lock().expect("storage mutex poisoned");
        conn.execute(
            "DELETE FROM sheet_snapshots WHERE fetched_at_ms < ?1",
            params![snapshot.fetched_at_ms - SNAPSHOT_PURGE_AGE_MS],
        )?;
        conn.execute(
            r#"
            INSERT INTO sheet_snapshots (
              cache_key, schema_version, content_hash, payload,
              change_token, is_structured_table, fetched_at_ms
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(cache_key) DO UPDATE SET
              schema_version = excluded.schema_version,
              content_hash = excluded.content_hash,
              payload = excluded.payload,
              change_token = excluded.change_token,
              is_structured_table = excluded.is_structured_table,
              fetched_at_ms = excluded.fetched_at_ms
            "#,
            params![
                &snapshot.cache_key,
                snapshot.schema_version,
                &snapshot.content_hash,
                payload,
                snapshot.change_token.as_deref(),
                snapshot.is_structured_table,
                snapshot.fetched_at_ms
            ],
        )?;
        Ok(())
    }

    /// Looks up a snapshot by cache key.
    ///
    /// A corrupt payload or an unknown schema version is a cache miss, not an
    /// error: the caller refetches and the next `put_snapshot` repairs the row.
    pub fn get_snapshot(&self, cache_key: &str) -> Result<Option<SheetSnapshot>> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        let row: Option<(u32, serde_json::Value)> = conn
            .query_row(
                "SELECT schema_version, payload FROM sheet_snapshots WHERE cache_key = ?1",
                params![cache_key],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;

        let Some((version, payload)) = row else {
            return Ok(None);
        };
        if version != SNAPSHOT_SCHEMA_VERSION {
            log::warn!(
                "snapshot {cache_key} has schema version {version}, expected {SNAPSHOT_SCHEMA_VERSION}; treating as absent"
            );
            return Ok(None);
        }
        match serde_json::from_value::<SheetSnapshot>(payload) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(err) => {
                log::warn!("snapshot {cache_key} failed to deserialize: {err}; treating as absent");
                Ok(None)
            }
        }
    }

    pub fn delete_snapshot(&self, cache_key: &str) -> Result<()> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        conn.execute(
            "DELETE FROM sheet_snapshots WHERE cache_key = ?1",
            params![cache_key],
        )?;
        Ok(())
    }

    // ── Pending mutation queue ──────────────────────────────────────────

    /// Appends a mutation to the durable queue and returns it with its
    /// assigned id.
    pub fn enqueue_mutation(&self, mutation: &NewMutation, now_ms: i64) -> Result<PendingMutation> {
        let payload = serde_json::to_value(&mutation.row)?;
        let conn = self.conn.lock().expect("storage mutex poisoned");
        conn.execute(
            r#"
            INSERT INTO pending_mutations (
              kind, spreadsheet_id, sheet_name, row_index, row_payload, created_at_ms
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                mutation.kind.as_str(),
                &mutation.spreadsheet_id,
                &mutation.sheet_name,
                mutation.row_index.map(|i| i as i64),
                payload,
                now_ms
            ],
        )?;
        let id = conn.last_insert_rowid();
        Ok(PendingMutation {
            id,
            kind: mutation.kind,
            spreadsheet_id: mutation.spreadsheet_id.clone(),
            sheet_name: mutation.sheet_name.clone(),
            row_index: mutation.row_index,
            row: mutation.row.clone(),
            created_at_ms: now_ms,
            retry_count: 0,
            last_error: None,
        })
    }

    /// All pending mutations in `created_at` (insertion) order.
    pub fn pending_mutations(&self) -> Result<Vec<PendingMutation>> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        let mut stmt = conn.prepare(
            r#"
            SELECT id, kind, spreadsheet_id, sheet_name, row_index,
                   row_payload, created_at_ms, retry_count, last_error
            FROM pending_mutations
            ORDER BY created_at_ms, id
            "#,
        )?;
        let rows = stmt.query_map([], |r| {
            let kind: String = r.get(1)?;
            let payload: serde_json::Value = r.get(5)?;
            let row_index: Option<i64> = r.get(4)?;
            Ok((
                r.get::<_, i64>(0)?,
                kind,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                row_index,
                payload,
                r.get::<_, i64>(6)?,
                r.get::<_, u32>(7)?,
                r.get::<_, Option<String>>(8)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, kind, spreadsheet_id, sheet_name, row_index, payload, created_at_ms, retry_count, last_error) =
                row?;
            let kind: MutationKind = match kind.parse() {
                Ok(kind) => kind,
                Err(_) => {
                    log::warn!("pending mutation {id} has unknown kind {kind:?}; skipping");
                    continue;
                }
            };
            let row_payload: Vec<Option<String>> = serde_json::from_value(payload)?;
            out.push(PendingMutation {
                id,
                kind,
                spreadsheet_id,
                sheet_name,
                row_index: row_index.map(|i| i as usize),
                row: row_payload,
                created_at_ms,
                retry_count,
                last_error,
            });
        }
        Ok(out)
    }

    /// Removes a mutation after its remote replay succeeded. This is the only
    /// delete path for queue entries.
    pub fn delete_mutation(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        let affected = conn.execute("DELETE FROM pending_mutations WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(StorageError::MutationNotFound(id));
        }
        Ok(())
    }

    /// Records a failed replay: bumps `retry_count` and stores the error.
    /// The entry stays in the queue.
    pub fn record_mutation_failure(&self, id: i64, error: &str) -> Result<()> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        let affected = conn.execute(
            "UPDATE pending_mutations SET retry_count = retry_count + 1, last_error = ?2 WHERE id = ?1",
            params![id, error],
        )?;
        if affected == 0 {
            return Err(StorageError::MutationNotFound(id));
        }
        Ok(())
    }

    pub fn pending_count(&self) -> Result<u64> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        let count: u64 =
            conn.query_row("SELECT COUNT(*) FROM pending_mutations", [], |r| r.get(0))?;
        Ok(count)
    }

    // ── Column overrides ────────────────────────────────────────────────

    /// Upserts a user column-type override. Overrides are spreadsheet-scoped:
    /// they apply to the same column index on every tab of the spreadsheet.
    pub fn set_override(
        &self,
        spreadsheet_id: &str,
        column_index: usize,
        field_type: FieldType,
        now_ms: i64,
    ) -> Result<()> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        conn.execute(
            r#"
            INSERT INTO column_overrides (spreadsheet_id, column_index, field_type, updated_at_ms)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(spreadsheet_id, column_index) DO UPDATE SET
              field_type = excluded.field_type,
              updated_at_ms = excluded.updated_at_ms
            "#,
            params![spreadsheet_id, column_index as i64, field_type.as_str(), now_ms],
        )?;
        Ok(())
    }

    /// All overrides for a spreadsheet, keyed by column index. Rows with an
    /// unknown stored type are skipped.
    pub fn overrides_for(&self, spreadsheet_id: &str) -> Result<BTreeMap<usize, FieldType>> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT column_index, field_type FROM column_overrides WHERE spreadsheet_id = ?1",
        )?;
        let rows = stmt.query_map(params![spreadsheet_id], |r| {
            Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?))
        })?;

        let mut out = BTreeMap::new();
        for row in rows {
            let (col, ty) = row?;
            match ty.parse::<FieldType>() {
                Ok(ty) => {
                    out.insert(col as usize, ty);
                }
                Err(_) => {
                    log::warn!("override for {spreadsheet_id} column {col} has unknown type {ty:?}; skipping");
                }
            }
        }
        Ok(out)
    }

    pub fn clear_override(&self, spreadsheet_id: &str, column_index: usize) -> Result<()> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        conn.execute(
            "DELETE FROM column_overrides WHERE spreadsheet_id = ?1 AND column_index = ?2",
            params![spreadsheet_id, column_index as i64],
        )?;
        Ok(())
    }

    // ── Cached spreadsheet list ─────────────────────────────────────────

    /// Replaces the cached spreadsheet list wholesale after a successful
    /// remote listing.
    pub fn replace_spreadsheets(&self, entries: &[CachedSpreadsheet], now_ms: i64) -> Result<()> {
        let mut conn = self.conn.lock().expect("storage mutex poisoned");
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM spreadsheets", [])?;
        for entry in entries {
            tx.execute(
                "INSERT INTO spreadsheets (id, name, modified_time, cached_at_ms) VALUES (?1, ?2, ?3, ?4)",
                params![&entry.id, &entry.name, entry.modified_time.as_deref(), now_ms],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn cached_spreadsheets(&self) -> Result<Vec<CachedSpreadsheet>> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        let mut stmt =
            conn.prepare("SELECT id, name, modified_time FROM spreadsheets ORDER BY name")?;
        let rows = stmt.query_map([], |r| {
            Ok(CachedSpreadsheet {
                id: r.get(0)?,
                name: r.get(1)?,
                modified_time: r.get(2)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn delete_spreadsheet(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        conn.execute("DELETE FROM spreadsheets WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Raw connection access for tests that need to corrupt stored rows.
    #[doc(hidden)]
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        Ok(f(&conn)?)
    }
}
