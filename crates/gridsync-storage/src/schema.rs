use rusqlite::Connection;

pub(crate) fn init(conn: &Connection) -> rusqlite::Result<()> {
    // Ensure foreign keys are enforced (disabled by default in SQLite).
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.execute_batch(
        r#"
        -- Cached spreadsheet list, replaced wholesale after a successful
        -- remote listing.
        CREATE TABLE IF NOT EXISTS spreadsheets (
          id TEXT PRIMARY KEY,
          name TEXT NOT NULL,
          modified_time TEXT,
          cached_at_ms INTEGER NOT NULL
        );

        -- One row per sheet tab; payload is the versioned JSON snapshot.
        CREATE TABLE IF NOT EXISTS sheet_snapshots (
          cache_key TEXT PRIMARY KEY,
          schema_version INTEGER NOT NULL,
          content_hash TEXT NOT NULL,
          payload JSON NOT NULL,
          change_token TEXT,
          is_structured_table INTEGER NOT NULL DEFAULT 0,
          fetched_at_ms INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_snapshots_fetched_at
          ON sheet_snapshots(fetched_at_ms);

        -- Durable queue of row writes that failed with a transient error.
        CREATE TABLE IF NOT EXISTS pending_mutations (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          kind TEXT NOT NULL CHECK (kind IN ('append','update')),
          spreadsheet_id TEXT NOT NULL,
          sheet_name TEXT NOT NULL,
          row_index INTEGER,
          row_payload JSON NOT NULL,
          created_at_ms INTEGER NOT NULL,
          retry_count INTEGER NOT NULL DEFAULT 0,
          last_error TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_pending_created_at
          ON pending_mutations(created_at_ms);

        -- User column-type overrides. Keyed by spreadsheet, NOT by sheet tab:
        -- an override applies to the same column index on every tab.
        CREATE TABLE IF NOT EXISTS column_overrides (
          spreadsheet_id TEXT NOT NULL,
          column_index INTEGER NOT NULL,
          field_type TEXT NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          PRIMARY KEY (spreadsheet_id, column_index)
        );
        "#,
    )?;

    // Best-effort migrations for databases created before newer columns.
    // SQLite only supports ADD COLUMN migrations, so we opportunistically add
    // missing columns when opening an existing database.
    ensure_snapshot_columns(conn)?;

    Ok(())
}

fn ensure_snapshot_columns(conn: &Connection) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare("PRAGMA table_info(sheet_snapshots)")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    let mut existing = std::collections::HashSet::new();
    for name in rows {
        existing.insert(name?);
    }

    if !existing.contains("change_token") {
        conn.execute("ALTER TABLE sheet_snapshots ADD COLUMN change_token TEXT", [])?;
    }
    if !existing.contains("is_structured_table") {
        conn.execute(
            "ALTER TABLE sheet_snapshots ADD COLUMN is_structured_table INTEGER NOT NULL DEFAULT 0",
            [],
        )?;
    }

    Ok(())
}
