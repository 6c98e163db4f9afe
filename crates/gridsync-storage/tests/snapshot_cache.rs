use gridsync_model::{CellValue, SheetData, SheetSnapshot, SNAPSHOT_SCHEMA_VERSION};
use gridsync_storage::{Storage, SNAPSHOT_PURGE_AGE_MS};
use pretty_assertions::assert_eq;
use rusqlite::params;

fn sample_snapshot(key_suffix: &str, fetched_at_ms: i64) -> SheetSnapshot {
    let data = SheetData {
        spreadsheet_id: format!("ss-{key_suffix}"),
        sheet_name: "Sheet1".into(),
        headers: vec!["Name".into(), "Amount".into()],
        rows: vec![vec![CellValue::from("Alice"), CellValue::from("100")]],
        formula_rows: vec![vec![None, Some("=SUM(B:B)".into())]],
        change_token: Some("T1".into()),
        ..Default::default()
    };
    SheetSnapshot::capture(&data, fetched_at_ms)
}

#[test]
fn put_then_get_round_trips() {
    let storage = Storage::open_in_memory().expect("open storage");
    let snapshot = sample_snapshot("a", 1_000);

    storage.put_snapshot(&snapshot).expect("put snapshot");
    let loaded = storage
        .get_snapshot(&snapshot.cache_key)
        .expect("get snapshot")
        .expect("snapshot present");

    assert_eq!(loaded, snapshot);
}

#[test]
fn put_upserts_by_cache_key() {
    let storage = Storage::open_in_memory().expect("open storage");
    let mut snapshot = sample_snapshot("a", 1_000);
    storage.put_snapshot(&snapshot).expect("put v1");

    snapshot.change_token = Some("T2".into());
    snapshot.fetched_at_ms = 2_000;
    storage.put_snapshot(&snapshot).expect("put v2");

    let loaded = storage
        .get_snapshot(&snapshot.cache_key)
        .expect("get")
        .expect("present");
    assert_eq!(loaded.change_token.as_deref(), Some("T2"));
    assert_eq!(loaded.fetched_at_ms, 2_000);
}

#[test]
fn missing_key_is_none() {
    let storage = Storage::open_in_memory().expect("open storage");
    assert!(storage.get_snapshot("nope:Sheet1").expect("get").is_none());
}

#[test]
fn stale_entries_are_purged_on_write() {
    let storage = Storage::open_in_memory().expect("open storage");
    let old = sample_snapshot("old", 1_000);
    storage.put_snapshot(&old).expect("put old");

    let new = sample_snapshot("new", 1_000 + SNAPSHOT_PURGE_AGE_MS + 1);
    storage.put_snapshot(&new).expect("put new");

    assert!(storage.get_snapshot(&old.cache_key).expect("get").is_none());
    assert!(storage.get_snapshot(&new.cache_key).expect("get").is_some());
}

#[test]
fn corrupt_payload_reads_as_absent() {
    let storage = Storage::open_in_memory().expect("open storage");
    let snapshot = sample_snapshot("a", 1_000);
    storage.put_snapshot(&snapshot).expect("put");

    storage
        .with_connection(|conn| {
            conn.execute(
                "UPDATE sheet_snapshots SET payload = '{\"not\": \"a snapshot\"}' WHERE cache_key = ?1",
                params![&snapshot.cache_key],
            )
        })
        .expect("corrupt row");

    assert!(storage
        .get_snapshot(&snapshot.cache_key)
        .expect("get never errors")
        .is_none());
}

#[test]
fn unknown_schema_version_reads_as_absent() {
    let storage = Storage::open_in_memory().expect("open storage");
    let snapshot = sample_snapshot("a", 1_000);
    storage.put_snapshot(&snapshot).expect("put");

    storage
        .with_connection(|conn| {
            conn.execute(
                "UPDATE sheet_snapshots SET schema_version = ?1 WHERE cache_key = ?2",
                params![SNAPSHOT_SCHEMA_VERSION + 1, &snapshot.cache_key],
            )
        })
        .expect("bump version");

    assert!(storage
        .get_snapshot(&snapshot.cache_key)
        .expect("get never errors")
        .is_none());
}
