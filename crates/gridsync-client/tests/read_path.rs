mod common;

use common::{grid, Harness};
use gridsync_client::{ApiError, SheetRef};
use gridsync_model::CellValue;
use pretty_assertions::assert_eq;
use std::sync::atomic::Ordering;

fn budget_sheet() -> SheetRef {
    SheetRef::new("ss-1", "Budget")
}

fn seed_remote(h: &Harness) {
    h.transport.set_grid(grid(&[
        &["Name", "Amount"],
        &["Alice", "100"],
        &["Bob", "250"],
    ]));
    h.transport.set_token(Some("T1"));
}

#[tokio::test]
async fn online_load_discovers_headers_and_caches_snapshot() {
    let h = Harness::online();
    seed_remote(&h);

    let data = h.client.load_sheet(&budget_sheet()).await.expect("load");

    assert_eq!(data.headers, vec!["Name".to_string(), "Amount".to_string()]);
    assert_eq!(data.rows.len(), 2);
    assert_eq!(data.rows[0][0], CellValue::from("Alice"));
    assert_eq!(data.header_row_index, 0);
    assert_eq!(data.change_token.as_deref(), Some("T1"));

    let snapshot = h
        .storage
        .get_snapshot("ss-1:Budget")
        .expect("cache lookup")
        .expect("snapshot written");
    assert_eq!(snapshot.headers, data.headers);
}

#[tokio::test]
async fn fresh_snapshot_short_circuits_the_value_fetch() {
    let h = Harness::online();
    seed_remote(&h);

    let first = h.client.load_sheet(&budget_sheet()).await.expect("load");
    let fetches_after_first = h.transport.value_fetches.load(Ordering::SeqCst);

    // Same token, well inside the max age: no second grid download.
    let second = h.client.load_sheet(&budget_sheet()).await.expect("reload");
    assert_eq!(
        h.transport.value_fetches.load(Ordering::SeqCst),
        fetches_after_first
    );
    assert_eq!(second, first);
}

#[tokio::test]
async fn changed_token_forces_a_refetch() {
    let h = Harness::online();
    seed_remote(&h);
    h.client.load_sheet(&budget_sheet()).await.expect("load");

    h.transport.set_token(Some("T2"));
    h.transport
        .set_grid(grid(&[&["Name", "Amount"], &["Carol", "7"]]));

    let data = h.client.load_sheet(&budget_sheet()).await.expect("reload");
    assert_eq!(data.rows.len(), 1);
    assert_eq!(data.rows[0][0], CellValue::from("Carol"));
    assert_eq!(data.change_token.as_deref(), Some("T2"));
}

#[tokio::test]
async fn offline_read_serves_the_cached_snapshot() {
    let h = Harness::online();
    seed_remote(&h);
    let online_copy = h.client.load_sheet(&budget_sheet()).await.expect("load");

    h.network.set_online(false);
    // Remote changes are invisible while offline.
    h.transport.set_grid(grid(&[&["totally", "different"]]));

    let offline_copy = h.client.load_sheet(&budget_sheet()).await.expect("offline load");
    assert_eq!(offline_copy, online_copy);
}

#[tokio::test]
async fn offline_read_without_cache_is_cache_unavailable() {
    let h = Harness::offline();
    let err = h.client.load_sheet(&budget_sheet()).await.unwrap_err();
    assert_eq!(err, ApiError::CacheUnavailable);
}

#[tokio::test]
async fn transient_fetch_failure_falls_back_to_the_cache() {
    let h = Harness::online();
    seed_remote(&h);
    let cached_copy = h.client.load_sheet(&budget_sheet()).await.expect("load");

    // Token moved on, so the cache is stale and a refetch is attempted.
    h.transport.set_token(Some("T2"));
    h.transport
        .fail_next_value_fetch(ApiError::io("connection reset"));

    let data = h.client.load_sheet(&budget_sheet()).await.expect("fallback");
    assert_eq!(data, cached_copy);
}

#[tokio::test]
async fn transient_fetch_failure_without_cache_surfaces() {
    let h = Harness::online();
    seed_remote(&h);
    h.transport
        .fail_next_value_fetch(ApiError::io("connection reset"));

    let err = h.client.load_sheet(&budget_sheet()).await.unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn permission_errors_surface_even_with_a_cache() {
    let h = Harness::online();
    seed_remote(&h);
    h.client.load_sheet(&budget_sheet()).await.expect("load");

    h.transport.set_token(Some("T2"));
    h.transport
        .fail_next_value_fetch(ApiError::from_status(403, "forbidden"));

    let err = h.client.load_sheet(&budget_sheet()).await.unwrap_err();
    assert_eq!(err, ApiError::PermissionDenied);
}

#[tokio::test]
async fn expired_snapshot_is_refetched_despite_matching_token() {
    let h = Harness::online();
    seed_remote(&h);
    h.client.load_sheet(&budget_sheet()).await.expect("load");
    let fetches_after_first = h.transport.value_fetches.load(Ordering::SeqCst);

    // Past the freshness window the matching token no longer helps.
    h.clock.advance(gridsync_model::SNAPSHOT_MAX_AGE_MS + 1);
    h.client.load_sheet(&budget_sheet()).await.expect("reload");
    assert!(h.transport.value_fetches.load(Ordering::SeqCst) > fetches_after_first);
}

#[tokio::test]
async fn formula_cells_are_captured_per_data_row() {
    let h = Harness::online();
    h.transport.set_grid(grid(&[
        &["Item", "Total"],
        &["Widgets", "340"],
    ]));
    *h.transport.formulas.lock().expect("mock mutex") = grid(&[
        &["Item", "Total"],
        &["Widgets", "=SUM(B2:B9)"],
    ]);
    h.transport.set_token(Some("T1"));

    let data = h.client.load_sheet(&budget_sheet()).await.expect("load");
    assert_eq!(
        data.formula_rows,
        vec![vec![None, Some("=SUM(B2:B9)".to_string())]]
    );
}
