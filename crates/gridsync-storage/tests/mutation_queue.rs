use gridsync_model::{MutationKind, NewMutation};
use gridsync_storage::{Storage, StorageError};
use pretty_assertions::assert_eq;

#[test]
fn enqueue_assigns_monotonic_ids_and_preserves_order() {
    let storage = Storage::open_in_memory().expect("open storage");

    let first = storage
        .enqueue_mutation(
            &NewMutation::append("ss1", "Sheet1", vec![Some("a".into())]),
            1_000,
        )
        .expect("enqueue first");
    let second = storage
        .enqueue_mutation(
            &NewMutation::update("ss1", "Sheet1", 3, vec![Some("b".into())]),
            2_000,
        )
        .expect("enqueue second");

    assert!(second.id > first.id);

    let pending = storage.pending_mutations().expect("list");
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].id, first.id);
    assert_eq!(pending[0].kind, MutationKind::Append);
    assert_eq!(pending[0].row_index, None);
    assert_eq!(pending[1].kind, MutationKind::Update);
    assert_eq!(pending[1].row_index, Some(3));
    assert_eq!(pending[1].row, vec![Some("b".to_string())]);
}

#[test]
fn failed_replays_are_recorded_but_never_evicted() {
    let storage = Storage::open_in_memory().expect("open storage");
    let entry = storage
        .enqueue_mutation(
            &NewMutation::append("ss1", "Sheet1", vec![Some("a".into()), None]),
            1_000,
        )
        .expect("enqueue");

    for attempt in 1..=5u32 {
        storage
            .record_mutation_failure(entry.id, "503 service unavailable")
            .expect("record failure");
        let pending = storage.pending_mutations().expect("list");
        assert_eq!(pending.len(), 1, "entry must survive failure {attempt}");
        assert_eq!(pending[0].retry_count, attempt);
        assert_eq!(
            pending[0].last_error.as_deref(),
            Some("503 service unavailable")
        );
    }

    // None payload entries survive the JSON round trip.
    let pending = storage.pending_mutations().expect("list");
    assert_eq!(pending[0].row, vec![Some("a".to_string()), None]);
}

#[test]
fn delete_is_the_only_removal_path_and_is_exact() {
    let storage = Storage::open_in_memory().expect("open storage");
    let entry = storage
        .enqueue_mutation(&NewMutation::append("ss1", "", vec![]), 1_000)
        .expect("enqueue");

    storage.delete_mutation(entry.id).expect("delete");
    assert_eq!(storage.pending_count().expect("count"), 0);

    // Deleting again reports the missing id rather than silently succeeding.
    match storage.delete_mutation(entry.id) {
        Err(StorageError::MutationNotFound(id)) => assert_eq!(id, entry.id),
        other => panic!("expected MutationNotFound, got {other:?}"),
    }
}

#[test]
fn drain_order_follows_created_at_not_insertion_id() {
    let storage = Storage::open_in_memory().expect("open storage");
    // Insert out of chronological order (clock skew between devices).
    storage
        .enqueue_mutation(&NewMutation::append("ss1", "s", vec![Some("late".into())]), 5_000)
        .expect("enqueue late");
    storage
        .enqueue_mutation(&NewMutation::append("ss1", "s", vec![Some("early".into())]), 1_000)
        .expect("enqueue early");

    let pending = storage.pending_mutations().expect("list");
    assert_eq!(pending[0].row, vec![Some("early".to_string())]);
    assert_eq!(pending[1].row, vec![Some("late".to_string())]);
}
