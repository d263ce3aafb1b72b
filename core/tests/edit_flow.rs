//! End-to-end edit flow tests for tabula-core
//!
//! These wire the session, cache, and filter pipeline together the way a
//! view coordinator does, and walk the full inline-edit scenarios:
//! create, edit, cancel, gateway failure, and point reconciliation.

use std::sync::Arc;
use tabula_core::{
    Anchor, CommitOutcome, Direction, EditSession, FieldDef, FieldType, FieldValue,
    FilterPipeline, GatewayError, InsertPosition, Predicate, Record, RecordCache,
    RecordDescriptor, ResolveOutcome, SortKey, SortSpec, Status, ValidationRules, DRAFT_ID,
};

const KEY: &str = "2024-05-01";

fn expense_descriptor() -> Arc<RecordDescriptor> {
    Arc::new(
        RecordDescriptor::new(
            "expense",
            vec![
                FieldDef::required("label", FieldType::Text),
                FieldDef::required("amount", FieldType::Number),
            ],
            vec![Status::new("PENDING"), Status::new("PAID")],
            Status::new("PENDING"),
        )
        .unwrap()
        .with_transition("PENDING", "PAID"),
    )
}

fn expense(id: i64, status: &str, amount: f64) -> Record {
    Record::new(id, Status::new(status))
        .with_field("label", FieldValue::Text(format!("Expense {id}")))
        .with_field("amount", FieldValue::Number(amount))
}

fn seeded_cache() -> RecordCache {
    let mut cache = RecordCache::new();
    cache.populate(
        KEY,
        vec![expense(1, "PENDING", 100.0), expense(2, "PAID", 50.0)],
        1_000,
    );
    cache
}

fn pending_pipeline() -> FilterPipeline {
    FilterPipeline::new(
        Predicate::any().with_status("PENDING"),
        SortSpec::by(SortKey::StatusPriority, Direction::Ascending)
            .then(SortKey::Field("amount".into()), Direction::Descending),
        Anchor::Start,
    )
}

fn session() -> EditSession {
    let descriptor = expense_descriptor();
    let rules = ValidationRules::for_descriptor(&descriptor);
    EditSession::new(descriptor, rules)
}

fn visible(
    cache: &RecordCache,
    pipeline: &FilterPipeline,
    session: &EditSession,
) -> Vec<Record> {
    let records = cache.last_known(KEY).unwrap_or(&[]);
    pipeline.apply(session.descriptor(), records, session.draft())
}

// ============================================================================
// The concrete scenario from the editing screens
// ============================================================================

#[test]
fn create_scenario_with_character_filter_and_anchor() {
    let mut cache = seeded_cache();
    let pipeline = pending_pipeline();
    let mut session = session();

    // filtering by PENDING shows only record 1
    let shown = visible(&cache, &pipeline, &session);
    let ids: Vec<_> = shown.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1]);

    // begin a create; the draft is anchored first even before it matches
    session.begin_create().unwrap();
    let shown = visible(&cache, &pipeline, &session);
    let ids: Vec<_> = shown.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![DRAFT_ID, 1]);

    // typing "abc" into the amount is filtered at the character level
    let applied = session.input_text("amount", "abc").unwrap();
    assert_eq!(applied, "");
    assert!(session.draft().unwrap().field("amount").is_none());

    session.input_text("label", "Catering").unwrap();
    let applied = session.input_text("amount", "200").unwrap();
    assert_eq!(applied, "200");

    // commit: the plan carries amount 200 for a create
    let plan = match session.commit() {
        CommitOutcome::Persist(plan) => plan,
        other => panic!("expected Persist, got {other:?}"),
    };
    assert_eq!(plan.record.field("amount").unwrap().as_number(), Some(200.0));
    assert_eq!(plan.record.id, DRAFT_ID);

    // the backend assigns id 3; reconcile by point upsert, prepended
    let canonical = Record { id: 3, ..plan.record };
    let outcome = session.resolve_persist(Ok(canonical.clone()));
    assert!(matches!(outcome, ResolveOutcome::Committed(_)));
    cache.upsert(KEY, canonical, InsertPosition::Start);

    // displayed order: new row first (higher amount in the PENDING bucket),
    // no record with the draft id remains anywhere
    let shown = visible(&cache, &pipeline, &session);
    let ids: Vec<_> = shown.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![3, 1]);
    assert!(shown.iter().all(|r| r.id != DRAFT_ID));
}

#[test]
fn round_trip_create_leaves_exactly_one_persisted_row() {
    let mut cache = seeded_cache();
    let pipeline = FilterPipeline::new(Predicate::any(), SortSpec::new(), Anchor::Start);
    let mut session = session();

    session.begin_create().unwrap();
    session.input_text("label", "New supplier payment").unwrap();
    session.input_text("amount", "75.50").unwrap();

    let plan = match session.commit() {
        CommitOutcome::Persist(plan) => plan,
        other => panic!("expected Persist, got {other:?}"),
    };
    let canonical = Record { id: 42, ..plan.record };
    session.resolve_persist(Ok(canonical.clone()));
    cache.upsert(KEY, canonical, InsertPosition::Start);

    let shown = visible(&cache, &pipeline, &session);
    assert_eq!(shown.iter().filter(|r| r.id == 42).count(), 1);
    assert_eq!(shown.iter().filter(|r| r.id == DRAFT_ID).count(), 0);
}

// ============================================================================
// Edit and reconcile
// ============================================================================

#[test]
fn edit_updates_cache_in_place_after_resolve() {
    let mut cache = seeded_cache();
    let mut session = session();

    let seed = cache.last_known(KEY).unwrap()[0].clone();
    session.begin_edit(&seed).unwrap();
    session.input_text("amount", "140").unwrap();

    // until commit resolves, the cache copy still holds the old value
    assert_eq!(
        cache.last_known(KEY).unwrap()[0]
            .field("amount")
            .unwrap()
            .as_number(),
        Some(100.0)
    );

    let plan = match session.commit() {
        CommitOutcome::Persist(plan) => plan,
        other => panic!("expected Persist, got {other:?}"),
    };
    let canonical = plan.record.clone();
    session.resolve_persist(Ok(canonical.clone()));
    cache.upsert(KEY, canonical, InsertPosition::Start);

    // replaced in place: position preserved, value updated
    let records = cache.last_known(KEY).unwrap();
    assert_eq!(records[0].id, 1);
    assert_eq!(records[0].field("amount").unwrap().as_number(), Some(140.0));
    assert_eq!(records.len(), 2);
}

#[test]
fn gateway_failure_leaves_visible_records_unchanged() {
    let cache = seeded_cache();
    let pipeline = pending_pipeline();
    let mut session = session();

    let before = visible(&cache, &pipeline, &session);

    session.begin_create().unwrap();
    session.input_text("label", "Doomed row").unwrap();
    session.input_text("amount", "10").unwrap();
    session.commit();
    session.resolve_persist(Err(GatewayError::Transport("connection reset".into())));

    // session is back in Creating with the draft; the cache saw nothing
    let snapshot = session.snapshot();
    assert_eq!(snapshot.state, tabula_core::SessionState::Creating);
    assert!(snapshot.draft.is_some());
    assert!(snapshot.gateway_error.is_some());

    session.cancel();
    let after = visible(&cache, &pipeline, &session);
    assert_eq!(before, after);
}

#[test]
fn cancel_removes_draft_placeholder_from_view() {
    let cache = seeded_cache();
    let pipeline = pending_pipeline();
    let mut session = session();

    session.begin_create().unwrap();
    assert_eq!(visible(&cache, &pipeline, &session).len(), 2);

    session.cancel();
    let shown = visible(&cache, &pipeline, &session);
    assert_eq!(shown.len(), 1);
    assert!(shown.iter().all(|r| r.id != DRAFT_ID));
}

// ============================================================================
// Concurrency guards across the seams
// ============================================================================

#[test]
fn only_one_draft_across_any_begin_sequence() {
    let cache = seeded_cache();
    let pipeline = FilterPipeline::new(Predicate::any(), SortSpec::new(), Anchor::Start);
    let mut session = session();

    session.begin_create().unwrap();
    let seed = cache.last_known(KEY).unwrap()[0].clone();
    assert!(session.begin_edit(&seed).is_err());
    assert!(session.begin_create().is_err());

    let shown = visible(&cache, &pipeline, &session);
    assert_eq!(shown.iter().filter(|r| r.is_draft()).count(), 1);
}

#[test]
fn delete_reconciles_by_point_removal() {
    let mut cache = seeded_cache();
    let pipeline = FilterPipeline::new(Predicate::any(), SortSpec::new(), Anchor::Start);
    let session = session();

    // after a successful remote delete the cache drops the single row
    cache.remove(KEY, 2);

    let shown = visible(&cache, &pipeline, &session);
    let ids: Vec<_> = shown.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1]);
}

#[test]
fn soft_invalidation_keeps_view_usable_during_refetch() {
    let mut cache = seeded_cache();
    let pipeline = FilterPipeline::new(Predicate::any(), SortSpec::new(), Anchor::Start);
    let session = session();

    cache.invalidate_soft(KEY);
    assert!(cache.get(KEY, 2_000).is_miss());

    // last-known values still render while the refetch is in flight
    let shown = visible(&cache, &pipeline, &session);
    assert_eq!(shown.len(), 2);

    // refetch lands: wholesale repopulation resets freshness
    cache.populate(KEY, vec![expense(1, "PENDING", 100.0)], 3_000);
    assert!(cache.get(KEY, 3_000).hit().is_some());
}
