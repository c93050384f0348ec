use std::sync::Once;

use pipeline_core::{
    DocumentCollection, DocumentRecord, DocumentStatus, MergeSource, StatusStore, StatusUpdate,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(pipeline_logging::initialize_for_tests);
}

fn collection(id: &str, status: &str, documents: &[&str]) -> DocumentCollection {
    DocumentCollection {
        id: id.to_string(),
        status: status.to_string(),
        documents: documents
            .iter()
            .map(|name| DocumentRecord {
                id: None,
                name: name.to_string(),
                url: None,
                uploaded_at: None,
            })
            .collect(),
        candidate: None,
        assessment_session: None,
        verified_at: None,
        verified_by: None,
    }
}

#[test]
fn snapshot_merge_applies_status_and_payload() {
    init_logging();
    let mut store = StatusStore::new();

    let outcome = store.merge(
        StatusUpdate::from_snapshot(collection("col-1", "requested", &["passport"])),
        MergeSource::Fetch,
    );

    assert!(outcome.applied);
    assert_eq!(
        outcome.transition,
        Some((DocumentStatus::Unknown, DocumentStatus::Requested))
    );
    assert_eq!(store.status(), DocumentStatus::Requested);
    assert_eq!(store.collection_id(), Some("col-1"));
    assert_eq!(store.collection().unwrap().documents.len(), 1);
}

#[test]
fn invalid_status_drops_the_whole_update() {
    init_logging();
    let mut store = StatusStore::new();
    store.merge(
        StatusUpdate::from_snapshot(collection("col-1", "requested", &[])),
        MergeSource::Fetch,
    );
    let before_docs = store.collection().unwrap().documents.clone();

    let outcome = store.merge(
        StatusUpdate::from_snapshot(collection("col-1", "approved-by-magic", &["extra"])),
        MergeSource::Fetch,
    );

    assert!(!outcome.applied);
    assert_eq!(outcome.transition, None);
    assert_eq!(store.status(), DocumentStatus::Requested);
    assert_eq!(store.collection().unwrap().documents, before_docs);
}

#[test]
fn status_stays_in_closed_set_under_arbitrary_sequences() {
    init_logging();
    let mut store = StatusStore::new();
    let inputs = [
        "requested",
        "garbage",
        "uploaded",
        "",
        "VERIFIED",
        "verified",
        "null",
        "rejected",
    ];

    for raw in inputs {
        store.merge(
            StatusUpdate {
                status: Some(raw.to_string()),
                ..StatusUpdate::default()
            },
            MergeSource::Fetch,
        );
        assert!(matches!(
            store.status(),
            DocumentStatus::Unknown
                | DocumentStatus::Requested
                | DocumentStatus::Uploaded
                | DocumentStatus::Verified
                | DocumentStatus::Rejected
        ));
    }
    assert_eq!(store.status(), DocumentStatus::Rejected);
}

#[test]
fn revision_bumps_on_every_merge_including_dropped_ones() {
    init_logging();
    let mut store = StatusStore::new();
    assert_eq!(store.revision(), 0);

    store.merge(
        StatusUpdate {
            status: Some("requested".to_string()),
            ..StatusUpdate::default()
        },
        MergeSource::Fetch,
    );
    assert_eq!(store.revision(), 1);

    // Level repeat: no transition, still a liveness bump.
    store.merge(
        StatusUpdate {
            status: Some("requested".to_string()),
            ..StatusUpdate::default()
        },
        MergeSource::Fetch,
    );
    assert_eq!(store.revision(), 2);

    // Dropped update: still a liveness bump.
    store.merge(
        StatusUpdate {
            status: Some("bogus".to_string()),
            ..StatusUpdate::default()
        },
        MergeSource::Fetch,
    );
    assert_eq!(store.revision(), 3);
}

#[test]
fn conflicting_collection_id_is_rejected() {
    init_logging();
    let mut store = StatusStore::new();
    store.merge(
        StatusUpdate::from_snapshot(collection("col-1", "uploaded", &["cv"])),
        MergeSource::Fetch,
    );

    let outcome = store.merge(
        StatusUpdate::from_snapshot(collection("col-2", "verified", &[])),
        MergeSource::Fetch,
    );

    assert!(!outcome.applied);
    assert_eq!(store.collection_id(), Some("col-1"));
    assert_eq!(store.status(), DocumentStatus::Uploaded);
}

#[test]
fn explicit_collection_id_wins_over_embedded_payload_id() {
    init_logging();
    let mut store = StatusStore::new();

    // Payload claims col-9 but the explicit field says col-1; the explicit
    // id is authoritative and the payload id is never re-derived.
    store.merge(
        StatusUpdate {
            status: Some("uploaded".to_string()),
            collection_id: Some("col-1".to_string()),
            collection: Some(collection("col-9", "uploaded", &["cv"])),
            error: None,
        },
        MergeSource::Fetch,
    );

    assert_eq!(store.collection_id(), Some("col-1"));
    assert_eq!(store.status(), DocumentStatus::Uploaded);
}

#[test]
fn collection_payload_is_replaced_wholesale() {
    init_logging();
    let mut store = StatusStore::new();
    store.merge(
        StatusUpdate::from_snapshot(collection("col-1", "uploaded", &["passport", "degree"])),
        MergeSource::Fetch,
    );

    store.merge(
        StatusUpdate::from_snapshot(collection("col-1", "uploaded", &["passport"])),
        MergeSource::Fetch,
    );

    // The shrunken list replaces the old one; no deep merge of arrays.
    let names: Vec<&str> = store
        .collection()
        .unwrap()
        .documents
        .iter()
        .map(|d| d.name.as_str())
        .collect();
    assert_eq!(names, vec!["passport"]);
}

#[test]
fn failure_merge_keeps_prior_state_and_counts() {
    init_logging();
    let mut store = StatusStore::new();
    store.merge(
        StatusUpdate::from_snapshot(collection("col-1", "uploaded", &["cv"])),
        MergeSource::Fetch,
    );

    store.begin_fetch();
    assert!(store.is_loading());
    assert_eq!(store.error(), None);

    store.merge(StatusUpdate::failure("connection refused"), MergeSource::Fetch);
    assert!(!store.is_loading());
    assert_eq!(store.error(), Some("connection refused"));
    assert_eq!(store.status(), DocumentStatus::Uploaded);
    assert_eq!(store.consecutive_failures(), 1);

    store.merge(StatusUpdate::failure("connection refused"), MergeSource::Fetch);
    assert_eq!(store.consecutive_failures(), 2);

    // A successful merge clears the error and the failure streak.
    store.merge(
        StatusUpdate::from_snapshot(collection("col-1", "uploaded", &["cv"])),
        MergeSource::Fetch,
    );
    assert_eq!(store.error(), None);
    assert_eq!(store.consecutive_failures(), 0);
}

#[test]
fn reset_starts_fresh_but_keeps_counting_revisions() {
    init_logging();
    let mut store = StatusStore::new();
    store.merge(
        StatusUpdate::from_snapshot(collection("col-1", "verified", &["cv"])),
        MergeSource::Fetch,
    );
    let revision_before = store.revision();

    store.reset(Some("col-2".to_string()));

    assert_eq!(store.status(), DocumentStatus::Unknown);
    assert_eq!(store.collection_id(), Some("col-2"));
    assert!(store.collection().is_none());
    assert!(store.revision() > revision_before);
}

#[test]
fn view_reflects_store_state() {
    init_logging();
    let mut store = StatusStore::new();
    store.merge(
        StatusUpdate::from_snapshot(collection("col-1", "uploaded", &["passport", "degree"])),
        MergeSource::Fetch,
    );

    let view = store.view();
    assert_eq!(view.status, DocumentStatus::Uploaded);
    assert_eq!(view.collection_id.as_deref(), Some("col-1"));
    assert_eq!(view.document_count, 2);
    assert!(!view.is_loading);
    assert_eq!(view.error, None);
}
