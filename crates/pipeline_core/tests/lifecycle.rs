use std::sync::Once;

use pipeline_core::{
    can_select, DenialReason, DocumentCollection, DocumentStatus, Interview, InterviewState,
    MergeSource, NotificationDeduplicator, NotificationKind, OfferFields, StatusStore,
    StatusUpdate, WireFeedback,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(pipeline_logging::initialize_for_tests);
}

fn snapshot(status: &str) -> StatusUpdate {
    StatusUpdate::from_snapshot(DocumentCollection {
        id: "col-1".to_string(),
        status: status.to_string(),
        documents: Vec::new(),
        candidate: None,
        assessment_session: None,
        verified_at: None,
        verified_by: None,
    })
}

/// Full document lifecycle: each transition edge announces once, repeated
/// polls of the same level announce nothing, and the select gate flips as
/// soon as documents are verified with offer and feedback already in place.
#[test]
fn document_lifecycle_flips_the_select_gate() {
    init_logging();
    let mut store = StatusStore::new();
    let mut deduper = NotificationDeduplicator::new();
    let mut toasts = Vec::new();

    let mut interview = InterviewState::new();
    interview.apply_snapshot(&Interview {
        id: None,
        status: "completed".to_string(),
        platform: None,
        feedback: Some(WireFeedback {
            rating: Some(5),
            feedback: Some("Excellent".to_string()),
            strengths: None,
            areas_for_improvement: None,
            recommendation: Some("proceed".to_string()),
        }),
    });
    let offer = OfferFields {
        position: "Backend Engineer".to_string(),
        salary: "88000".to_string(),
        start_date: "2026-10-01".to_string(),
        body_html: "<p>Offer details attached.</p>".to_string(),
    };

    assert_eq!(store.status(), DocumentStatus::Unknown);

    // Poll sequence as the backend advances, with level repeats in between.
    let polls = [
        "requested",
        "requested",
        "uploaded",
        "uploaded",
        "uploaded",
        "verified",
        "verified",
    ];
    for raw in polls {
        let outcome = store.merge(snapshot(raw), MergeSource::Fetch);
        if let Some((_, next)) = outcome.transition {
            if let Some(toast) = deduper.notify(
                NotificationKind::DocumentStatus,
                "col-1",
                next.as_str(),
                next.to_string(),
            ) {
                toasts.push(toast);
            }
        }

        let decision = can_select(&interview, store.status(), &offer);
        if store.status() == DocumentStatus::Verified {
            assert!(decision.allowed);
        } else {
            assert!(!decision.allowed);
            assert_eq!(decision.reason, Some(DenialReason::DocumentsNotVerified));
        }
    }

    let announced: Vec<&str> = toasts.iter().map(|t| t.status.as_str()).collect();
    assert_eq!(announced, vec!["requested", "uploaded", "verified"]);
}

/// Rejected collections can be re-requested, restarting the cycle; the
/// flip back to `requested` is news, the repeats are not.
#[test]
fn rejection_restarts_the_cycle() {
    init_logging();
    let mut store = StatusStore::new();
    let mut deduper = NotificationDeduplicator::new();
    let mut announced = Vec::new();

    for raw in ["uploaded", "rejected", "rejected", "requested", "uploaded"] {
        let outcome = store.merge(snapshot(raw), MergeSource::Fetch);
        if let Some((_, next)) = outcome.transition {
            if let Some(toast) = deduper.notify(
                NotificationKind::DocumentStatus,
                "col-1",
                next.as_str(),
                next.to_string(),
            ) {
                announced.push(toast.status);
            }
        }
    }

    assert_eq!(announced, vec!["uploaded", "rejected", "requested", "uploaded"]);
}
