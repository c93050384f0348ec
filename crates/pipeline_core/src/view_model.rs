use chrono::{DateTime, Utc};

use crate::gate::{can_reject, can_select, GateDecision, OfferFields, RejectionReason};
use crate::interview::InterviewState;
use crate::types::{CollectionId, DocumentStatus, InterviewStatus};

/// Read-only snapshot of the document-collection state for rendering.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentView {
    pub status: DocumentStatus,
    pub collection_id: Option<CollectionId>,
    pub document_count: usize,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<String>,
    pub revision: u64,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// Combined gate decisions for the candidate-detail action row.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateActionsView {
    pub document_status: DocumentStatus,
    pub interview_status: InterviewStatus,
    pub select: GateDecision,
    pub reject: GateDecision,
}

/// Re-evaluates both gates against current state and the pending inputs.
pub fn actions_view(
    interview: &InterviewState,
    documents: DocumentStatus,
    offer: &OfferFields,
    rejection: Option<&RejectionReason>,
) -> CandidateActionsView {
    CandidateActionsView {
        document_status: documents,
        interview_status: interview.status(),
        select: can_select(interview, documents, offer),
        reject: can_reject(interview, rejection),
    }
}
