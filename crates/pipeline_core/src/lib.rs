//! Pipeline core: pure state machines, action gates and view-model helpers
//! for candidate hiring-pipeline synchronization.
mod gate;
mod interview;
mod notify;
mod store;
mod types;
mod view_model;

pub use gate::{
    can_reject, can_select, DenialReason, GateDecision, OfferFields, RejectionReason,
};
pub use interview::{Feedback, FeedbackError, InterviewState};
pub use notify::{Notification, NotificationDeduplicator, NotificationKind};
pub use store::{MergeOutcome, MergeSource, StatusStore, StatusUpdate};
pub use types::{
    CandidateId, CollectionId, DocumentCollection, DocumentRecord, DocumentStatus, EntityObject,
    EntityRef, Interview, InterviewStatus, Recommendation, SessionId, WireFeedback,
};
pub use view_model::{actions_view, CandidateActionsView, DocumentView};
