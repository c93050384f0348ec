use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::broadcast;

use pipeline_core::{
    actions_view, CandidateActionsView, CandidateId, CollectionId, DenialReason, DocumentView,
    Feedback, Interview, InterviewState, InterviewStatus, MergeSource, Notification,
    NotificationDeduplicator, NotificationKind, OfferFields, RejectionReason, SessionId,
    StatusStore,
};
use pipeline_logging::pipeline_info;

use crate::api::{ApiError, FeedbackSubmission, InterviewStatusUpdate, PipelineApi};
use crate::bus::{BusEvent, CrossComponentBus};
use crate::ensure::InterviewEnsurer;
use crate::reconciler::{self, ReconcilerHandle, ReconcilerSettings, TriggerReason};

/// Emitted to session subscribers whenever state changed or a toast
/// survived deduplication.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// Store or interview state changed; re-read the views.
    Updated { revision: u64 },
    /// User-visible toast.
    Toast(Notification),
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("action not permitted: {0}")]
    NotPermitted(DenialReason),
    #[error("no document collection to act on")]
    NoCollection,
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub candidate_id: CandidateId,
    pub assessment_session_id: SessionId,
    /// Known collection id, if the page already has one at mount.
    pub collection_id: Option<CollectionId>,
    pub reconciler: ReconcilerSettings,
}

impl SessionConfig {
    pub fn new(
        candidate_id: impl Into<CandidateId>,
        assessment_session_id: impl Into<SessionId>,
    ) -> Self {
        Self {
            candidate_id: candidate_id.into(),
            assessment_session_id: assessment_session_id.into(),
            collection_id: None,
            reconciler: ReconcilerSettings::default(),
        }
    }

    pub fn with_collection(mut self, collection_id: impl Into<CollectionId>) -> Self {
        self.collection_id = Some(collection_id.into());
        self
    }
}

/// State shared between the session facade and the reconciler task.
/// Std mutexes, never held across an await.
pub(crate) struct SharedState {
    pub(crate) candidate_id: CandidateId,
    pub(crate) session_id: SessionId,
    pub(crate) store: Mutex<StatusStore>,
    pub(crate) interview: Mutex<InterviewState>,
    pub(crate) deduper: Mutex<NotificationDeduplicator>,
    pub(crate) api: Arc<dyn PipelineApi>,
    pub(crate) events: broadcast::Sender<SyncEvent>,
    pub(crate) settings: ReconcilerSettings,
}

/// Wiring facade for one candidate-detail page lifetime: owns the status
/// store, interview state, deduplicator and reconciler task, and exposes
/// the gated operations.
pub struct SyncSession {
    shared: Arc<SharedState>,
    bus: CrossComponentBus,
    ensurer: InterviewEnsurer,
    reconciler: ReconcilerHandle,
}

impl SyncSession {
    /// Spawns the reconciler and fires the mount trigger. Requires a tokio
    /// runtime.
    pub fn new(api: Arc<dyn PipelineApi>, bus: CrossComponentBus, config: SessionConfig) -> Self {
        let (events, _) = broadcast::channel(128);
        let store = match config.collection_id {
            Some(id) => StatusStore::for_collection(id),
            None => StatusStore::new(),
        };
        let shared = Arc::new(SharedState {
            candidate_id: config.candidate_id,
            session_id: config.assessment_session_id,
            store: Mutex::new(store),
            interview: Mutex::new(InterviewState::new()),
            deduper: Mutex::new(NotificationDeduplicator::new()),
            api: api.clone(),
            events,
            settings: config.reconciler,
        });
        let reconciler = reconciler::spawn(shared.clone(), bus.subscribe());
        reconciler.trigger(TriggerReason::Mount);
        Self {
            shared,
            bus,
            ensurer: InterviewEnsurer::new(api),
            reconciler,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.shared.events.subscribe()
    }

    /// Entry point for the embedder's focus/visibility handlers.
    pub fn trigger(&self, reason: TriggerReason) {
        self.reconciler.trigger(reason);
    }

    /// Adopts a new collection id: fresh state, immediate fetch.
    pub fn set_collection(&self, collection_id: CollectionId) {
        {
            let mut store = self.shared.store.lock().expect("lock status store");
            if store.collection_id() == Some(collection_id.as_str()) {
                return;
            }
            store.reset(Some(collection_id));
        }
        self.reconciler.trigger(TriggerReason::CollectionChanged);
    }

    pub fn document_view(&self) -> DocumentView {
        self.shared.store.lock().expect("lock status store").view()
    }

    pub fn interview_view(&self) -> InterviewState {
        self.shared
            .interview
            .lock()
            .expect("lock interview state")
            .clone()
    }

    /// Gate decisions for the action row, given the pending offer and
    /// rejection inputs.
    pub fn actions_view(
        &self,
        offer: &OfferFields,
        rejection: Option<&RejectionReason>,
    ) -> CandidateActionsView {
        let documents = {
            let store = self.shared.store.lock().expect("lock status store");
            store.status()
        };
        let interview = self
            .shared
            .interview
            .lock()
            .expect("lock interview state");
        actions_view(&interview, documents, offer, rejection)
    }

    /// Create-if-absent/return-existing for the interview record. At most
    /// one network call per session on the success path, no matter how many
    /// UI entry points invoke it.
    pub async fn ensure_interview(&self) -> Result<Interview, ApiError> {
        let interview = self
            .ensurer
            .ensure(&self.shared.candidate_id, &self.shared.session_id)
            .await?;
        self.apply_interview_snapshot(&interview, true);
        Ok(interview)
    }

    /// Pushes a status change and merges the returned snapshot; the server
    /// response is authoritative, the request payload is not trusted.
    pub async fn update_interview_status(
        &self,
        status: InterviewStatus,
        platform: Option<String>,
    ) -> Result<Interview, ApiError> {
        let request = InterviewStatusUpdate {
            assessment_session_id: self.shared.session_id.clone(),
            candidate_id: self.shared.candidate_id.clone(),
            status: status.as_str().to_string(),
            platform,
        };
        let returned = self.shared.api.update_interview_status(&request).await?;
        self.apply_interview_snapshot(&returned, false);
        Ok(returned)
    }

    /// Submits already-validated feedback and merges the returned record.
    pub async fn submit_feedback(&self, feedback: &Feedback) -> Result<Interview, ApiError> {
        let request = FeedbackSubmission {
            candidate_id: self.shared.candidate_id.clone(),
            assessment_session_id: self.shared.session_id.clone(),
            rating: feedback.rating(),
            feedback: feedback.narrative().to_string(),
            strengths: feedback.strengths().to_string(),
            areas_for_improvement: feedback.improvements().to_string(),
            recommendation: feedback.recommendation().as_str().to_string(),
        };
        let returned = self.shared.api.submit_feedback(&request).await?;
        self.apply_interview_snapshot(&returned, false);
        Ok(returned)
    }

    /// Marks the collection verified and hints sibling surfaces to
    /// re-fetch.
    pub async fn verify_documents(&self) -> Result<(), ActionError> {
        let collection_id = self.collection_id().ok_or(ActionError::NoCollection)?;
        let snapshot = self.shared.api.verify_collection(&collection_id).await?;
        let status = snapshot.status.clone();
        reconciler::apply_snapshot(&self.shared, snapshot, MergeSource::Action);
        self.bus
            .publish(BusEvent::document_verified(collection_id, status));
        Ok(())
    }

    /// Rejects the collection. An empty or missing reason is refused here,
    /// before any network call.
    pub async fn reject_documents(&self, reason: &RejectionReason) -> Result<(), ActionError> {
        if !reason.is_valid() {
            return Err(ActionError::NotPermitted(
                DenialReason::RejectionReasonMissing,
            ));
        }
        let collection_id = self.collection_id().ok_or(ActionError::NoCollection)?;
        let snapshot = self
            .shared
            .api
            .reject_collection(&collection_id, reason.text())
            .await?;
        let status = snapshot.status.clone();
        reconciler::apply_snapshot(&self.shared, snapshot, MergeSource::Action);
        self.bus
            .publish(BusEvent::document_verified(collection_id, status));
        Ok(())
    }

    /// Cancels the polling task. Safe to call more than once; `Drop` calls
    /// it as well.
    pub fn shutdown(&self) {
        self.reconciler.shutdown();
    }

    fn collection_id(&self) -> Option<CollectionId> {
        let store = self.shared.store.lock().expect("lock status store");
        store.collection_id().map(str::to_string)
    }

    fn apply_interview_snapshot(&self, interview: &Interview, mark_ensured: bool) {
        let (previous, next) = {
            let mut state = self
                .shared
                .interview
                .lock()
                .expect("lock interview state");
            let previous = state.status();
            state.apply_snapshot(interview);
            if mark_ensured {
                state.mark_ensured();
            }
            (previous, state.status())
        };
        let revision = {
            let store = self.shared.store.lock().expect("lock status store");
            store.revision()
        };
        let _ = self.shared.events.send(SyncEvent::Updated { revision });

        if previous != next {
            pipeline_info!("interview status {previous} -> {next}");
            let notification = {
                let mut deduper = self.shared.deduper.lock().expect("lock deduplicator");
                deduper.notify(
                    NotificationKind::InterviewStatus,
                    &self.shared.candidate_id,
                    next.as_str(),
                    interview_status_message(next),
                )
            };
            if let Some(notification) = notification {
                let _ = self.shared.events.send(SyncEvent::Toast(notification));
            }
        }
    }
}

impl Drop for SyncSession {
    fn drop(&mut self) {
        self.reconciler.shutdown();
    }
}

fn interview_status_message(status: InterviewStatus) -> &'static str {
    match status {
        InterviewStatus::NotScheduled => "Interview not scheduled",
        InterviewStatus::Scheduled => "Interview scheduled",
        InterviewStatus::Completed => "Interview completed",
        InterviewStatus::Unknown => "Interview status unknown",
    }
}
