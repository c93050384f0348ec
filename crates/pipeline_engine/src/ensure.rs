use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use pipeline_logging::pipeline_debug;

use crate::api::{ApiError, EnsureInterviewRequest, PipelineApi};
use pipeline_core::{CandidateId, Interview, SessionId};

type EnsureKey = (CandidateId, SessionId);
type EnsureSlot = Arc<tokio::sync::Mutex<Option<Interview>>>;

/// Single-flight, memoized ensure-or-create of the server-side interview
/// record, keyed by (candidate, session).
///
/// Concurrent callers serialize on the key's slot: the first issues the
/// network call, the rest wait and observe the memoized record, so the
/// success path makes exactly one request per session no matter how many
/// entry points invoke it. A failure leaves the slot empty for retry.
pub struct InterviewEnsurer {
    api: Arc<dyn PipelineApi>,
    slots: Mutex<HashMap<EnsureKey, EnsureSlot>>,
}

impl InterviewEnsurer {
    pub fn new(api: Arc<dyn PipelineApi>) -> Self {
        Self {
            api,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub async fn ensure(
        &self,
        candidate_id: &str,
        session_id: &str,
    ) -> Result<Interview, ApiError> {
        let slot = {
            let mut slots = self.slots.lock().expect("lock ensure slots");
            slots
                .entry((candidate_id.to_string(), session_id.to_string()))
                .or_default()
                .clone()
        };

        let mut guard = slot.lock().await;
        if let Some(interview) = guard.as_ref() {
            pipeline_debug!("interview already ensured for candidate={candidate_id}");
            return Ok(interview.clone());
        }

        let request = EnsureInterviewRequest {
            assessment_session_id: session_id.to_string(),
            candidate_id: candidate_id.to_string(),
        };
        let interview = self.api.ensure_interview(&request).await?;
        *guard = Some(interview.clone());
        Ok(interview)
    }
}
