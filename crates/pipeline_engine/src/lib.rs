//! Pipeline engine: REST client, reconciliation loop and session wiring.
mod api;
mod bus;
mod ensure;
mod reconciler;
mod session;

pub use api::{
    ApiError, ApiSettings, EnsureInterviewRequest, FeedbackSubmission, InterviewStatusUpdate,
    PipelineApi, RestApiClient,
};
pub use bus::{BusEvent, CrossComponentBus};
pub use ensure::InterviewEnsurer;
pub use reconciler::{ReconcilerHandle, ReconcilerSettings, TriggerReason};
pub use session::{ActionError, SessionConfig, SyncEvent, SyncSession};
