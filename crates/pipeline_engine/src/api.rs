use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pipeline_core::{CandidateId, DocumentCollection, Interview, SessionId};

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl ApiSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected http status {status}")]
    Http { status: u16 },
    #[error("malformed response body: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnsureInterviewRequest {
    pub assessment_session_id: SessionId,
    pub candidate_id: CandidateId,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewStatusUpdate {
    pub assessment_session_id: SessionId,
    pub candidate_id: CandidateId,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSubmission {
    pub candidate_id: CandidateId,
    pub assessment_session_id: SessionId,
    pub rating: u8,
    pub feedback: String,
    pub strengths: String,
    pub areas_for_improvement: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize)]
struct RejectCollectionRequest<'a> {
    reason: &'a str,
}

/// Backend contract consumed by the reconciler and session operations.
/// Payloads are idempotent snapshots; transport detail stays behind this
/// trait so tests can drive the engine against a mock server or a stub.
#[async_trait::async_trait]
pub trait PipelineApi: Send + Sync {
    async fn fetch_collection(&self, id: &str) -> Result<DocumentCollection, ApiError>;

    /// Fallback reconciliation path: the full collection list, matched
    /// client-side by (candidate, session).
    async fn list_collections(&self) -> Result<Vec<DocumentCollection>, ApiError>;

    async fn verify_collection(&self, id: &str) -> Result<DocumentCollection, ApiError>;

    async fn reject_collection(
        &self,
        id: &str,
        reason: &str,
    ) -> Result<DocumentCollection, ApiError>;

    /// Idempotent create-or-fetch of the interview record.
    async fn ensure_interview(
        &self,
        request: &EnsureInterviewRequest,
    ) -> Result<Interview, ApiError>;

    async fn update_interview_status(
        &self,
        request: &InterviewStatusUpdate,
    ) -> Result<Interview, ApiError>;

    async fn submit_feedback(&self, request: &FeedbackSubmission) -> Result<Interview, ApiError>;
}

/// Reqwest-backed [`PipelineApi`] implementation.
#[derive(Debug, Clone)]
pub struct RestApiClient {
    client: reqwest::Client,
    settings: ApiSettings,
}

impl RestApiClient {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::Network(err.to_string()))?;
        Ok(Self { client, settings })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.settings.base_url.trim_end_matches('/'))
    }
}

#[async_trait::async_trait]
impl PipelineApi for RestApiClient {
    async fn fetch_collection(&self, id: &str) -> Result<DocumentCollection, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("/document-collection/{id}")))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        decode(response).await
    }

    async fn list_collections(&self) -> Result<Vec<DocumentCollection>, ApiError> {
        let response = self
            .client
            .get(self.url("/document-collection"))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        decode(response).await
    }

    async fn verify_collection(&self, id: &str) -> Result<DocumentCollection, ApiError> {
        let response = self
            .client
            .put(self.url(&format!("/document-collection/{id}/verify")))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        decode(response).await
    }

    async fn reject_collection(
        &self,
        id: &str,
        reason: &str,
    ) -> Result<DocumentCollection, ApiError> {
        let response = self
            .client
            .put(self.url(&format!("/document-collection/{id}/reject")))
            .json(&RejectCollectionRequest { reason })
            .send()
            .await
            .map_err(map_reqwest_error)?;
        decode(response).await
    }

    async fn ensure_interview(
        &self,
        request: &EnsureInterviewRequest,
    ) -> Result<Interview, ApiError> {
        let response = self
            .client
            .post(self.url("/interviews/ensure-by-session"))
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        decode(response).await
    }

    async fn update_interview_status(
        &self,
        request: &InterviewStatusUpdate,
    ) -> Result<Interview, ApiError> {
        let response = self
            .client
            .put(self.url("/interviews/update-status"))
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        decode(response).await
    }

    async fn submit_feedback(&self, request: &FeedbackSubmission) -> Result<Interview, ApiError> {
        let response = self
            .client
            .post(self.url("/interviews/feedback"))
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        decode(response).await
    }
}

/// Error body shape the backend uses for 4xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(alias = "error")]
    message: Option<String>,
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        let path = response.url().path().to_string();
        return Err(ApiError::NotFound(path));
    }
    if status == reqwest::StatusCode::BAD_REQUEST {
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| "bad request".to_string());
        return Err(ApiError::Validation(message));
    }
    if !status.is_success() {
        return Err(ApiError::Http {
            status: status.as_u16(),
        });
    }
    response
        .json::<T>()
        .await
        .map_err(|err| ApiError::Decode(err.to_string()))
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::Timeout;
    }
    ApiError::Network(err.to_string())
}
