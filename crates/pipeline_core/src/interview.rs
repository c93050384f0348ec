use pipeline_logging::pipeline_warn;
use thiserror::Error;

use crate::types::{Interview, InterviewStatus, Recommendation, WireFeedback};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeedbackError {
    #[error("rating must be between 1 and 5, got {0}")]
    RatingOutOfRange(u8),
    #[error("feedback narrative must not be empty")]
    EmptyNarrative,
}

/// Validated interview feedback. Construct through [`Feedback::new`] so a
/// stored record always satisfies the rating and narrative constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    rating: u8,
    narrative: String,
    strengths: String,
    improvements: String,
    recommendation: Recommendation,
}

impl Feedback {
    pub fn new(
        rating: u8,
        narrative: impl Into<String>,
        strengths: impl Into<String>,
        improvements: impl Into<String>,
        recommendation: Recommendation,
    ) -> Result<Self, FeedbackError> {
        if !(1..=5).contains(&rating) {
            return Err(FeedbackError::RatingOutOfRange(rating));
        }
        let narrative = narrative.into();
        if narrative.trim().is_empty() {
            return Err(FeedbackError::EmptyNarrative);
        }
        Ok(Self {
            rating,
            narrative,
            strengths: strengths.into(),
            improvements: improvements.into(),
            recommendation,
        })
    }

    /// Converts a wire record, or `None` when it fails validation.
    pub fn from_wire(wire: &WireFeedback) -> Option<Self> {
        let rating = wire.rating?;
        let narrative = wire.feedback.clone().unwrap_or_default();
        let recommendation = wire
            .recommendation
            .as_deref()
            .map(Recommendation::parse_lossy)
            .unwrap_or_default();
        match Self::new(
            rating,
            narrative,
            wire.strengths.clone().unwrap_or_default(),
            wire.areas_for_improvement.clone().unwrap_or_default(),
            recommendation,
        ) {
            Ok(feedback) => Some(feedback),
            Err(err) => {
                pipeline_warn!("ignoring invalid feedback from server: {err}");
                None
            }
        }
    }

    pub fn rating(&self) -> u8 {
        self.rating
    }

    pub fn narrative(&self) -> &str {
        &self.narrative
    }

    pub fn strengths(&self) -> &str {
        &self.strengths
    }

    pub fn improvements(&self) -> &str {
        &self.improvements
    }

    pub fn recommendation(&self) -> Recommendation {
        self.recommendation
    }
}

/// Client-side view of the server-owned interview record.
///
/// `ensured` is set at most once per session, after the backend confirmed
/// the record exists, and never reset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InterviewState {
    status: InterviewStatus,
    ensured: bool,
    feedback: Option<Feedback>,
}

impl InterviewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> InterviewStatus {
        self.status
    }

    pub fn ensured(&self) -> bool {
        self.ensured
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    /// Derived flag consulted by the action gates.
    pub fn feedback_submitted(&self) -> bool {
        self.feedback.is_some()
    }

    /// Replaces local state with an authoritative server snapshot.
    ///
    /// A snapshot without a (valid) feedback record keeps the last-known
    /// feedback rather than clearing it.
    pub fn apply_snapshot(&mut self, interview: &Interview) {
        self.status = InterviewStatus::parse_lossy(&interview.status);
        if let Some(parsed) = interview.feedback.as_ref().and_then(Feedback::from_wire) {
            self.feedback = Some(parsed);
        }
    }

    /// Records that the backend interview record is confirmed to exist.
    pub fn mark_ensured(&mut self) {
        self.ensured = true;
    }
}
