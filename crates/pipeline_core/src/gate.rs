use std::fmt;

use crate::interview::InterviewState;
use crate::types::{DocumentStatus, InterviewStatus};

/// Required fields of the offer being prepared for "Select Candidate".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OfferFields {
    pub position: String,
    pub salary: String,
    pub start_date: String,
    /// Rich-text offer body; must have visible content once tags are
    /// stripped.
    pub body_html: String,
}

impl OfferFields {
    pub fn is_complete(&self) -> bool {
        !self.position.trim().is_empty()
            && !self.salary.trim().is_empty()
            && !self.start_date.trim().is_empty()
            && html_has_content(&self.body_html)
    }
}

/// Rejection reason selected in the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    /// One of the predefined dropdown choices.
    Preset(String),
    /// Free-form reason; requires non-empty text.
    Custom(String),
}

impl RejectionReason {
    pub fn text(&self) -> &str {
        match self {
            Self::Preset(text) | Self::Custom(text) => text,
        }
    }

    /// A reason counts as selected only when its text is non-empty; the
    /// custom choice with blank text is not a reason.
    pub fn is_valid(&self) -> bool {
        !self.text().trim().is_empty()
    }
}

/// Why an action is currently denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    FeedbackRequired,
    DocumentsNotVerified,
    OfferIncomplete,
    RejectionReasonMissing,
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FeedbackRequired => "feedback-required",
            Self::DocumentsNotVerified => "documents-not-verified",
            Self::OfferIncomplete => "offer-incomplete",
            Self::RejectionReasonMissing => "rejection-reason-missing",
        })
    }
}

/// Outcome of an action gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateDecision {
    pub allowed: bool,
    pub reason: Option<DenialReason>,
}

impl GateDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: DenialReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }
}

/// Whether "Select Candidate" may proceed. Pure: no side effects, no IO.
///
/// Denial reasons are checked in priority order: missing feedback on a
/// completed interview, unverified documents, incomplete offer.
pub fn can_select(
    interview: &InterviewState,
    documents: DocumentStatus,
    offer: &OfferFields,
) -> GateDecision {
    if interview.status() == InterviewStatus::Completed && !interview.feedback_submitted() {
        return GateDecision::deny(DenialReason::FeedbackRequired);
    }
    if documents != DocumentStatus::Verified {
        return GateDecision::deny(DenialReason::DocumentsNotVerified);
    }
    if !offer.is_complete() {
        return GateDecision::deny(DenialReason::OfferIncomplete);
    }
    GateDecision::allow()
}

/// Whether "Reject" may proceed. Requires a valid rejection reason and,
/// like select, submitted feedback if the interview was completed.
pub fn can_reject(interview: &InterviewState, reason: Option<&RejectionReason>) -> GateDecision {
    if interview.status() == InterviewStatus::Completed && !interview.feedback_submitted() {
        return GateDecision::deny(DenialReason::FeedbackRequired);
    }
    match reason {
        Some(reason) if reason.is_valid() => GateDecision::allow(),
        _ => GateDecision::deny(DenialReason::RejectionReasonMissing),
    }
}

/// True when the HTML fragment has visible text content after tags and
/// non-breaking spaces are stripped.
fn html_has_content(html: &str) -> bool {
    let mut in_tag = false;
    let mut text = String::new();
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    !text.replace("&nbsp;", " ").trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::html_has_content;

    #[test]
    fn empty_editor_markup_is_trivial() {
        assert!(!html_has_content(""));
        assert!(!html_has_content("<p></p>"));
        assert!(!html_has_content("<p>&nbsp;</p>"));
        assert!(!html_has_content("<div><br></div>"));
    }

    #[test]
    fn real_text_counts_as_content() {
        assert!(html_has_content("<p>We are pleased to offer you the role.</p>"));
        assert!(html_has_content("plain text"));
    }
}
