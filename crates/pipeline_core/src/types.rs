use std::fmt;

use chrono::{DateTime, Utc};
use pipeline_logging::pipeline_warn;
use serde::{Deserialize, Serialize};

pub type CandidateId = String;
pub type SessionId = String;
pub type CollectionId = String;

/// Document-collection lifecycle status. Closed set: wire values outside it
/// are rejected at merge time, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DocumentStatus {
    #[default]
    Unknown,
    Requested,
    Uploaded,
    Verified,
    Rejected,
}

impl DocumentStatus {
    /// Parses a wire value against the closed set. Returns `None` for
    /// anything else; the caller decides how to reject the update.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "unknown" => Some(Self::Unknown),
            "requested" => Some(Self::Requested),
            "uploaded" => Some(Self::Uploaded),
            "verified" => Some(Self::Verified),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Requested => "requested",
            Self::Uploaded => "uploaded",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interview lifecycle status. Unrecognized server values are kept visible
/// as `Unknown` rather than silently coerced to `NotScheduled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InterviewStatus {
    #[default]
    NotScheduled,
    Scheduled,
    Completed,
    Unknown,
}

impl InterviewStatus {
    /// Coercing parse: unrecognized values map to `Unknown` with a warning.
    pub fn parse_lossy(raw: &str) -> Self {
        match raw.trim() {
            "not-scheduled" | "not_scheduled" => Self::NotScheduled,
            "scheduled" => Self::Scheduled,
            "completed" => Self::Completed,
            other => {
                pipeline_warn!("unrecognized interview status {other:?}, keeping as unknown");
                Self::Unknown
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotScheduled => "not-scheduled",
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for InterviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interviewer recommendation attached to submitted feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Recommendation {
    #[default]
    Pending,
    Proceed,
    Reject,
}

impl Recommendation {
    pub fn parse_lossy(raw: &str) -> Self {
        match raw.trim() {
            "proceed" => Self::Proceed,
            "reject" => Self::Reject,
            "pending" => Self::Pending,
            other => {
                pipeline_warn!("unrecognized recommendation {other:?}, keeping as pending");
                Self::Pending
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Proceed => "proceed",
            Self::Reject => "reject",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference that may arrive either as a raw id or as a populated
/// sub-object, depending on whether the backend expanded the relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityRef {
    Object(EntityObject),
    Id(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityObject {
    #[serde(alias = "_id")]
    pub id: String,
}

impl EntityRef {
    pub fn id(&self) -> &str {
        match self {
            Self::Object(obj) => &obj.id,
            Self::Id(id) => id,
        }
    }
}

/// A single uploaded document inside a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// Full document-collection snapshot as returned by the backend.
///
/// `status` stays a raw string here; validation against the closed
/// [`DocumentStatus`] set happens when the snapshot is merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentCollection {
    #[serde(alias = "_id")]
    pub id: CollectionId,
    pub status: String,
    #[serde(default)]
    pub documents: Vec<DocumentRecord>,
    #[serde(default)]
    pub candidate: Option<EntityRef>,
    #[serde(default)]
    pub assessment_session: Option<EntityRef>,
    #[serde(default)]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub verified_by: Option<String>,
}

impl DocumentCollection {
    /// True when this collection belongs to the given candidate + assessment
    /// session pair, tolerating raw ids or populated sub-objects for both.
    pub fn matches(&self, candidate_id: &str, session_id: &str) -> bool {
        let candidate_ok = self
            .candidate
            .as_ref()
            .is_some_and(|c| c.id() == candidate_id);
        let session_ok = self
            .assessment_session
            .as_ref()
            .is_some_and(|s| s.id() == session_id);
        candidate_ok && session_ok
    }
}

/// Interview record snapshot as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interview {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub feedback: Option<WireFeedback>,
}

/// Feedback as it appears on the wire. Converted into a validated
/// [`Feedback`](crate::Feedback) when applied to interview state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireFeedback {
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub strengths: Option<String>,
    #[serde(default)]
    pub areas_for_improvement: Option<String>,
    #[serde(default)]
    pub recommendation: Option<String>,
}
