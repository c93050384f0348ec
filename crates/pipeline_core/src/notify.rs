use std::collections::HashMap;

use pipeline_logging::pipeline_debug;

/// What kind of event a toast announces; half of the dedup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    DocumentStatus,
    InterviewStatus,
    SyncFailure,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::DocumentStatus => "document-status",
            Self::InterviewStatus => "interview-status",
            Self::SyncFailure => "sync-failure",
        })
    }
}

/// A user-visible toast that survived deduplication. Rendering it is the
/// embedder's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub entity_id: String,
    pub status: String,
    pub message: String,
}

/// Suppresses repeat toasts for the same (kind, entity-id) pair within a
/// session, while still letting genuine status flips through.
///
/// A 3-second poll loop re-announcing "documents verified" is noise; an
/// `uploaded` to `rejected` flip for the same pair is news.
#[derive(Debug, Clone, Default)]
pub struct NotificationDeduplicator {
    emitted: HashMap<(NotificationKind, String), String>,
}

impl NotificationDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the notification to emit, or `None` when the same pair was
    /// already announced with the same status this session.
    pub fn notify(
        &mut self,
        kind: NotificationKind,
        entity_id: &str,
        status: &str,
        message: impl Into<String>,
    ) -> Option<Notification> {
        let key = (kind, entity_id.to_string());
        if self.emitted.get(&key).is_some_and(|last| last == status) {
            pipeline_debug!("suppressing repeat toast kind={kind} entity={entity_id} status={status}");
            return None;
        }
        self.emitted.insert(key, status.to_string());
        Some(Notification {
            kind,
            entity_id: entity_id.to_string(),
            status: status.to_string(),
            message: message.into(),
        })
    }

    /// Forgets all prior emissions, e.g. when a new session starts.
    pub fn reset(&mut self) {
        self.emitted.clear();
    }
}
