use std::fmt;

use pipeline_logging::pipeline_warn;

use crate::types::{CollectionId, DocumentCollection, DocumentStatus};
use crate::view_model::DocumentView;

/// Where a merge came from, for reason-tagged logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeSource {
    /// Direct fetch of the collection by id.
    Fetch,
    /// List-scan fallback reconciliation.
    ListScan,
    /// Result of a user action (verify/reject).
    Action,
}

impl fmt::Display for MergeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fetch => "fetch",
            Self::ListScan => "list-scan",
            Self::Action => "action",
        })
    }
}

/// Shallow partial update applied through [`StatusStore::merge`].
///
/// `status` stays raw here; the store validates it against the closed enum
/// and drops the whole update when it does not parse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusUpdate {
    pub status: Option<String>,
    pub collection_id: Option<CollectionId>,
    pub collection: Option<DocumentCollection>,
    pub error: Option<String>,
}

impl StatusUpdate {
    /// Full-snapshot update from a successful fetch.
    pub fn from_snapshot(collection: DocumentCollection) -> Self {
        Self {
            status: Some(collection.status.clone()),
            collection_id: Some(collection.id.clone()),
            collection: Some(collection),
            error: None,
        }
    }

    /// Failure update: records the error, leaves prior state intact.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

/// What a merge did, so callers can forward status edges downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    /// False when the update was dropped (invalid status, conflicting id).
    pub applied: bool,
    /// Set only on a status transition edge, not on level repeats.
    pub transition: Option<(DocumentStatus, DocumentStatus)>,
}

impl MergeOutcome {
    fn dropped() -> Self {
        Self {
            applied: false,
            transition: None,
        }
    }
}

/// Single source of truth for one candidate's document-collection state.
///
/// All writes go through [`merge`](Self::merge); reads are synchronous
/// snapshots. `revision` increases on every merge call, including dropped
/// ones, so consumers can detect that reconciliation is still alive.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusStore {
    status: DocumentStatus,
    collection_id: Option<CollectionId>,
    collection: Option<DocumentCollection>,
    revision: u64,
    is_loading: bool,
    error: Option<String>,
    consecutive_failures: u32,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that already knows which collection it tracks.
    pub fn for_collection(collection_id: CollectionId) -> Self {
        Self {
            collection_id: Some(collection_id),
            ..Self::default()
        }
    }

    /// Starts a fresh state for a (possibly new) collection id.
    ///
    /// The revision keeps counting across resets so liveness detection
    /// survives collection changes.
    pub fn reset(&mut self, collection_id: Option<CollectionId>) {
        let revision = self.revision + 1;
        *self = Self {
            collection_id,
            revision,
            ..Self::default()
        };
    }

    /// Marks the start of a fetch attempt: loading set, error cleared.
    pub fn begin_fetch(&mut self) {
        self.is_loading = true;
        self.error = None;
    }

    /// Applies a shallow update. Invalid status values and conflicting
    /// collection ids drop the whole update with a warning; prior state is
    /// kept. The revision is bumped unconditionally.
    pub fn merge(&mut self, update: StatusUpdate, source: MergeSource) -> MergeOutcome {
        self.revision += 1;
        self.is_loading = false;

        if let Some(message) = update.error {
            self.consecutive_failures += 1;
            pipeline_warn!(
                "merge source={source} recorded failure #{}: {message}",
                self.consecutive_failures
            );
            self.error = Some(message);
            return MergeOutcome {
                applied: true,
                transition: None,
            };
        }

        // Validate before touching anything so a bad update is a no-op.
        let parsed_status = match update.status.as_deref() {
            Some(raw) => match DocumentStatus::parse(raw) {
                Some(status) => Some(status),
                None => {
                    pipeline_warn!(
                        "merge source={source} dropped: invalid document status {raw:?}"
                    );
                    return MergeOutcome::dropped();
                }
            },
            None => None,
        };

        if let (Some(current), Some(incoming)) =
            (self.collection_id.as_deref(), update.collection_id.as_deref())
        {
            if current != incoming {
                // A new id means a new collection, not a mutation; adopting
                // one goes through `reset`.
                pipeline_warn!(
                    "merge source={source} dropped: collection id {incoming} conflicts with {current}"
                );
                return MergeOutcome::dropped();
            }
        }

        self.error = None;
        self.consecutive_failures = 0;

        if self.collection_id.is_none() {
            self.collection_id = update.collection_id;
        }

        // The payload is replaced wholesale. Partial document-array merges
        // are a known source of stale-data bugs; the embedded id never
        // overrides `collection_id`.
        if let Some(collection) = update.collection {
            self.collection = Some(collection);
        }

        let transition = match parsed_status {
            Some(next) if next != self.status => {
                let previous = self.status;
                self.status = next;
                Some((previous, next))
            }
            _ => None,
        };

        MergeOutcome {
            applied: true,
            transition,
        }
    }

    pub fn status(&self) -> DocumentStatus {
        self.status
    }

    pub fn collection_id(&self) -> Option<&str> {
        self.collection_id.as_deref()
    }

    pub fn collection(&self) -> Option<&DocumentCollection> {
        self.collection.as_ref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Failures since the last successful merge; feeds the repeated-failure
    /// notification rule.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Synchronous snapshot for the embedding view.
    pub fn view(&self) -> DocumentView {
        DocumentView {
            status: self.status,
            collection_id: self.collection_id.clone(),
            document_count: self
                .collection
                .as_ref()
                .map(|c| c.documents.len())
                .unwrap_or(0),
            verified_at: self.collection.as_ref().and_then(|c| c.verified_at),
            verified_by: self
                .collection
                .as_ref()
                .and_then(|c| c.verified_by.clone()),
            revision: self.revision,
            is_loading: self.is_loading,
            error: self.error.clone(),
        }
    }
}
