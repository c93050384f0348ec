use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use pipeline_core::CollectionId;

/// Advisory event shared between independent UI surfaces (upload form,
/// verification panel, detail page).
///
/// Payloads are hints to re-fetch, never trusted state: a listener confirms
/// through its own reconciler fetch rather than applying `data` directly.
#[derive(Debug, Clone)]
pub enum BusEvent {
    DocumentVerified {
        collection_id: CollectionId,
        status: String,
        data: Option<serde_json::Value>,
        timestamp: DateTime<Utc>,
    },
}

impl BusEvent {
    pub fn collection_id(&self) -> &str {
        match self {
            Self::DocumentVerified { collection_id, .. } => collection_id,
        }
    }

    pub fn document_verified(collection_id: impl Into<CollectionId>, status: impl Into<String>) -> Self {
        Self::DocumentVerified {
            collection_id: collection_id.into(),
            status: status.into(),
            data: None,
            timestamp: Utc::now(),
        }
    }
}

/// Process-wide broadcast channel. Any surface may publish or subscribe;
/// none may mutate another's state directly.
#[derive(Debug, Clone)]
pub struct CrossComponentBus {
    tx: broadcast::Sender<BusEvent>,
}

impl CrossComponentBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.tx.subscribe()
    }

    /// Publishes to all current subscribers. Returns how many received it;
    /// zero subscribers is not an error for an advisory channel.
    pub fn publish(&self, event: BusEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }
}

impl Default for CrossComponentBus {
    fn default() -> Self {
        Self::new(64)
    }
}
