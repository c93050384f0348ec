use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use pipeline_logging::{pipeline_debug, pipeline_info, pipeline_warn};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use pipeline_core::{
    DocumentCollection, DocumentStatus, MergeSource, NotificationKind, StatusUpdate,
};

use crate::api::ApiError;
use crate::bus::BusEvent;
use crate::session::{SharedState, SyncEvent};

/// Which signal source asked for a reconciliation pass. All five sources
/// funnel through the same fetch path; the reason only tags the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    Mount,
    CollectionChanged,
    PollTick,
    FocusRegained,
    VisibilityVisible,
    BusHint,
}

impl TriggerReason {
    /// Focus and visibility tend to fire together; both go through the
    /// debounce window.
    fn is_debounced(&self) -> bool {
        matches!(self, Self::FocusRegained | Self::VisibilityVisible)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mount => "mount",
            Self::CollectionChanged => "collection-changed",
            Self::PollTick => "poll-tick",
            Self::FocusRegained => "focus-regained",
            Self::VisibilityVisible => "visibility-visible",
            Self::BusHint => "bus-hint",
        }
    }
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    /// Poll cadence while a collection id is known.
    pub poll_interval: Duration,
    /// Window inside which focus/visibility triggers are dropped after a
    /// fetch already started.
    pub visibility_debounce: Duration,
    /// Consecutive fetch failures before a degraded-sync toast.
    pub failure_toast_threshold: u32,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            visibility_debounce: Duration::from_millis(300),
            failure_toast_threshold: 2,
        }
    }
}

/// Handle to the background reconciler task.
#[derive(Debug, Clone)]
pub struct ReconcilerHandle {
    trigger_tx: mpsc::UnboundedSender<TriggerReason>,
    cancel: CancellationToken,
}

impl ReconcilerHandle {
    /// Requests a reconciliation pass. Never blocks; triggers queued while
    /// a fetch is in flight collapse into it.
    pub fn trigger(&self, reason: TriggerReason) {
        let _ = self.trigger_tx.send(reason);
    }

    /// Stops the polling task. In-flight work is abandoned at the next
    /// await point, so no merge lands after shutdown.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

pub(crate) fn spawn(
    shared: Arc<SharedState>,
    bus_rx: broadcast::Receiver<BusEvent>,
) -> ReconcilerHandle {
    let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    tokio::spawn(run(shared, trigger_rx, bus_rx, cancel.clone()));
    ReconcilerHandle { trigger_tx, cancel }
}

async fn run(
    shared: Arc<SharedState>,
    mut trigger_rx: mpsc::UnboundedReceiver<TriggerReason>,
    mut bus_rx: broadcast::Receiver<BusEvent>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(shared.settings.poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick of a tokio interval completes immediately; the mount
    // trigger already covers it.
    interval.tick().await;

    let mut bus_open = true;
    let mut last_fetch: Option<Instant> = None;

    loop {
        let reason = tokio::select! {
            _ = cancel.cancelled() => break,
            maybe = trigger_rx.recv() => match maybe {
                Some(reason) => reason,
                None => break,
            },
            _ = interval.tick() => TriggerReason::PollTick,
            event = next_bus_event(&mut bus_rx, &mut bus_open) => {
                let Some(event) = event else { continue };
                let matches = {
                    let store = shared.store.lock().expect("lock status store");
                    store.collection_id() == Some(event.collection_id())
                };
                if !matches {
                    pipeline_debug!(
                        "ignoring bus event for foreign collection {}",
                        event.collection_id()
                    );
                    continue;
                }
                TriggerReason::BusHint
            }
        };

        if reason.is_debounced() {
            if let Some(at) = last_fetch {
                if at.elapsed() < shared.settings.visibility_debounce {
                    pipeline_debug!("trigger {reason} debounced");
                    continue;
                }
            }
        }

        // Coalesce queued triggers into this pass; one in-flight fetch per
        // collection id.
        let coalesced = drain_triggers(&mut trigger_rx);
        if coalesced > 0 {
            pipeline_debug!("coalesced {coalesced} queued triggers into one fetch");
        }

        let collection_id = {
            let store = shared.store.lock().expect("lock status store");
            store.collection_id().map(str::to_string)
        };
        let Some(collection_id) = collection_id else {
            pipeline_debug!("trigger {reason} skipped: no collection id yet");
            continue;
        };

        last_fetch = Some(Instant::now());
        // Shutdown aborts an in-flight fetch so no merge lands after the
        // owning view is gone.
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = reconcile(&shared, &collection_id, reason) => {}
        }

        // Triggers that arrived mid-fetch were satisfied by this snapshot.
        drain_triggers(&mut trigger_rx);
    }
    pipeline_debug!("reconciler stopped for candidate {}", shared.candidate_id);
}

fn drain_triggers(trigger_rx: &mut mpsc::UnboundedReceiver<TriggerReason>) -> usize {
    let mut drained = 0;
    while trigger_rx.try_recv().is_ok() {
        drained += 1;
    }
    drained
}

/// Receives the next bus event, skipping lag gaps. Once the bus closes the
/// branch parks forever instead of spinning.
async fn next_bus_event(
    bus_rx: &mut broadcast::Receiver<BusEvent>,
    open: &mut bool,
) -> Option<BusEvent> {
    if !*open {
        return std::future::pending().await;
    }
    loop {
        match bus_rx.recv().await {
            Ok(event) => return Some(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                // Hints are lossy by design; the poll loop covers the gap.
                pipeline_debug!("bus receiver lagged, skipped {skipped} hints");
            }
            Err(broadcast::error::RecvError::Closed) => {
                *open = false;
                return None;
            }
        }
    }
}

async fn reconcile(shared: &Arc<SharedState>, collection_id: &str, reason: TriggerReason) {
    pipeline_debug!("reconcile trigger={reason} collection={collection_id}");
    {
        let mut store = shared.store.lock().expect("lock status store");
        store.begin_fetch();
    }
    match shared.api.fetch_collection(collection_id).await {
        Ok(snapshot) => apply_snapshot(shared, snapshot, MergeSource::Fetch),
        Err(err) => {
            pipeline_warn!("fetch failed trigger={reason} collection={collection_id}: {err}");
            record_failure(shared, collection_id, &err);
            // Stale-but-valid beats undefined: prior state is kept, and the
            // list scan recovers from an invalid or garbage-collected id.
            list_scan(shared).await;
        }
    }
}

fn record_failure(shared: &Arc<SharedState>, collection_id: &str, err: &ApiError) {
    let (revision, failures) = {
        let mut store = shared.store.lock().expect("lock status store");
        store.merge(StatusUpdate::failure(err.to_string()), MergeSource::Fetch);
        (store.revision(), store.consecutive_failures())
    };
    let _ = shared.events.send(SyncEvent::Updated { revision });

    if failures == shared.settings.failure_toast_threshold {
        let notification = {
            let mut deduper = shared.deduper.lock().expect("lock deduplicator");
            deduper.notify(
                NotificationKind::SyncFailure,
                collection_id,
                "degraded",
                format!("Having trouble refreshing documents: {err}"),
            )
        };
        if let Some(notification) = notification {
            let _ = shared.events.send(SyncEvent::Toast(notification));
        }
    }
}

async fn list_scan(shared: &Arc<SharedState>) {
    match shared.api.list_collections().await {
        Ok(collections) => {
            let found = collections
                .into_iter()
                .find(|c| c.matches(&shared.candidate_id, &shared.session_id));
            let Some(collection) = found else {
                pipeline_debug!(
                    "list scan found no collection for candidate {}",
                    shared.candidate_id
                );
                return;
            };
            let adopt = {
                let store = shared.store.lock().expect("lock status store");
                store.collection_id() != Some(collection.id.as_str())
            };
            if adopt {
                pipeline_info!(
                    "list scan adopting collection {} for candidate {}",
                    collection.id,
                    shared.candidate_id
                );
                let mut store = shared.store.lock().expect("lock status store");
                store.reset(Some(collection.id.clone()));
            }
            apply_snapshot(shared, collection, MergeSource::ListScan);
        }
        Err(err) => pipeline_warn!("list scan failed: {err}"),
    }
}

/// Merges a fetched snapshot and forwards any status transition edge (not
/// level) to the deduplicator.
pub(crate) fn apply_snapshot(
    shared: &Arc<SharedState>,
    snapshot: DocumentCollection,
    source: MergeSource,
) {
    let entity_id = snapshot.id.clone();
    let (outcome, revision) = {
        let mut store = shared.store.lock().expect("lock status store");
        let outcome = store.merge(StatusUpdate::from_snapshot(snapshot), source);
        (outcome, store.revision())
    };
    let _ = shared.events.send(SyncEvent::Updated { revision });

    if let Some((previous, next)) = outcome.transition {
        pipeline_info!("document status {previous} -> {next} source={source}");
        let notification = {
            let mut deduper = shared.deduper.lock().expect("lock deduplicator");
            deduper.notify(
                NotificationKind::DocumentStatus,
                &entity_id,
                next.as_str(),
                document_status_message(next),
            )
        };
        if let Some(notification) = notification {
            let _ = shared.events.send(SyncEvent::Toast(notification));
        }
    }
}

fn document_status_message(status: DocumentStatus) -> &'static str {
    match status {
        DocumentStatus::Unknown => "Document status unknown",
        DocumentStatus::Requested => "Document collection requested",
        DocumentStatus::Uploaded => "Candidate uploaded documents",
        DocumentStatus::Verified => "Documents verified",
        DocumentStatus::Rejected => "Documents rejected",
    }
}
