use std::{collections::BTreeMap, sync::Arc};

use shared::domain::{Registration, RegistrationId, RegistrationStatus};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::{
    aggregator::{BucketAggregator, RefreshOutcome, Snapshot},
    error::{ErrorKind, InvalidTransition, WorkflowError},
    memory_store::InMemoryRegistrationStore,
    projection::{self, BucketCounts, Projection},
    store::RegistrationStore,
    transition::{check_request, TransitionController, TransitionOutcome},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    SnapshotRefreshed {
        counts: BucketCounts,
        failed: Vec<RegistrationStatus>,
    },
    TransitionCommitted {
        id: RegistrationId,
        status: RegistrationStatus,
    },
    TransitionFailed {
        id: RegistrationId,
        kind: ErrorKind,
    },
    SelectionCleared {
        id: RegistrationId,
    },
}

#[derive(Default)]
struct WorkflowState {
    snapshot: Snapshot,
    failed: BTreeMap<RegistrationStatus, WorkflowError>,
    selection: Option<RegistrationId>,
    stale: bool,
}

/// Owns the snapshot and selection for one moderation session.
///
/// Refreshes and transitions run one at a time behind `refresh_gate`, so a
/// slower refresh can never commit over a newer one. Callers only observe
/// committed snapshots.
pub struct WorkflowManager {
    aggregator: BucketAggregator,
    transitions: TransitionController,
    refresh_gate: Mutex<()>,
    state: RwLock<WorkflowState>,
    events: broadcast::Sender<WorkflowEvent>,
}

impl WorkflowManager {
    pub fn new(store: Arc<dyn RegistrationStore>) -> Self {
        let aggregator = BucketAggregator::new(Arc::clone(&store));
        let transitions = TransitionController::new(store, aggregator.clone());
        let (events, _) = broadcast::channel(256);
        Self {
            aggregator,
            transitions,
            refresh_gate: Mutex::new(()),
            state: RwLock::new(WorkflowState::default()),
            events,
        }
    }

    /// Local profile: an in-memory store seeded with `registrations`.
    pub fn local(registrations: Vec<Registration>) -> Self {
        Self::new(Arc::new(InMemoryRegistrationStore::new(registrations)))
    }

    pub async fn refresh(&self) -> RefreshOutcome {
        let _gate = self.refresh_gate.lock().await;
        let outcome = self.aggregator.refresh().await;
        self.commit(&outcome, None).await;
        outcome
    }

    /// Refresh is all-or-nothing concurrent, so retrying the failed buckets
    /// re-runs the full refresh.
    pub async fn retry_failed_buckets(&self) -> RefreshOutcome {
        {
            let state = self.state.read().await;
            let failed: Vec<_> = state.failed.keys().map(|status| status.as_str()).collect();
            debug!(?failed, "workflow: retrying failed buckets");
        }
        self.refresh().await
    }

    pub async fn approve(&self, id: &RegistrationId) -> TransitionOutcome {
        self.transition(id, RegistrationStatus::Approved, None).await
    }

    pub async fn reject(&self, id: &RegistrationId, reason: &str) -> TransitionOutcome {
        self.transition(id, RegistrationStatus::Rejected, Some(reason))
            .await
    }

    async fn transition(
        &self,
        id: &RegistrationId,
        target: RegistrationStatus,
        reason: Option<&str>,
    ) -> TransitionOutcome {
        let _gate = self.refresh_gate.lock().await;

        let (current, unloaded) = {
            let state = self.state.read().await;
            let unloaded: Vec<_> = state.failed.keys().copied().collect();
            (state.snapshot.find(id).cloned(), unloaded)
        };

        if let Err(invalid) = check_request(id, target, reason) {
            warn!(registration_id = %id, %invalid, "workflow: transition rejected locally");
            return self.refuse(id, current, invalid.into());
        }

        let Some(registration) = current else {
            warn!(
                registration_id = %id,
                unloaded = ?unloaded,
                "workflow: transition requested for registration outside the loaded lists"
            );
            let invalid = InvalidTransition::NotLoaded {
                id: id.clone(),
                failed: unloaded,
            };
            return self.refuse(id, None, invalid.into());
        };

        let outcome = self
            .transitions
            .transition(&registration, target, reason)
            .await;

        match &outcome {
            TransitionOutcome::Committed(committed) => {
                self.commit(&committed.refresh, Some(id)).await;
                self.emit(WorkflowEvent::TransitionCommitted {
                    id: id.clone(),
                    status: committed.status,
                });
            }
            TransitionOutcome::Failed(failed) => {
                if outcome.requires_refresh() {
                    self.state.write().await.stale = true;
                    info!(registration_id = %id, "workflow: view marked stale");
                }
                self.emit(WorkflowEvent::TransitionFailed {
                    id: id.clone(),
                    kind: failed.error.kind(),
                });
            }
        }
        outcome
    }

    fn refuse(
        &self,
        id: &RegistrationId,
        original: Option<Registration>,
        error: WorkflowError,
    ) -> TransitionOutcome {
        self.emit(WorkflowEvent::TransitionFailed {
            id: id.clone(),
            kind: error.kind(),
        });
        TransitionOutcome::failed(id.clone(), original, error)
    }

    /// Swaps in a refreshed snapshot and clears a selection that is gone or
    /// was just transitioned, in one write.
    async fn commit(&self, outcome: &RefreshOutcome, transitioned: Option<&RegistrationId>) {
        let counts = projection::counts(outcome.snapshot());
        let cleared = {
            let mut state = self.state.write().await;
            state.snapshot = outcome.snapshot().clone();
            state.failed = outcome.failures().cloned().unwrap_or_default();
            state.stale = false;

            let drop_selection = state.selection.as_ref().is_some_and(|selected| {
                transitioned == Some(selected) || !state.snapshot.contains(selected)
            });
            if drop_selection {
                state.selection.take()
            } else {
                None
            }
        };

        self.emit(WorkflowEvent::SnapshotRefreshed {
            counts,
            failed: outcome.failed_statuses(),
        });
        if let Some(id) = cleared {
            debug!(registration_id = %id, "workflow: selection cleared");
            self.emit(WorkflowEvent::SelectionCleared { id });
        }
    }

    pub async fn projection(&self, tab: RegistrationStatus) -> Projection {
        let state = self.state.read().await;
        Projection {
            stale: state.stale,
            ..projection::project(&state.snapshot, tab)
        }
    }

    pub async fn select(&self, id: &RegistrationId) -> Result<Registration, WorkflowError> {
        let mut state = self.state.write().await;
        let registration = state
            .snapshot
            .find(id)
            .cloned()
            .ok_or_else(|| WorkflowError::NotFound(id.clone()))?;
        state.selection = Some(id.clone());
        Ok(registration)
    }

    pub async fn clear_selection(&self) {
        let cleared = self.state.write().await.selection.take();
        if let Some(id) = cleared {
            self.emit(WorkflowEvent::SelectionCleared { id });
        }
    }

    pub async fn selected_detail(&self) -> Option<Registration> {
        let state = self.state.read().await;
        projection::detail(&state.snapshot, state.selection.as_ref())
    }

    pub async fn failed_buckets(&self) -> BTreeMap<RegistrationStatus, WorkflowError> {
        self.state.read().await.failed.clone()
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.state.read().await.snapshot.clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: WorkflowEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/manager_tests.rs"]
mod tests;
