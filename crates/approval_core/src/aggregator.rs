//! Concurrent fetch of the three status buckets into one snapshot.

use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

use futures::future::join_all;
use shared::domain::{Registration, RegistrationId, RegistrationStatus};
use tracing::{debug, warn};

use crate::{error::WorkflowError, store::RegistrationStore};

/// Registrations grouped by status, each bucket in store return order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pending: Vec<Registration>,
    approved: Vec<Registration>,
    rejected: Vec<Registration>,
}

impl Snapshot {
    pub fn from_buckets(
        pending: Vec<Registration>,
        approved: Vec<Registration>,
        rejected: Vec<Registration>,
    ) -> Self {
        Self {
            pending,
            approved,
            rejected,
        }
    }

    pub fn bucket(&self, status: RegistrationStatus) -> &[Registration] {
        match status {
            RegistrationStatus::Pending => &self.pending,
            RegistrationStatus::Approved => &self.approved,
            RegistrationStatus::Rejected => &self.rejected,
        }
    }

    fn bucket_mut(&mut self, status: RegistrationStatus) -> &mut Vec<Registration> {
        match status {
            RegistrationStatus::Pending => &mut self.pending,
            RegistrationStatus::Approved => &mut self.approved,
            RegistrationStatus::Rejected => &mut self.rejected,
        }
    }

    /// Buckets in presentation order: pending, approved, rejected.
    pub fn buckets(&self) -> impl Iterator<Item = (RegistrationStatus, &[Registration])> {
        RegistrationStatus::ALL
            .into_iter()
            .map(move |status| (status, self.bucket(status)))
    }

    /// First match in presentation order.
    pub fn find(&self, id: &RegistrationId) -> Option<&Registration> {
        self.buckets()
            .flat_map(|(_, bucket)| bucket.iter())
            .find(|registration| &registration.id == id)
    }

    pub fn contains(&self, id: &RegistrationId) -> bool {
        self.find(id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets().all(|(_, bucket)| bucket.is_empty())
    }

    /// IDs that occur more than once across all buckets.
    pub fn duplicate_ids(&self) -> Vec<RegistrationId> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for registration in self.buckets().flat_map(|(_, bucket)| bucket.iter()) {
            if !seen.insert(&registration.id) && !duplicates.contains(&registration.id) {
                duplicates.push(registration.id.clone());
            }
        }
        duplicates
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialFailure {
    /// Successful buckets; failed buckets are left empty.
    pub snapshot: Snapshot,
    pub failed: BTreeMap<RegistrationStatus, WorkflowError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Complete(Snapshot),
    Partial(PartialFailure),
}

impl RefreshOutcome {
    pub fn snapshot(&self) -> &Snapshot {
        match self {
            Self::Complete(snapshot) => snapshot,
            Self::Partial(partial) => &partial.snapshot,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }

    pub fn failures(&self) -> Option<&BTreeMap<RegistrationStatus, WorkflowError>> {
        match self {
            Self::Complete(_) => None,
            Self::Partial(partial) => Some(&partial.failed),
        }
    }

    pub fn failed_statuses(&self) -> Vec<RegistrationStatus> {
        self.failures()
            .map(|failed| failed.keys().copied().collect())
            .unwrap_or_default()
    }
}

#[derive(Clone)]
pub struct BucketAggregator {
    store: Arc<dyn RegistrationStore>,
}

impl BucketAggregator {
    pub fn new(store: Arc<dyn RegistrationStore>) -> Self {
        Self { store }
    }

    /// Fetches every bucket concurrently and waits for all of them. A failing
    /// bucket neither cancels nor blocks its siblings.
    pub async fn refresh(&self) -> RefreshOutcome {
        let fetches = RegistrationStatus::ALL.map(|status| async move {
            (status, self.store.list_by_status(status).await)
        });
        let results = join_all(fetches).await;

        let mut snapshot = Snapshot::default();
        let mut failed = BTreeMap::new();
        for (status, result) in results {
            match result {
                Ok(registrations) => {
                    for registration in &registrations {
                        if registration.status != status {
                            warn!(
                                registration_id = %registration.id,
                                bucket = %status,
                                reported = %registration.status,
                                "aggregator: registration listed under a different status"
                            );
                        }
                    }
                    *snapshot.bucket_mut(status) = registrations;
                }
                Err(error) => {
                    warn!(bucket = %status, kind = %error.kind(), %error, "aggregator: bucket fetch failed");
                    failed.insert(status, error);
                }
            }
        }

        for id in snapshot.duplicate_ids() {
            warn!(registration_id = %id, "aggregator: registration appears in more than one bucket");
        }

        debug!(
            pending = snapshot.pending.len(),
            approved = snapshot.approved.len(),
            rejected = snapshot.rejected.len(),
            failed = failed.len(),
            "aggregator: refresh finished"
        );

        if failed.is_empty() {
            RefreshOutcome::Complete(snapshot)
        } else {
            RefreshOutcome::Partial(PartialFailure { snapshot, failed })
        }
    }
}

#[cfg(test)]
#[path = "tests/aggregator_tests.rs"]
mod tests;
