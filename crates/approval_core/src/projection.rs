//! Pure view derivation over a [`Snapshot`]; no I/O, no shared state.

use shared::domain::{Registration, RegistrationId, RegistrationStatus};

use crate::aggregator::Snapshot;

/// Badge counts for the three tabs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BucketCounts {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl BucketCounts {
    pub fn get(&self, status: RegistrationStatus) -> usize {
        match status {
            RegistrationStatus::Pending => self.pending,
            RegistrationStatus::Approved => self.approved,
            RegistrationStatus::Rejected => self.rejected,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.approved + self.rejected
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub tab: RegistrationStatus,
    pub items: Vec<Registration>,
    pub counts: BucketCounts,
    /// Set when a transition found the view out of date and no refresh has
    /// been committed since.
    pub stale: bool,
}

pub fn counts(snapshot: &Snapshot) -> BucketCounts {
    BucketCounts {
        pending: snapshot.bucket(RegistrationStatus::Pending).len(),
        approved: snapshot.bucket(RegistrationStatus::Approved).len(),
        rejected: snapshot.bucket(RegistrationStatus::Rejected).len(),
    }
}

pub fn project(snapshot: &Snapshot, tab: RegistrationStatus) -> Projection {
    Projection {
        tab,
        items: snapshot.bucket(tab).to_vec(),
        counts: counts(snapshot),
        stale: false,
    }
}

pub fn detail(snapshot: &Snapshot, selection: Option<&RegistrationId>) -> Option<Registration> {
    selection.and_then(|id| snapshot.find(id)).cloned()
}

#[cfg(test)]
#[path = "tests/projection_tests.rs"]
mod tests;
