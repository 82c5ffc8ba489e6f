use std::sync::Arc;

use shared::domain::{Registration, RegistrationId, RegistrationStatus};
use tracing::{debug, info, warn};

use crate::{
    aggregator::{BucketAggregator, RefreshOutcome},
    error::{InvalidTransition, WorkflowError},
    store::RegistrationStore,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedTransition {
    pub id: RegistrationId,
    pub status: RegistrationStatus,
    /// Re-synchronization issued after the store confirmed the change.
    pub refresh: RefreshOutcome,
}

impl CommittedTransition {
    /// The registration as seen by the post-transition refresh.
    pub fn registration(&self) -> Option<&Registration> {
        self.refresh.snapshot().find(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedTransition {
    pub id: RegistrationId,
    /// The registration exactly as it was before the attempt, when known locally.
    pub original: Option<Registration>,
    pub error: WorkflowError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    Committed(CommittedTransition),
    Failed(FailedTransition),
}

impl TransitionOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed(_))
    }

    pub fn error(&self) -> Option<&WorkflowError> {
        match self {
            Self::Committed(_) => None,
            Self::Failed(failed) => Some(&failed.error),
        }
    }

    /// The store no longer knows this registration, so the local view is out
    /// of date. The outcome does not refresh by itself: the caller must run a
    /// full refresh, and until then the committed view is only marked stale.
    pub fn requires_refresh(&self) -> bool {
        matches!(self.error(), Some(WorkflowError::NotFound(_)))
    }

    pub(crate) fn failed(
        id: RegistrationId,
        original: Option<Registration>,
        error: WorkflowError,
    ) -> Self {
        Self::Failed(FailedTransition {
            id,
            original,
            error,
        })
    }
}

/// Checks what can be decided from the request alone: the target must be
/// terminal and a rejection needs a non-blank reason. Returns the trimmed
/// reason to send to the store, if any.
pub fn check_request(
    id: &RegistrationId,
    target: RegistrationStatus,
    reason: Option<&str>,
) -> Result<Option<String>, InvalidTransition> {
    match target {
        RegistrationStatus::Pending => Err(InvalidTransition::TargetNotTerminal { id: id.clone() }),
        RegistrationStatus::Rejected => match reason.map(str::trim) {
            Some(reason) if !reason.is_empty() => Ok(Some(reason.to_string())),
            _ => Err(InvalidTransition::MissingReason { id: id.clone() }),
        },
        RegistrationStatus::Approved => {
            if reason.is_some() {
                debug!(registration_id = %id, "transition: ignoring reason on approval");
            }
            Ok(None)
        }
    }
}

/// Checks the pending -> {approved, rejected} state machine and returns the
/// reason to send to the store, if any.
pub fn validate_transition(
    registration: &Registration,
    target: RegistrationStatus,
    reason: Option<&str>,
) -> Result<Option<String>, InvalidTransition> {
    let reason = check_request(&registration.id, target, reason)?;
    if !registration.is_pending() {
        return Err(InvalidTransition::NotPending {
            id: registration.id.clone(),
            from: registration.status,
            to: target,
        });
    }
    Ok(reason)
}

pub struct TransitionController {
    store: Arc<dyn RegistrationStore>,
    aggregator: BucketAggregator,
}

impl TransitionController {
    pub fn new(store: Arc<dyn RegistrationStore>, aggregator: BucketAggregator) -> Self {
        Self { store, aggregator }
    }

    /// Validates locally, asks the store to apply the change, then refreshes
    /// every bucket. Nothing is refreshed when validation or the store fails.
    pub async fn transition(
        &self,
        registration: &Registration,
        target: RegistrationStatus,
        reason: Option<&str>,
    ) -> TransitionOutcome {
        let id = registration.id.clone();
        let reason = match validate_transition(registration, target, reason) {
            Ok(reason) => reason,
            Err(invalid) => {
                warn!(registration_id = %id, %invalid, "transition: rejected locally");
                return TransitionOutcome::failed(id, Some(registration.clone()), invalid.into());
            }
        };

        if let Err(error) = self
            .store
            .set_status(&id, target, reason.as_deref())
            .await
        {
            warn!(
                registration_id = %id,
                target = %target,
                kind = %error.kind(),
                %error,
                "transition: store refused status change"
            );
            return TransitionOutcome::failed(id, Some(registration.clone()), error);
        }

        info!(registration_id = %id, status = %target, "transition: status change confirmed");
        let refresh = self.aggregator.refresh().await;
        TransitionOutcome::Committed(CommittedTransition {
            id,
            status: target,
            refresh,
        })
    }
}

#[cfg(test)]
#[path = "tests/transition_tests.rs"]
mod tests;
