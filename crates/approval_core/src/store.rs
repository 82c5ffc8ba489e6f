use async_trait::async_trait;
use shared::domain::{Registration, RegistrationId, RegistrationStatus};

use crate::error::WorkflowError;

/// Boundary to the collection that owns registrations.
///
/// Implementations classify failures into [`WorkflowError`] kinds and never
/// retry. `reason` is only meaningful for [`RegistrationStatus::Rejected`].
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    async fn list_by_status(
        &self,
        status: RegistrationStatus,
    ) -> Result<Vec<Registration>, WorkflowError>;

    async fn set_status(
        &self,
        id: &RegistrationId,
        status: RegistrationStatus,
        reason: Option<&str>,
    ) -> Result<(), WorkflowError>;
}
