use async_trait::async_trait;
use shared::{
    domain::{Registration, RegistrationId, RegistrationStatus},
    error::RecordError,
    protocol::RegistrationRecord,
};
use tokio::sync::Mutex;

use crate::{error::WorkflowError, store::RegistrationStore};

/// Zero-latency store for the local profile and for the dev registry server.
///
/// Calls only fail for unknown IDs or for updates that would break the
/// status/reason pairing.
#[derive(Default)]
pub struct InMemoryRegistrationStore {
    registrations: Mutex<Vec<Registration>>,
}

impl InMemoryRegistrationStore {
    pub fn new(registrations: Vec<Registration>) -> Self {
        Self {
            registrations: Mutex::new(registrations),
        }
    }

    pub fn from_records(records: Vec<RegistrationRecord>) -> Result<Self, RecordError> {
        let registrations = records
            .into_iter()
            .map(Registration::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(registrations))
    }

    pub async fn insert(&self, registration: Registration) {
        self.registrations.lock().await.push(registration);
    }

    pub async fn list_all(&self) -> Vec<Registration> {
        self.registrations.lock().await.clone()
    }

    pub async fn get(&self, id: &RegistrationId) -> Option<Registration> {
        self.registrations
            .lock()
            .await
            .iter()
            .find(|registration| &registration.id == id)
            .cloned()
    }
}

#[async_trait]
impl RegistrationStore for InMemoryRegistrationStore {
    async fn list_by_status(
        &self,
        status: RegistrationStatus,
    ) -> Result<Vec<Registration>, WorkflowError> {
        Ok(self
            .registrations
            .lock()
            .await
            .iter()
            .filter(|registration| registration.status == status)
            .cloned()
            .collect())
    }

    async fn set_status(
        &self,
        id: &RegistrationId,
        status: RegistrationStatus,
        reason: Option<&str>,
    ) -> Result<(), WorkflowError> {
        let rejection_reason = match status {
            RegistrationStatus::Pending => {
                return Err(WorkflowError::Remote(
                    "status must be approved or rejected".to_string(),
                ));
            }
            RegistrationStatus::Approved => None,
            RegistrationStatus::Rejected => match reason.map(str::trim) {
                Some(reason) if !reason.is_empty() => Some(reason.to_string()),
                _ => {
                    return Err(WorkflowError::Remote(
                        "rejection reason is required".to_string(),
                    ));
                }
            },
        };

        let mut registrations = self.registrations.lock().await;
        let registration = registrations
            .iter_mut()
            .find(|registration| &registration.id == id)
            .ok_or_else(|| WorkflowError::NotFound(id.clone()))?;
        registration.status = status;
        registration.rejection_reason = rejection_reason;
        Ok(())
    }
}
