use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use shared::domain::{Registration, RegistrationId, RegistrationStatus};
use tokio::sync::{Barrier, Mutex, Semaphore};

use crate::{
    error::WorkflowError, memory_store::InMemoryRegistrationStore, store::RegistrationStore,
};

pub(crate) fn registration(id: &str, status: RegistrationStatus) -> Registration {
    Registration {
        id: RegistrationId::from(id),
        name: format!("Hotel {id}"),
        phone: "9876543210".to_string(),
        gst: "22AAAAA0000A1Z5".to_string(),
        aadhar: "1234 5678 9012".to_string(),
        address: "12 Beach Road".to_string(),
        business_address: "12 Beach Road, Goa".to_string(),
        submitted_at: Utc
            .with_ymd_and_hms(2024, 1, 1, 9, 30, 0)
            .single()
            .expect("timestamp"),
        status,
        rejection_reason: (status == RegistrationStatus::Rejected)
            .then(|| "incomplete documents".to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SetStatusCall {
    pub id: RegistrationId,
    pub status: RegistrationStatus,
    pub reason: Option<String>,
}

/// In-memory store that records calls and injects failures.
pub(crate) struct StubStore {
    pub inner: InMemoryRegistrationStore,
    list_failures: Mutex<HashMap<RegistrationStatus, WorkflowError>>,
    set_status_failure: Mutex<Option<WorkflowError>>,
    list_calls: Mutex<Vec<RegistrationStatus>>,
    set_status_calls: Mutex<Vec<SetStatusCall>>,
    rendezvous: Option<Arc<Barrier>>,
    hold_lists: Mutex<Option<Arc<Semaphore>>>,
}

impl StubStore {
    pub fn new(registrations: Vec<Registration>) -> Self {
        Self {
            inner: InMemoryRegistrationStore::new(registrations),
            list_failures: Mutex::new(HashMap::new()),
            set_status_failure: Mutex::new(None),
            list_calls: Mutex::new(Vec::new()),
            set_status_calls: Mutex::new(Vec::new()),
            rendezvous: None,
            hold_lists: Mutex::new(None),
        }
    }

    /// Every listing waits until all three listings are in flight.
    pub fn with_rendezvous(mut self) -> Self {
        self.rendezvous = Some(Arc::new(Barrier::new(RegistrationStatus::ALL.len())));
        self
    }

    pub async fn fail_list(&self, status: RegistrationStatus, error: WorkflowError) {
        self.list_failures.lock().await.insert(status, error);
    }

    pub async fn heal_lists(&self) {
        self.list_failures.lock().await.clear();
    }

    pub async fn fail_set_status(&self, error: WorkflowError) {
        *self.set_status_failure.lock().await = Some(error);
    }

    /// Listings read their data, then park until a permit is added.
    pub async fn hold_lists(&self) -> Arc<Semaphore> {
        let semaphore = Arc::new(Semaphore::new(0));
        *self.hold_lists.lock().await = Some(Arc::clone(&semaphore));
        semaphore
    }

    pub async fn release_lists(&self) {
        self.hold_lists.lock().await.take();
    }

    pub async fn list_calls(&self) -> Vec<RegistrationStatus> {
        self.list_calls.lock().await.clone()
    }

    pub async fn set_status_calls(&self) -> Vec<SetStatusCall> {
        self.set_status_calls.lock().await.clone()
    }
}

#[async_trait]
impl RegistrationStore for StubStore {
    async fn list_by_status(
        &self,
        status: RegistrationStatus,
    ) -> Result<Vec<Registration>, WorkflowError> {
        self.list_calls.lock().await.push(status);
        if let Some(barrier) = &self.rendezvous {
            barrier.wait().await;
        }

        let failure = self.list_failures.lock().await.get(&status).cloned();
        let result = match failure {
            Some(error) => Err(error),
            None => self.inner.list_by_status(status).await,
        };

        let hold = self.hold_lists.lock().await.clone();
        if let Some(semaphore) = hold {
            semaphore.acquire().await.expect("semaphore open").forget();
        }
        result
    }

    async fn set_status(
        &self,
        id: &RegistrationId,
        status: RegistrationStatus,
        reason: Option<&str>,
    ) -> Result<(), WorkflowError> {
        self.set_status_calls.lock().await.push(SetStatusCall {
            id: id.clone(),
            status,
            reason: reason.map(str::to_string),
        });
        if let Some(error) = self.set_status_failure.lock().await.clone() {
            return Err(error);
        }
        self.inner.set_status(id, status, reason).await
    }
}
