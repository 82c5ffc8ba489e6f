use std::sync::Arc;

use approval_core::{InMemoryRegistrationStore, RegistrationStore, WorkflowError};
use chrono::Utc;
use shared::{
    domain::{Registration, RegistrationId, RegistrationStatus},
    error::{ApiError, ErrorCode},
    protocol::{RegistrationRecord, SubmitRegistrationRequest, UpdateStatusRequest},
};
use tracing::info;
use uuid::Uuid;

#[derive(Clone)]
pub struct RegistryContext {
    pub store: Arc<InMemoryRegistrationStore>,
}

impl RegistryContext {
    pub fn new(store: InMemoryRegistrationStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }
}

/// Lists one bucket, or every registration when no status is given.
pub async fn list_registrations(
    ctx: &RegistryContext,
    status: Option<&str>,
) -> Result<Vec<RegistrationRecord>, ApiError> {
    let registrations = match status {
        None => ctx.store.list_all().await,
        Some(raw) => {
            let status = raw
                .parse::<RegistrationStatus>()
                .map_err(|err| ApiError::new(ErrorCode::Validation, err.to_string()))?;
            ctx.store.list_by_status(status).await.map_err(store_error)?
        }
    };
    Ok(registrations.iter().map(RegistrationRecord::from).collect())
}

pub async fn update_status(
    ctx: &RegistryContext,
    id: &str,
    req: UpdateStatusRequest,
) -> Result<(), ApiError> {
    let id = RegistrationId::from(id);
    ctx.store
        .set_status(&id, req.status, req.reason.as_deref())
        .await
        .map_err(store_error)?;
    info!(registration_id = %id, status = %req.status, "registry: status updated");
    Ok(())
}

pub async fn submit_registration(
    ctx: &RegistryContext,
    req: SubmitRegistrationRequest,
) -> Result<RegistrationRecord, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::new(
            ErrorCode::Validation,
            "hotel name must not be empty",
        ));
    }

    let registration = Registration {
        id: RegistrationId::new(Uuid::new_v4().simple().to_string()),
        name: req.name.trim().to_string(),
        phone: req.phone,
        gst: req.gst,
        aadhar: req.aadhar,
        address: req.address,
        business_address: req.business_address,
        submitted_at: Utc::now(),
        status: RegistrationStatus::Pending,
        rejection_reason: None,
    };
    let record = RegistrationRecord::from(&registration);
    info!(registration_id = %registration.id, "registry: registration submitted");
    ctx.store.insert(registration).await;
    Ok(record)
}

fn store_error(err: WorkflowError) -> ApiError {
    match err {
        WorkflowError::NotFound(_) => {
            ApiError::new(ErrorCode::NotFound, "Hotel registration not found")
        }
        WorkflowError::Remote(message) => ApiError::new(ErrorCode::Validation, message),
        other => ApiError::new(ErrorCode::Internal, other.to_string()),
    }
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
