use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Registration, RegistrationId, RegistrationStatus},
    error::ErrorCode,
    protocol::{ApiEnvelope, RegistrationRecord, UpdateStatusRequest},
};
use tracing::{debug, warn};
use url::Url;

use crate::{error::WorkflowError, store::RegistrationStore};

const REGISTRATIONS_PATH: [&str; 3] = ["api", "hotels", "registrations"];

/// [`RegistrationStore`] backed by the hotel registrations HTTP API.
pub struct HttpRegistrationStore {
    http: Client,
    base_url: Url,
}

impl HttpRegistrationStore {
    pub fn new(server_url: &str, request_timeout: Duration) -> anyhow::Result<Self> {
        let base_url = Url::parse(server_url.trim())
            .with_context(|| format!("invalid registration store url '{server_url}'"))?;
        if base_url.cannot_be_a_base() {
            bail!("registration store url '{server_url}' cannot carry a path");
        }
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, extra: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in new(), so segments are always available
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(REGISTRATIONS_PATH)
                .extend(extra);
        }
        url
    }
}

#[async_trait]
impl RegistrationStore for HttpRegistrationStore {
    async fn list_by_status(
        &self,
        status: RegistrationStatus,
    ) -> Result<Vec<Registration>, WorkflowError> {
        let url = self.endpoint(&[]);
        debug!(%url, %status, "store: listing registrations");
        let response = self
            .http
            .get(url)
            .query(&[("status", status.as_str())])
            .send()
            .await?;
        let envelope: ApiEnvelope<Vec<RegistrationRecord>> =
            read_envelope(response, None).await?;
        let records = envelope.data.ok_or_else(|| {
            WorkflowError::Protocol(format!("{status} listing succeeded without data"))
        })?;

        records
            .into_iter()
            .map(|record| {
                if record.rejection_reason.is_some()
                    && !record.status.trim().eq_ignore_ascii_case("rejected")
                {
                    warn!(
                        registration_id = %record.id,
                        status = %record.status,
                        "store: dropping rejection reason on non-rejected registration"
                    );
                }
                Registration::try_from(record)
                    .map_err(|err| WorkflowError::Protocol(err.to_string()))
            })
            .collect()
    }

    async fn set_status(
        &self,
        id: &RegistrationId,
        status: RegistrationStatus,
        reason: Option<&str>,
    ) -> Result<(), WorkflowError> {
        let url = self.endpoint(&[id.as_str(), "status"]);
        let body = UpdateStatusRequest {
            status,
            reason: match status {
                RegistrationStatus::Rejected => reason.map(str::to_string),
                RegistrationStatus::Pending | RegistrationStatus::Approved => None,
            },
        };
        debug!(%url, registration_id = %id, %status, "store: updating registration status");
        let response = self.http.put(url).json(&body).send().await?;
        read_envelope::<serde_json::Value>(response, Some(id)).await?;
        Ok(())
    }
}

/// Classifies a response: 404 on an addressed registration is `NotFound`,
/// any other non-success HTTP status or `success: false` is `Remote`, and a
/// body that does not decode as an envelope is `Protocol`.
async fn read_envelope<T: DeserializeOwned>(
    response: Response,
    addressed: Option<&RegistrationId>,
) -> Result<ApiEnvelope<T>, WorkflowError> {
    let http_status = response.status();
    if http_status == StatusCode::NOT_FOUND {
        if let Some(id) = addressed {
            return Err(WorkflowError::NotFound(id.clone()));
        }
    }

    let body = response.bytes().await?;
    let parsed = serde_json::from_slice::<ApiEnvelope<T>>(&body);

    if !http_status.is_success() {
        let message = parsed
            .ok()
            .and_then(|envelope| envelope.message)
            .unwrap_or_else(|| format!("HTTP error! status: {}", http_status.as_u16()));
        return Err(WorkflowError::Remote(message));
    }

    let envelope = parsed.map_err(|err| WorkflowError::Protocol(err.to_string()))?;
    if !envelope.success {
        if let (Some(ErrorCode::NotFound), Some(id)) = (envelope.code, addressed) {
            return Err(WorkflowError::NotFound(id.clone()));
        }
        return Err(WorkflowError::Remote(
            envelope
                .message
                .unwrap_or_else(|| "registration store reported failure".to_string()),
        ));
    }
    Ok(envelope)
}

#[cfg(test)]
#[path = "tests/http_store_tests.rs"]
mod tests;
