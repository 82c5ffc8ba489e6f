use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{Registration, RegistrationId, RegistrationStatus},
    error::{ApiError, ErrorCode, RecordError},
};

/// Response envelope used by every registration endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            code: None,
        }
    }

    pub fn failure(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            code: Some(code),
        }
    }
}

impl<T> From<ApiError> for ApiEnvelope<T> {
    fn from(error: ApiError) -> Self {
        Self::failure(error.code, error.message)
    }
}

impl ApiEnvelope<()> {
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            code: None,
        }
    }
}

/// Registration as it travels over the wire. Stores built on document
/// databases key records by `_id`; plain `id` is accepted as well.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRecord {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub gst: String,
    #[serde(default)]
    pub aadhar: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub business_address: String,
    pub submitted_at: DateTime<Utc>,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

impl TryFrom<RegistrationRecord> for Registration {
    type Error = RecordError;

    fn try_from(record: RegistrationRecord) -> Result<Self, Self::Error> {
        let status = record.status.parse::<RegistrationStatus>()?;
        Registration {
            id: RegistrationId(record.id),
            name: record.name,
            phone: record.phone,
            gst: record.gst,
            aadhar: record.aadhar,
            address: record.address,
            business_address: record.business_address,
            submitted_at: record.submitted_at,
            status,
            rejection_reason: record.rejection_reason,
        }
        .validated()
    }
}

impl From<&Registration> for RegistrationRecord {
    fn from(registration: &Registration) -> Self {
        Self {
            id: registration.id.0.clone(),
            name: registration.name.clone(),
            phone: registration.phone.clone(),
            gst: registration.gst.clone(),
            aadhar: registration.aadhar.clone(),
            address: registration.address.clone(),
            business_address: registration.business_address.clone(),
            submitted_at: registration.submitted_at,
            status: registration.status.as_str().to_string(),
            rejection_reason: registration.rejection_reason.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListRegistrationsQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: RegistrationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRegistrationRequest {
    pub name: String,
    pub phone: String,
    pub gst: String,
    pub aadhar: String,
    pub address: String,
    pub business_address: String,
}
