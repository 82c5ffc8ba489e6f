use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RecordError;

/// Opaque identifier assigned by the registration store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrationId(pub String);

impl RegistrationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegistrationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Moderation status. Declaration order is the bucket presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Pending,
    Approved,
    Rejected,
}

impl RegistrationStatus {
    pub const ALL: [RegistrationStatus; 3] = [Self::Pending, Self::Approved, Self::Rejected];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationStatus {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(RecordError::UnknownStatus(other.to_string())),
        }
    }
}

/// A hotel registration as last observed from the store.
///
/// `rejection_reason` is `Some` exactly when `status` is `Rejected`; values
/// built through [`Registration::validated`] uphold this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: RegistrationId,
    pub name: String,
    pub phone: String,
    pub gst: String,
    pub aadhar: String,
    pub address: String,
    pub business_address: String,
    pub submitted_at: DateTime<Utc>,
    pub status: RegistrationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

impl Registration {
    /// Enforces the status/reason pairing. A reason on a non-rejected
    /// registration is dropped; a rejected one without a reason is an error.
    pub fn validated(mut self) -> Result<Self, RecordError> {
        match self.status {
            RegistrationStatus::Rejected => {
                let has_reason = self
                    .rejection_reason
                    .as_deref()
                    .is_some_and(|reason| !reason.trim().is_empty());
                if !has_reason {
                    return Err(RecordError::MissingRejectionReason(self.id));
                }
            }
            RegistrationStatus::Pending | RegistrationStatus::Approved => {
                self.rejection_reason = None;
            }
        }
        Ok(self)
    }

    pub fn is_pending(&self) -> bool {
        self.status == RegistrationStatus::Pending
    }
}
