use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::RegistrationId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    Validation,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// A registration record that cannot be represented as a [`crate::domain::Registration`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("unknown registration status '{0}'")]
    UnknownStatus(String),
    #[error("rejected registration {0} has no rejection reason")]
    MissingRejectionReason(RegistrationId),
}
