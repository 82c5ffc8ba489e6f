use std::fmt;

use shared::domain::{RegistrationId, RegistrationStatus};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Transport,
    Protocol,
    Remote,
    NotFound,
    InvalidTransition,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Transport => "transport",
            Self::Protocol => "protocol",
            Self::Remote => "remote",
            Self::NotFound => "not_found",
            Self::InvalidTransition => "invalid_transition",
        };
        f.write_str(label)
    }
}

/// Local precondition failures, raised before any remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidTransition {
    #[error("registration {id} is already {from}; only pending registrations can become {to}")]
    NotPending {
        id: RegistrationId,
        from: RegistrationStatus,
        to: RegistrationStatus,
    },
    #[error("registration {id} cannot be moved back to pending")]
    TargetNotTerminal { id: RegistrationId },
    #[error("rejecting registration {id} requires a non-empty reason")]
    MissingReason { id: RegistrationId },
    #[error("registration {id} is not in the loaded lists{}", unloaded_buckets(.failed))]
    NotLoaded {
        id: RegistrationId,
        /// Buckets that failed in the last committed refresh.
        failed: Vec<RegistrationStatus>,
    },
}

fn unloaded_buckets(failed: &[RegistrationStatus]) -> String {
    if failed.is_empty() {
        return String::new();
    }
    let names: Vec<_> = failed.iter().map(RegistrationStatus::as_str).collect();
    format!(" (could not load: {})", names.join(", "))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unexpected response from registration store: {0}")]
    Protocol(String),
    #[error("registration store reported a failure: {0}")]
    Remote(String),
    #[error("registration {0} is no longer available")]
    NotFound(RegistrationId),
    #[error("invalid transition: {0}")]
    InvalidTransition(#[from] InvalidTransition),
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Remote(_) => ErrorKind::Remote,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidTransition(_) => ErrorKind::InvalidTransition,
        }
    }

    /// Network and server-side failures may succeed on a later attempt.
    /// Local precondition violations and vanished registrations will not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Remote(_))
    }
}

impl From<reqwest::Error> for WorkflowError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Protocol(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}
