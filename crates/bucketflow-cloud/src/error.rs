//! Cloud provider error types
//!
//! Every adapter translates its native error vocabulary (CLI error codes,
//! HTTP status codes) into [`CloudError`] before it reaches the engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cloud provider errors
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource already exists: {0}")]
    Conflict(String),

    #[error("Provisioning failed: {0}")]
    Provisioning(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// Category of this error in the shared taxonomy
    pub fn kind(&self) -> FailureKind {
        match self {
            CloudError::InvalidName(_) => FailureKind::InvalidName,
            CloudError::AccessDenied(_) => FailureKind::AccessDenied,
            CloudError::NotFound(_) => FailureKind::NotFound,
            CloudError::Conflict(_) => FailureKind::Conflict,
            CloudError::Provisioning(_) => FailureKind::Provisioning,
            CloudError::InvalidConfig(_) => FailureKind::InvalidConfig,
            CloudError::Transport(_) | CloudError::Io(_) | CloudError::Json(_) => {
                FailureKind::Transport
            }
        }
    }

    /// Build an error of the given kind.
    pub fn from_kind(kind: FailureKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            FailureKind::InvalidName => CloudError::InvalidName(message),
            FailureKind::AccessDenied => CloudError::AccessDenied(message),
            FailureKind::NotFound => CloudError::NotFound(message),
            FailureKind::Conflict => CloudError::Conflict(message),
            FailureKind::Provisioning => CloudError::Provisioning(message),
            FailureKind::Transport => CloudError::Transport(message),
            FailureKind::InvalidConfig => CloudError::InvalidConfig(message),
        }
    }
}

/// Shared failure taxonomy reported in [`crate::Detail::Failure`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidName,
    AccessDenied,
    NotFound,
    Conflict,
    Provisioning,
    Transport,
    InvalidConfig,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::InvalidName => write!(f, "invalid-name"),
            FailureKind::AccessDenied => write!(f, "access-denied"),
            FailureKind::NotFound => write!(f, "not-found"),
            FailureKind::Conflict => write!(f, "conflict"),
            FailureKind::Provisioning => write!(f, "provisioning"),
            FailureKind::Transport => write!(f, "transport"),
            FailureKind::InvalidConfig => write!(f, "invalid-config"),
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_errors_are_transport() {
        let err: CloudError = std::io::Error::other("connection reset").into();
        assert_eq!(err.kind(), FailureKind::Transport);
    }

    #[test]
    fn test_from_kind_roundtrips_kind() {
        for kind in [
            FailureKind::InvalidName,
            FailureKind::AccessDenied,
            FailureKind::NotFound,
            FailureKind::Conflict,
            FailureKind::Provisioning,
            FailureKind::Transport,
            FailureKind::InvalidConfig,
        ] {
            assert_eq!(CloudError::from_kind(kind, "x").kind(), kind);
        }
    }
}
