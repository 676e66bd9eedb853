//! GCP provider error types

use bucketflow_cloud::CloudError;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GcsError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("GCP project is not set (use --project or GOOGLE_CLOUD_PROJECT)")]
    MissingProject,

    #[error("GCS API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl GcsError {
    /// Build an error from a non-success response body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ApiErrorResponse>(body)
            .map(|r| r.error.message)
            .unwrap_or_else(|_| body.trim().to_string());
        GcsError::Api { status, message }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            GcsError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<GcsError> for CloudError {
    fn from(err: GcsError) -> Self {
        let message = err.to_string();
        match &err {
            GcsError::MissingEnvVar(_) | GcsError::MissingProject | GcsError::InvalidEndpoint(_) => {
                CloudError::InvalidConfig(message)
            }
            GcsError::Http(_) | GcsError::JsonError(_) => CloudError::Transport(message),
            GcsError::Api { status, message: api_message } => match *status {
                401 | 403 => CloudError::AccessDenied(message),
                404 => CloudError::NotFound(message),
                // 409 also covers names owned by other projects and non-empty buckets
                409 if api_message.contains("already own") => CloudError::Conflict(message),
                400 if api_message.to_lowercase().contains("bucket name") => {
                    CloudError::InvalidName(message)
                }
                400 => CloudError::InvalidConfig(message),
                408 | 429 | 500..=599 => CloudError::Transport(message),
                _ => CloudError::Provisioning(message),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

pub type Result<T> = std::result::Result<T, GcsError>;

#[cfg(test)]
mod tests {
    use super::*;
    use bucketflow_cloud::FailureKind;

    fn kind(status: u16, message: &str) -> FailureKind {
        CloudError::from(GcsError::Api {
            status,
            message: message.to_string(),
        })
        .kind()
    }

    #[test]
    fn test_parse_error_body() {
        let body = r#"{
            "error": {
                "code": 409,
                "message": "Your previous request to create the named bucket succeeded and you already own it.",
                "errors": [{"domain": "global", "reason": "conflict"}]
            }
        }"#;
        let err = GcsError::from_response(409, body);
        assert_eq!(err.status(), Some(409));
        assert!(err.to_string().contains("you already own it"));
    }

    #[test]
    fn test_non_json_body() {
        let err = GcsError::from_response(502, "Bad Gateway\n");
        assert!(matches!(err, GcsError::Api { ref message, .. } if message == "Bad Gateway"));
    }

    #[test]
    fn test_classification() {
        assert_eq!(kind(401, "Invalid Credentials"), FailureKind::AccessDenied);
        assert_eq!(kind(403, "does not have storage.buckets.get access"), FailureKind::AccessDenied);
        assert_eq!(kind(404, "Not Found"), FailureKind::NotFound);
        assert_eq!(kind(409, "You already own this bucket."), FailureKind::Conflict);
        assert_eq!(
            kind(409, "The requested bucket name is not available."),
            FailureKind::Provisioning
        );
        assert_eq!(
            kind(409, "The bucket you tried to delete is not empty."),
            FailureKind::Provisioning
        );
        assert_eq!(kind(400, "Invalid bucket name: 'x'"), FailureKind::InvalidName);
        assert_eq!(kind(400, "Invalid location"), FailureKind::InvalidConfig);
        assert_eq!(kind(503, "Backend Error"), FailureKind::Transport);
    }

    #[test]
    fn test_config_errors() {
        assert_eq!(
            CloudError::from(GcsError::MissingProject).kind(),
            FailureKind::InvalidConfig
        );
    }
}
