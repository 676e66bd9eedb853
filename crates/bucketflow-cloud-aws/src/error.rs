//! AWS provider error types

use bucketflow_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("aws CLI not found ({0}). Please install: https://aws.amazon.com/cli/")]
    CliNotFound(String),

    /// Service error reported by the CLI as
    /// `An error occurred (CODE) when calling the OP operation: MESSAGE`
    #[error("{operation} failed ({code}): {message}")]
    Service {
        code: String,
        operation: String,
        message: String,
    },

    #[error("aws command failed: {0}")]
    CommandFailed(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AwsError {
    /// Parse the stderr of a failed `aws` invocation.
    pub fn from_stderr(stderr: &str) -> Self {
        const MARKER: &str = "An error occurred (";

        let Some(start) = stderr.find(MARKER) else {
            return AwsError::CommandFailed(stderr.trim().to_string());
        };
        let rest = &stderr[start + MARKER.len()..];
        let Some(end) = rest.find(')') else {
            return AwsError::CommandFailed(stderr.trim().to_string());
        };
        let code = rest[..end].to_string();
        let rest = &rest[end + 1..];

        let operation = rest
            .split_once("calling the ")
            .and_then(|(_, tail)| tail.split_once(" operation"))
            .map(|(op, _)| op.to_string())
            .unwrap_or_default();
        let message = rest
            .split_once(": ")
            .map(|(_, msg)| msg.lines().next().unwrap_or_default().trim().to_string())
            .unwrap_or_default();

        AwsError::Service {
            code,
            operation,
            message,
        }
    }

    /// Service error code, if the CLI reported one
    pub fn code(&self) -> Option<&str> {
        match self {
            AwsError::Service { code, .. } => Some(code),
            _ => None,
        }
    }

    /// `true` for "the bucket does not exist" errors
    pub fn is_not_found(&self) -> bool {
        matches!(self.code(), Some("404" | "NoSuchBucket" | "NotFound"))
    }
}

impl From<AwsError> for CloudError {
    fn from(err: AwsError) -> Self {
        let message = err.to_string();
        match &err {
            AwsError::CliNotFound(_) | AwsError::IoError(_) | AwsError::CommandFailed(_) => {
                CloudError::Transport(message)
            }
            AwsError::JsonError(_) => CloudError::Transport(message),
            AwsError::Service { code, .. } => match code.as_str() {
                "403" | "AccessDenied" | "AllAccessDisabled" | "Forbidden" | "InvalidAccessKeyId"
                | "SignatureDoesNotMatch" | "ExpiredToken" | "InvalidToken" => {
                    CloudError::AccessDenied(message)
                }
                "404" | "NoSuchBucket" | "NotFound" => CloudError::NotFound(message),
                "BucketAlreadyOwnedByYou" => CloudError::Conflict(message),
                "InvalidBucketName" => CloudError::InvalidName(message),
                "InvalidLocationConstraint" | "IllegalLocationConstraintException" => {
                    CloudError::InvalidConfig(message)
                }
                "RequestTimeout" | "SlowDown" | "InternalError" | "ServiceUnavailable"
                | "500" | "503" => CloudError::Transport(message),
                // BucketAlreadyExists: the name is taken by another account
                _ => CloudError::Provisioning(message),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, AwsError>;
