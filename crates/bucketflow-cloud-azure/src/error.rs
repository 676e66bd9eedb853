//! Azure provider error types

use bucketflow_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AzureError {
    #[error("az CLI not found ({0}). Please install: https://aka.ms/azure-cli")]
    CliNotFound(String),

    #[error("{message} ({code})")]
    Service { code: String, message: String },

    #[error("az command failed: {0}")]
    CommandFailed(String),

    #[error("Storage account {0} did not finish provisioning")]
    ProvisioningTimeout(String),

    #[error("Storage account {0} failed to provision")]
    ProvisioningFailed(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AzureError {
    /// Parse the stderr of a failed `az` invocation.
    ///
    /// Management-plane errors look like `ERROR: (ResourceNotFound) ...`,
    /// data-plane errors end with an `ErrorCode:ContainerAlreadyExists` line.
    pub fn from_stderr(stderr: &str) -> Self {
        let message = stderr
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or_default();
        let message = message.strip_prefix("ERROR:").unwrap_or(message).trim();

        match error_code(stderr) {
            Some(code) => {
                let prefix = format!("({})", code);
                let message = message.strip_prefix(&prefix).unwrap_or(message).trim();
                AzureError::Service {
                    code,
                    message: message.to_string(),
                }
            }
            None => AzureError::CommandFailed(message.to_string()),
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            AzureError::Service { code, .. } => Some(code),
            _ => None,
        }
    }

    /// `true` for "the resource does not exist" errors
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.code(),
            Some(
                "ResourceNotFound"
                    | "ResourceGroupNotFound"
                    | "ParentResourceNotFound"
                    | "StorageAccountNotFound"
                    | "ContainerNotFound"
                    | "BlobNotFound"
            )
        )
    }
}

fn error_code(stderr: &str) -> Option<String> {
    for line in stderr.lines().map(str::trim) {
        if let Some(code) = line
            .strip_prefix("ErrorCode:")
            .or_else(|| line.strip_prefix("Code:"))
        {
            let code = code.trim();
            if !code.is_empty() {
                return Some(code.to_string());
            }
        }
    }

    let start = stderr.find("ERROR: (")? + "ERROR: (".len();
    let end = stderr[start..].find(')')?;
    Some(stderr[start..start + end].to_string())
}

impl From<AzureError> for CloudError {
    fn from(err: AzureError) -> Self {
        let message = err.to_string();
        match &err {
            AzureError::CliNotFound(_) | AzureError::IoError(_) | AzureError::JsonError(_) => {
                CloudError::Transport(message)
            }
            AzureError::CommandFailed(m) if m.contains("az login") => {
                CloudError::AccessDenied(message)
            }
            AzureError::CommandFailed(_) => CloudError::Transport(message),
            AzureError::ProvisioningTimeout(_) | AzureError::ProvisioningFailed(_) => {
                CloudError::Provisioning(message)
            }
            AzureError::Service { code, .. } => match code.as_str() {
                "AuthorizationFailed"
                | "AuthorizationPermissionMismatch"
                | "AuthorizationFailure"
                | "AuthenticationFailed"
                | "InvalidAuthenticationToken"
                | "LinkedAuthorizationFailed"
                | "ExpiredAuthenticationToken" => CloudError::AccessDenied(message),
                "ContainerAlreadyExists" | "StorageAccountAlreadyExists" => {
                    CloudError::Conflict(message)
                }
                "AccountNameInvalid" | "InvalidResourceName" | "OutOfRangeInput" => {
                    CloudError::InvalidName(message)
                }
                "LocationNotAvailableForResourceType"
                | "NoRegisteredProviderFound"
                | "SubscriptionNotFound"
                | "InvalidSubscriptionId" => CloudError::InvalidConfig(message),
                "ServerBusy" | "InternalError" | "OperationTimedOut" => {
                    CloudError::Transport(message)
                }
                _ if err.is_not_found() => CloudError::NotFound(message),
                // StorageAccountAlreadyTaken: the name belongs to another subscription
                _ => CloudError::Provisioning(message),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, AzureError>;
