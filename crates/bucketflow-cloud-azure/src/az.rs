//! az CLI wrapper
//!
//! Wraps the `az storage` commands for storage accounts, blob containers and
//! blobs. Data-plane commands authenticate with `--auth-mode key` by default:
//! az looks up the account key through the management plane, so a
//! Contributor on the resource group can work with a freshly created
//! account. [`AuthMode::Login`] uses the signed-in identity instead, which
//! needs a Storage Blob Data role on the account.

use crate::error::{AzureError, Result};
use serde::Deserialize;
use std::process::Stdio;
use tokio::process::Command;

/// Provisioning state of a ready storage account
pub const SUCCEEDED: &str = "Succeeded";

/// Storage account settings applied on creation
pub const ACCOUNT_KIND: &str = "StorageV2";
pub const ACCOUNT_SKU: &str = "Standard_LRS";
pub const ACCESS_TIER: &str = "Hot";
pub const MIN_TLS_VERSION: &str = "TLS1_2";

/// Credentials used by data-plane (`az storage container/blob`) commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthMode {
    /// Account key fetched by az via `storage account keys list`
    #[default]
    Key,
    /// Signed-in identity (RBAC)
    Login,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::Key => "key",
            AuthMode::Login => "login",
        }
    }
}

/// az CLI wrapper
pub struct AzCli {
    program: String,
    program_args: Vec<String>,
    resource_group: String,
    subscription: Option<String>,
    auth_mode: AuthMode,
}

impl AzCli {
    pub fn new(resource_group: impl Into<String>, subscription: Option<String>) -> Self {
        Self {
            program: "az".to_string(),
            program_args: Vec::new(),
            resource_group: resource_group.into(),
            subscription,
            auth_mode: AuthMode::default(),
        }
    }

    pub fn with_auth_mode(mut self, auth_mode: AuthMode) -> Self {
        self.auth_mode = auth_mode;
        self
    }

    /// Use a different executable, e.g. a wrapper script.
    #[doc(hidden)]
    pub fn with_program(mut self, program: impl Into<String>, args: Vec<String>) -> Self {
        self.program = program.into();
        self.program_args = args;
        self
    }

    pub fn resource_group(&self) -> &str {
        &self.resource_group
    }

    /// Run an `az` command and return stdout
    async fn run_command(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.program_args);
        cmd.args(args);
        if let Some(subscription) = &self.subscription {
            cmd.arg("--subscription").arg(subscription);
        }
        cmd.arg("--output").arg("json");
        cmd.arg("--only-show-errors");
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("Running: {} {}", self.program, args.join(" "));

        let output = match cmd.output().await {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AzureError::CliNotFound(self.program.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AzureError::from_stderr(&stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Get a storage account in the resource group
    pub async fn show_account(&self, account: &str) -> Result<StorageAccount> {
        let output = self
            .run_command(&[
                "storage",
                "account",
                "show",
                "--resource-group",
                &self.resource_group,
                "--name",
                account,
            ])
            .await?;
        Ok(serde_json::from_str(&output)?)
    }

    /// Start creating a storage account; completion is observed with
    /// [`AzCli::show_account`].
    pub async fn create_account(&self, account: &str, location: &str) -> Result<()> {
        self.run_command(&[
            "storage",
            "account",
            "create",
            "--resource-group",
            &self.resource_group,
            "--name",
            account,
            "--location",
            location,
            "--kind",
            ACCOUNT_KIND,
            "--sku",
            ACCOUNT_SKU,
            "--access-tier",
            ACCESS_TIER,
            "--min-tls-version",
            MIN_TLS_VERSION,
            "--no-wait",
        ])
        .await?;
        Ok(())
    }

    /// List storage accounts in the resource group
    pub async fn list_accounts(&self) -> Result<Vec<StorageAccount>> {
        let output = self
            .run_command(&[
                "storage",
                "account",
                "list",
                "--resource-group",
                &self.resource_group,
            ])
            .await?;

        if output.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&output)?)
    }

    pub async fn container_exists(&self, account: &str, container: &str) -> Result<bool> {
        let output = self
            .run_command(&[
                "storage",
                "container",
                "exists",
                "--account-name",
                account,
                "--name",
                container,
                "--auth-mode",
                self.auth_mode.as_str(),
            ])
            .await?;
        let response: ExistsResponse = serde_json::from_str(&output)?;
        Ok(response.exists)
    }

    /// Create a container, failing if it already exists
    pub async fn create_container(&self, account: &str, container: &str) -> Result<()> {
        let output = self
            .run_command(&[
                "storage",
                "container",
                "create",
                "--account-name",
                account,
                "--name",
                container,
                "--fail-on-exist",
                "--auth-mode",
                self.auth_mode.as_str(),
            ])
            .await?;

        let response: CreatedResponse = serde_json::from_str(&output)?;
        if !response.created {
            return Err(AzureError::Service {
                code: "ContainerAlreadyExists".to_string(),
                message: format!("container {} already exists", container),
            });
        }
        Ok(())
    }

    pub async fn delete_container(&self, account: &str, container: &str) -> Result<()> {
        let output = self
            .run_command(&[
                "storage",
                "container",
                "delete",
                "--account-name",
                account,
                "--name",
                container,
                "--auth-mode",
                self.auth_mode.as_str(),
            ])
            .await?;

        let response: DeletedResponse = serde_json::from_str(&output)?;
        if !response.deleted {
            return Err(AzureError::Service {
                code: "ContainerNotFound".to_string(),
                message: format!("container {} does not exist", container),
            });
        }
        Ok(())
    }

    pub async fn show_container(&self, account: &str, container: &str) -> Result<BlobContainer> {
        let output = self
            .run_command(&[
                "storage",
                "container",
                "show",
                "--account-name",
                account,
                "--name",
                container,
                "--auth-mode",
                self.auth_mode.as_str(),
            ])
            .await?;
        Ok(serde_json::from_str(&output)?)
    }

    pub async fn list_containers(&self, account: &str) -> Result<Vec<BlobContainer>> {
        let output = self
            .run_command(&[
                "storage",
                "container",
                "list",
                "--account-name",
                account,
                "--auth-mode",
                self.auth_mode.as_str(),
            ])
            .await?;

        if output.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&output)?)
    }

    /// Names of every blob in the container
    pub async fn list_blobs(&self, account: &str, container: &str) -> Result<Vec<String>> {
        let output = self
            .run_command(&[
                "storage",
                "blob",
                "list",
                "--account-name",
                account,
                "--container-name",
                container,
                "--num-results",
                "*",
                "--auth-mode",
                self.auth_mode.as_str(),
            ])
            .await?;

        if output.trim().is_empty() {
            return Ok(Vec::new());
        }
        let blobs: Vec<BlobItem> = serde_json::from_str(&output)?;
        Ok(blobs.into_iter().map(|b| b.name).collect())
    }

    pub async fn delete_blob(&self, account: &str, container: &str, blob: &str) -> Result<()> {
        self.run_command(&[
            "storage",
            "blob",
            "delete",
            "--account-name",
            account,
            "--container-name",
            container,
            "--name",
            blob,
            "--delete-snapshots",
            "include",
            "--auth-mode",
            self.auth_mode.as_str(),
        ])
        .await?;
        Ok(())
    }
}

/// Storage account as returned by `az storage account show/list`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAccount {
    pub name: String,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub provisioning_state: Option<String>,

    #[serde(default)]
    pub creation_time: Option<String>,

    #[serde(default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub access_tier: Option<String>,

    #[serde(default)]
    pub sku: Option<Sku>,
}

impl StorageAccount {
    pub fn is_ready(&self) -> bool {
        self.provisioning_state.as_deref() == Some(SUCCEEDED)
    }

    pub fn is_failed(&self) -> bool {
        self.provisioning_state.as_deref() == Some("Failed")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sku {
    pub name: String,
}

/// Blob container as returned by `az storage container show/list`
#[derive(Debug, Clone, Deserialize)]
pub struct BlobContainer {
    pub name: String,

    #[serde(default)]
    pub properties: ContainerProperties,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerProperties {
    #[serde(default)]
    pub etag: Option<String>,

    #[serde(default)]
    pub last_modified: Option<String>,

    #[serde(default)]
    pub public_access: Option<String>,

    #[serde(default)]
    pub has_immutability_policy: Option<bool>,

    #[serde(default)]
    pub has_legal_hold: Option<bool>,

    #[serde(default)]
    pub lease: Option<Lease>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Lease {
    #[serde(default)]
    pub state: Option<String>,

    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExistsResponse {
    exists: bool,
}

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    created: bool,
}

#[derive(Debug, Deserialize)]
struct DeletedResponse {
    deleted: bool,
}

#[derive(Debug, Deserialize)]
struct BlobItem {
    name: String,
}
