//! Azure Blob Storage provider implementation
//!
//! Containers live inside a storage account. The account name is derived
//! from the logical name with a stable hash suffix, since account names are
//! globally unique across Azure.

use crate::az::{AuthMode, AzCli};
use crate::error::AzureError;
use async_trait::async_trait;
use bucketflow_cloud::state::parse_timestamp;
use bucketflow_cloud::{
    CanonicalId, Charset, CloudError, ContainerMetadata, ContainerRef, ContainerSummary,
    CreateOptions, NamingRules, PollConfig, ResourceState, StorageProvider, poll_until,
};

/// Blob container names: 3-63 characters of `[a-z0-9-]`
const CONTAINER_RULES: NamingRules = NamingRules::new(3, 63, Charset::LowerAlphanumericHyphen);

/// Storage account names: 3-24 characters of `[a-z0-9]`, globally unique
const ACCOUNT_RULES: NamingRules =
    NamingRules::new(3, 24, Charset::LowerAlphanumeric).globally_unique();

/// Azure provider configuration
#[derive(Debug, Clone, Default)]
pub struct AzureConfig {
    /// Resource group holding the storage accounts
    pub resource_group: String,

    /// Subscription passed as `--subscription`; the CLI default otherwise
    pub subscription: Option<String>,

    /// Location used when an intent doesn't name one
    pub region: Option<String>,

    /// Storage account provisioning poll
    pub poll: PollConfig,

    /// Credentials for container and blob commands
    pub auth_mode: AuthMode,

    /// Executable to run instead of `az`, followed by its leading arguments
    program: Option<(String, Vec<String>)>,
}

impl AzureConfig {
    pub fn new(resource_group: impl Into<String>) -> Self {
        Self {
            resource_group: resource_group.into(),
            ..Default::default()
        }
    }

    pub fn with_subscription(mut self, subscription: impl Into<String>) -> Self {
        self.subscription = Some(subscription.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_auth_mode(mut self, auth_mode: AuthMode) -> Self {
        self.auth_mode = auth_mode;
        self
    }

    #[doc(hidden)]
    pub fn with_program(mut self, program: impl Into<String>, args: Vec<String>) -> Self {
        self.program = Some((program.into(), args));
        self
    }
}

/// Azure Blob Storage provider
pub struct AzureBlobProvider {
    az: AzCli,
    region: Option<String>,
    poll: PollConfig,
}

impl AzureBlobProvider {
    pub fn new(config: AzureConfig) -> bucketflow_cloud::Result<Self> {
        if config.resource_group.trim().is_empty() {
            return Err(CloudError::InvalidConfig(
                "Azure requires a resource group".to_string(),
            ));
        }

        let mut az = AzCli::new(config.resource_group, config.subscription)
            .with_auth_mode(config.auth_mode);
        if let Some((program, args)) = config.program {
            az = az.with_program(program, args);
        }
        Ok(Self {
            az,
            region: config.region,
            poll: config.poll,
        })
    }

    /// Wait until the storage account reports `Succeeded`.
    async fn wait_for_account(&self, account: &CanonicalId) -> bucketflow_cloud::Result<()> {
        let az = &self.az;
        let ready = poll_until(&self.poll, move || async move {
            let state = az.show_account(account.as_str()).await?;
            if state.is_failed() {
                return Err(CloudError::from(AzureError::ProvisioningFailed(
                    account.to_string(),
                )));
            }
            Ok::<_, CloudError>(state.is_ready())
        })
        .await?;

        if !ready {
            return Err(AzureError::ProvisioningTimeout(account.to_string()).into());
        }
        Ok(())
    }
}

#[async_trait]
impl StorageProvider for AzureBlobProvider {
    fn name(&self) -> &str {
        "azure"
    }

    fn display_name(&self) -> &str {
        "Azure Blob Storage"
    }

    fn naming_rules(&self) -> NamingRules {
        CONTAINER_RULES
    }

    fn parent_naming_rules(&self) -> Option<NamingRules> {
        Some(ACCOUNT_RULES)
    }

    fn default_region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    async fn exists(&self, target: &ContainerRef) -> bucketflow_cloud::Result<ResourceState> {
        let account = target.require_parent()?;

        match self.az.show_account(account.as_str()).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => return Ok(ResourceState::ParentMissing),
            Err(e) => return Err(e.into()),
        }

        if self
            .az
            .container_exists(account.as_str(), target.id.as_str())
            .await?
        {
            Ok(ResourceState::Present)
        } else {
            Ok(ResourceState::Absent)
        }
    }

    async fn ensure_parent(&self, parent: &CanonicalId, region: &str) -> bucketflow_cloud::Result<()> {
        match self.az.show_account(parent.as_str()).await {
            Ok(account) if account.is_ready() => return Ok(()),
            Ok(_) => {
                tracing::info!("Storage account {} is still provisioning", parent);
            }
            Err(e) if e.is_not_found() => {
                tracing::info!(
                    "Creating storage account {} in {} ({})",
                    parent,
                    region,
                    self.az.resource_group()
                );
                match self.az.create_account(parent.as_str(), region).await {
                    Ok(()) => {}
                    Err(e) if e.code() == Some("StorageAccountAlreadyExists") => {
                        tracing::info!("Storage account {} was created concurrently", parent);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        }

        self.wait_for_account(parent).await
    }

    async fn create(
        &self,
        target: &ContainerRef,
        options: &CreateOptions,
    ) -> bucketflow_cloud::Result<()> {
        let account = target.require_parent()?;
        if let Some(storage_class) = &options.storage_class {
            // access tiers are set on the account
            tracing::debug!(
                "Ignoring storage class {} for container {}",
                storage_class,
                target
            );
        }
        self.az
            .create_container(account.as_str(), target.id.as_str())
            .await?;
        Ok(())
    }

    async fn delete(&self, target: &ContainerRef) -> bucketflow_cloud::Result<()> {
        let account = target.require_parent()?;
        self.az
            .delete_container(account.as_str(), target.id.as_str())
            .await?;
        Ok(())
    }

    async fn describe(&self, target: &ContainerRef) -> bucketflow_cloud::Result<ContainerMetadata> {
        let account_id = target.require_parent()?;
        let container = self
            .az
            .show_container(account_id.as_str(), target.id.as_str())
            .await?;
        let account = self.az.show_account(account_id.as_str()).await?;

        let mut metadata = ContainerMetadata::new()
            .with_attribute("storage_account", serde_json::json!(account.name));
        if let Some(location) = account.location {
            metadata = metadata.with_region(location);
        }
        if let Some(sku) = account.sku {
            metadata = metadata.with_storage_class(sku.name);
        }
        if let Some(tier) = account.access_tier {
            metadata = metadata.with_attribute("access_tier", serde_json::json!(tier));
        }

        let properties = container.properties;
        if let Some(etag) = properties.etag {
            metadata = metadata.with_etag(etag);
        }
        if let Some(last_modified) = properties.last_modified {
            metadata = metadata.with_attribute("last_modified", serde_json::json!(last_modified));
        }
        if let Some(lease) = properties.lease {
            if let Some(status) = lease.status {
                metadata = metadata.with_attribute("lease_status", serde_json::json!(status));
            }
            if let Some(state) = lease.state {
                metadata = metadata.with_attribute("lease_state", serde_json::json!(state));
            }
        }
        metadata = metadata
            .with_attribute("public_access", serde_json::json!(properties.public_access))
            .with_attribute(
                "has_immutability_policy",
                serde_json::json!(properties.has_immutability_policy.unwrap_or(false)),
            )
            .with_attribute(
                "has_legal_hold",
                serde_json::json!(properties.has_legal_hold.unwrap_or(false)),
            );

        Ok(metadata)
    }

    async fn list(
        &self,
        parent: Option<&CanonicalId>,
    ) -> bucketflow_cloud::Result<Vec<ContainerSummary>> {
        let Some(account) = parent else {
            let accounts = self.az.list_accounts().await?;
            return Ok(accounts
                .into_iter()
                .map(|a| {
                    let created_at = a.creation_time.as_deref().and_then(parse_timestamp);
                    ContainerSummary::new(a.name, created_at)
                })
                .collect());
        };

        match self.az.show_account(account.as_str()).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                tracing::warn!("Storage account {} does not exist", account);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        }

        let containers = self.az.list_containers(account.as_str()).await?;
        Ok(containers
            .into_iter()
            .map(|c| ContainerSummary::new(c.name, None))
            .collect())
    }

    async fn list_sub_resources(&self, target: &ContainerRef) -> bucketflow_cloud::Result<Vec<String>> {
        let account = target.require_parent()?;
        Ok(self
            .az
            .list_blobs(account.as_str(), target.id.as_str())
            .await?)
    }

    async fn delete_sub_resources(
        &self,
        target: &ContainerRef,
        keys: &[String],
    ) -> bucketflow_cloud::Result<usize> {
        let account = target.require_parent()?;
        let mut deleted = 0;
        for key in keys {
            match self
                .az
                .delete_blob(account.as_str(), target.id.as_str(), key)
                .await
            {
                Ok(()) => deleted += 1,
                Err(e) if e.is_not_found() => {}
                Err(e) => tracing::warn!("Could not delete {}/{}: {}", target, key, e),
            }
        }
        Ok(deleted)
    }
}
