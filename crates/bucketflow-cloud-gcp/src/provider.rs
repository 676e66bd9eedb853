//! Google Cloud Storage provider implementation

use crate::error::GcsError;
use crate::gcs::{DEFAULT_STORAGE_CLASS, GCS_API_BASE, GcsClient};
use async_trait::async_trait;
use bucketflow_cloud::state::parse_timestamp;
use bucketflow_cloud::{
    CanonicalId, Charset, CloudError, ContainerMetadata, ContainerRef, ContainerSummary,
    CreateOptions, NamingRules, ResourceState, StorageProvider,
};

/// GCS bucket names: 3-63 characters of `[a-z0-9._-]`
const BUCKET_RULES: NamingRules =
    NamingRules::new(3, 63, Charset::LowerAlphanumericHyphenDotUnderscore);

/// GCS provider configuration
#[derive(Debug, Clone, Default)]
pub struct GcsConfig {
    /// Project that owns new buckets and is listed by enumerate
    pub project: Option<String>,

    /// OAuth 2.0 access token
    pub access_token: Option<String>,

    /// API endpoint, [`GCS_API_BASE`] when unset
    pub endpoint: Option<String>,

    /// Location used when an intent doesn't name one
    pub location: Option<String>,
}

impl GcsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create GcsConfig from environment variables
    pub fn from_env() -> Self {
        Self {
            project: std::env::var("GOOGLE_CLOUD_PROJECT").ok(),
            access_token: std::env::var("GOOGLE_OAUTH_ACCESS_TOKEN").ok(),
            endpoint: None,
            location: None,
        }
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Google Cloud Storage provider
pub struct GcsProvider {
    client: GcsClient,
    location: Option<String>,
}

impl GcsProvider {
    pub fn new(config: GcsConfig) -> bucketflow_cloud::Result<Self> {
        let token = config
            .access_token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| GcsError::MissingEnvVar("GOOGLE_OAUTH_ACCESS_TOKEN".to_string()))?;
        let endpoint = config.endpoint.as_deref().unwrap_or(GCS_API_BASE);
        let client = GcsClient::new(endpoint, token, config.project)?;

        Ok(Self {
            client,
            location: config.location,
        })
    }
}

#[async_trait]
impl StorageProvider for GcsProvider {
    fn name(&self) -> &str {
        "gcp"
    }

    fn display_name(&self) -> &str {
        "Google Cloud Storage"
    }

    fn naming_rules(&self) -> NamingRules {
        BUCKET_RULES
    }

    fn default_region(&self) -> Option<&str> {
        self.location.as_deref()
    }

    async fn exists(&self, target: &ContainerRef) -> bucketflow_cloud::Result<ResourceState> {
        match self.client.get_bucket(target.id.as_str()).await {
            Ok(_) => Ok(ResourceState::Present),
            Err(e) if e.is_not_found() => Ok(ResourceState::Absent),
            Err(e) => Err(e.into()),
        }
    }

    async fn create(
        &self,
        target: &ContainerRef,
        options: &CreateOptions,
    ) -> bucketflow_cloud::Result<()> {
        let storage_class = options
            .storage_class
            .as_deref()
            .unwrap_or(DEFAULT_STORAGE_CLASS);
        let bucket = self
            .client
            .insert_bucket(target.id.as_str(), &options.region, storage_class)
            .await?;
        tracing::debug!(
            "Bucket {} created in {}",
            bucket.name,
            bucket.location.as_deref().unwrap_or("?")
        );
        Ok(())
    }

    async fn delete(&self, target: &ContainerRef) -> bucketflow_cloud::Result<()> {
        self.client.delete_bucket(target.id.as_str()).await?;
        Ok(())
    }

    async fn describe(&self, target: &ContainerRef) -> bucketflow_cloud::Result<ContainerMetadata> {
        let bucket = self.client.get_bucket(target.id.as_str()).await?;

        let mut metadata = ContainerMetadata::new();
        if let Some(location) = bucket.location {
            metadata = metadata.with_region(location);
        }
        if let Some(created_at) = bucket.time_created.as_deref().and_then(parse_timestamp) {
            metadata = metadata.with_created_at(created_at);
        }
        if let Some(storage_class) = bucket.storage_class {
            metadata = metadata.with_storage_class(storage_class);
        }
        if let Some(etag) = bucket.etag {
            metadata = metadata.with_etag(etag);
        }
        if let Some(location_type) = bucket.location_type {
            metadata = metadata.with_attribute("location_type", serde_json::json!(location_type));
        }
        if let Some(updated) = bucket.updated {
            metadata = metadata.with_attribute("updated", serde_json::json!(updated));
        }
        if let Some(project_number) = bucket.project_number {
            metadata = metadata.with_attribute("project_number", serde_json::json!(project_number));
        }

        Ok(metadata)
    }

    async fn list(
        &self,
        parent: Option<&CanonicalId>,
    ) -> bucketflow_cloud::Result<Vec<ContainerSummary>> {
        if let Some(parent) = parent {
            return Err(CloudError::InvalidConfig(format!(
                "GCS has no parent resources (got '{}')",
                parent
            )));
        }

        let buckets = self.client.list_buckets().await?;
        Ok(buckets
            .into_iter()
            .map(|b| {
                let created_at = b.time_created.as_deref().and_then(parse_timestamp);
                ContainerSummary::new(b.name, created_at)
            })
            .collect())
    }

    async fn list_sub_resources(&self, target: &ContainerRef) -> bucketflow_cloud::Result<Vec<String>> {
        Ok(self.client.list_objects(target.id.as_str()).await?)
    }

    async fn delete_sub_resources(
        &self,
        target: &ContainerRef,
        keys: &[String],
    ) -> bucketflow_cloud::Result<usize> {
        let mut deleted = 0;
        for key in keys {
            match self.client.delete_object(target.id.as_str(), key).await {
                Ok(()) => deleted += 1,
                Err(e) if e.is_not_found() => {}
                Err(e) => tracing::warn!("Could not delete gs://{}/{}: {}", target.id, key, e),
            }
        }
        Ok(deleted)
    }
}
