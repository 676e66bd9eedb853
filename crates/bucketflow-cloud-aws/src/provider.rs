//! AWS S3 provider implementation

use crate::s3api::S3Api;
use async_trait::async_trait;
use bucketflow_cloud::state::parse_timestamp;
use bucketflow_cloud::{
    CanonicalId, Charset, CloudError, ContainerMetadata, ContainerRef, ContainerSummary,
    CreateOptions, NamingRules, ResourceState, StorageProvider,
};

/// S3 bucket names: 3-63 characters of `[a-z0-9.-]`
const BUCKET_RULES: NamingRules = NamingRules::new(3, 63, Charset::LowerAlphanumericHyphenDot);

/// S3 provider configuration
#[derive(Debug, Clone, Default)]
pub struct AwsConfig {
    /// Named profile passed as `--profile`
    pub profile: Option<String>,

    /// Region used when an intent doesn't name one
    pub region: Option<String>,

    /// Executable to run instead of `aws`, followed by its leading arguments
    program: Option<(String, Vec<String>)>,
}

impl AwsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    #[doc(hidden)]
    pub fn with_program(mut self, program: impl Into<String>, args: Vec<String>) -> Self {
        self.program = Some((program.into(), args));
        self
    }
}

/// AWS S3 provider
pub struct S3Provider {
    s3api: S3Api,
    region: Option<String>,
}

impl S3Provider {
    pub fn new(config: AwsConfig) -> Self {
        let mut s3api = S3Api::new(config.profile);
        if let Some((program, args)) = config.program {
            s3api = s3api.with_program(program, args);
        }
        Self {
            s3api,
            region: config.region,
        }
    }
}

#[async_trait]
impl StorageProvider for S3Provider {
    fn name(&self) -> &str {
        "aws"
    }

    fn display_name(&self) -> &str {
        "AWS S3"
    }

    fn naming_rules(&self) -> NamingRules {
        BUCKET_RULES
    }

    fn default_region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    async fn exists(&self, target: &ContainerRef) -> bucketflow_cloud::Result<ResourceState> {
        match self.s3api.head_bucket(target.id.as_str()).await {
            Ok(()) => Ok(ResourceState::Present),
            Err(e) if e.is_not_found() => Ok(ResourceState::Absent),
            Err(e) => Err(e.into()),
        }
    }

    async fn create(
        &self,
        target: &ContainerRef,
        options: &CreateOptions,
    ) -> bucketflow_cloud::Result<()> {
        if let Some(storage_class) = &options.storage_class {
            // S3 sets storage classes per object
            tracing::debug!(
                "Ignoring storage class {} for bucket {}",
                storage_class,
                target.id
            );
        }
        self.s3api
            .create_bucket(target.id.as_str(), &options.region)
            .await?;
        Ok(())
    }

    async fn delete(&self, target: &ContainerRef) -> bucketflow_cloud::Result<()> {
        self.s3api.delete_bucket(target.id.as_str()).await?;
        Ok(())
    }

    async fn describe(&self, target: &ContainerRef) -> bucketflow_cloud::Result<ContainerMetadata> {
        let bucket = target.id.as_str();
        let region = self.s3api.get_bucket_location(bucket).await?;

        let mut metadata = ContainerMetadata::new().with_region(region);

        // Creation date is only exposed through list-buckets
        let created = self
            .s3api
            .list_buckets()
            .await?
            .into_iter()
            .find(|b| b.name == bucket)
            .and_then(|b| b.creation_date)
            .and_then(|d| parse_timestamp(&d));
        if let Some(created_at) = created {
            metadata = metadata.with_created_at(created_at);
        }

        Ok(metadata)
    }

    async fn list(
        &self,
        parent: Option<&CanonicalId>,
    ) -> bucketflow_cloud::Result<Vec<ContainerSummary>> {
        if let Some(parent) = parent {
            return Err(CloudError::InvalidConfig(format!(
                "S3 has no parent resources (got '{}')",
                parent
            )));
        }

        let buckets = self.s3api.list_buckets().await?;
        Ok(buckets
            .into_iter()
            .map(|b| {
                let created_at = b.creation_date.as_deref().and_then(parse_timestamp);
                ContainerSummary::new(b.name, created_at)
            })
            .collect())
    }

    async fn list_sub_resources(&self, target: &ContainerRef) -> bucketflow_cloud::Result<Vec<String>> {
        Ok(self.s3api.list_object_keys(target.id.as_str()).await?)
    }

    async fn delete_sub_resources(
        &self,
        target: &ContainerRef,
        keys: &[String],
    ) -> bucketflow_cloud::Result<usize> {
        Ok(self.s3api.delete_objects(target.id.as_str(), keys).await?)
    }
}
