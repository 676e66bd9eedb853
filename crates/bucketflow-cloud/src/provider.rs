//! Storage provider trait definition

use crate::error::{CloudError, Result};
use crate::naming::{CanonicalId, NamingRules};
use crate::state::{ContainerMetadata, ContainerSummary, ResourceState};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Storage provider abstraction trait
///
/// Every backend (S3, Azure Blob Storage, GCS) implements this trait.
/// Implementations must be idempotent per call and translate their native
/// errors into [`CloudError`]: a benign "already exists" on create becomes
/// [`CloudError::Conflict`], "already gone" on delete becomes
/// [`CloudError::NotFound`], and a forbidden probe becomes
/// [`CloudError::AccessDenied`].
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Returns the provider name (e.g., "aws", "azure")
    fn name(&self) -> &str;

    /// Returns the provider display name for UI
    fn display_name(&self) -> &str;

    /// Naming rules for containers
    fn naming_rules(&self) -> NamingRules;

    /// Naming rules for the parent resource, `None` for flat providers
    fn parent_naming_rules(&self) -> Option<NamingRules> {
        None
    }

    /// Region used when an intent doesn't name one
    fn default_region(&self) -> Option<&str> {
        None
    }

    /// Probe whether the container (and its parent) exist
    async fn exists(&self, target: &ContainerRef) -> Result<ResourceState>;

    /// Make sure the parent resource exists and is ready
    async fn ensure_parent(&self, _parent: &CanonicalId, _region: &str) -> Result<()> {
        Ok(())
    }

    /// Create the container
    async fn create(&self, target: &ContainerRef, options: &CreateOptions) -> Result<()>;

    /// Delete the container
    async fn delete(&self, target: &ContainerRef) -> Result<()>;

    /// Read container properties
    async fn describe(&self, target: &ContainerRef) -> Result<ContainerMetadata>;

    /// List containers, scoped to a parent on hierarchical providers
    async fn list(&self, parent: Option<&CanonicalId>) -> Result<Vec<ContainerSummary>>;

    /// List the keys of the objects stored in the container
    async fn list_sub_resources(&self, target: &ContainerRef) -> Result<Vec<String>>;

    /// Delete the given objects, returning how many were removed
    async fn delete_sub_resources(&self, target: &ContainerRef, keys: &[String]) -> Result<usize>;
}

/// Resolved target of a provider call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRef {
    /// Canonical container id
    pub id: CanonicalId,

    /// Canonical parent id (hierarchical providers only)
    pub parent: Option<CanonicalId>,
}

impl ContainerRef {
    pub fn new(id: CanonicalId) -> Self {
        Self { id, parent: None }
    }

    pub fn with_parent(mut self, parent: CanonicalId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Parent id, or an error for providers that require one.
    pub fn require_parent(&self) -> Result<&CanonicalId> {
        self.parent.as_ref().ok_or_else(|| {
            CloudError::InvalidConfig(format!("container '{}' has no parent resource", self.id))
        })
    }
}

impl std::fmt::Display for ContainerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.parent {
            Some(parent) => write!(f, "{}/{}", parent, self.id),
            None => write!(f, "{}", self.id),
        }
    }
}

/// Inputs for container creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOptions {
    pub region: String,

    /// Storage class hint; providers without the concept ignore it
    pub storage_class: Option<String>,
}

impl CreateOptions {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            storage_class: None,
        }
    }

    pub fn with_storage_class(mut self, storage_class: impl Into<String>) -> Self {
        self.storage_class = Some(storage_class.into());
        self
    }
}

/// Polling configuration for long-running provisioning
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Maximum number of checks
    pub max_attempts: u32,

    /// Delay before the second check
    pub initial_delay: Duration,

    /// Upper bound for the delay between checks
    pub max_delay: Duration,

    /// Backoff multiplier
    pub backoff_multiplier: f64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(15),
            backoff_multiplier: 1.5,
        }
    }
}

impl PollConfig {
    /// Delay after the given (zero-based) failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let factor = self.backoff_multiplier.powi(exponent);
        // mul_f64 panics on results Duration can't hold
        if !factor.is_finite() || factor < 0.0 {
            return self.max_delay;
        }
        if self.initial_delay.as_secs_f64() * factor >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        self.initial_delay.mul_f64(factor)
    }
}

/// Call `check` until it reports readiness or the attempts run out.
///
/// Returns `Ok(true)` once ready, `Ok(false)` when every attempt came back
/// not ready. Errors from `check` end polling immediately.
pub async fn poll_until<F, Fut>(config: &PollConfig, mut check: F) -> Result<bool>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    for attempt in 0..config.max_attempts {
        if check().await? {
            return Ok(true);
        }
        if attempt + 1 < config.max_attempts {
            let delay = config.delay_for(attempt);
            tracing::debug!("Not ready yet, checking again in {:?}", delay);
            tokio::time::sleep(delay).await;
        }
    }
    Ok(false)
}
