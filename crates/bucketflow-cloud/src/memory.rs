//! In-memory storage provider
//!
//! Simulates a flat or hierarchical backend with plain collections. Every
//! capability call is recorded, and faults can be injected per capability,
//! which makes it the reference backend for exercising the engine without
//! any cloud account.

use crate::error::{CloudError, FailureKind, Result};
use crate::naming::{CanonicalId, Charset, NamingRules};
use crate::provider::{ContainerRef, CreateOptions, StorageProvider};
use crate::state::{ContainerMetadata, ContainerSummary, ResourceState};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

const CONTAINER_RULES: NamingRules = NamingRules::new(3, 63, Charset::LowerAlphanumericHyphen);
const PARENT_RULES: NamingRules =
    NamingRules::new(3, 24, Charset::LowerAlphanumeric).globally_unique();

/// Capability of [`StorageProvider`], used to target injected faults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Exists,
    EnsureParent,
    Create,
    Delete,
    Describe,
    List,
    ListSubResources,
    DeleteSubResources,
}

/// One recorded capability call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Exists(String),
    EnsureParent(String),
    Create(String),
    Delete(String),
    Describe(String),
    List(Option<String>),
    ListSubResources(String),
    DeleteSubResources(String, usize),
}

impl Call {
    pub fn capability(&self) -> Capability {
        match self {
            Call::Exists(_) => Capability::Exists,
            Call::EnsureParent(_) => Capability::EnsureParent,
            Call::Create(_) => Capability::Create,
            Call::Delete(_) => Capability::Delete,
            Call::Describe(_) => Capability::Describe,
            Call::List(_) => Capability::List,
            Call::ListSubResources(_) => Capability::ListSubResources,
            Call::DeleteSubResources(_, _) => Capability::DeleteSubResources,
        }
    }
}

#[derive(Debug, Clone)]
struct StoredContainer {
    region: String,
    storage_class: Option<String>,
    created_at: DateTime<Utc>,
    objects: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct Inner {
    parents: BTreeMap<String, DateTime<Utc>>,
    containers: BTreeMap<String, StoredContainer>,
    calls: Vec<Call>,
    faults: HashMap<Capability, FailureKind>,
}

/// In-memory provider
pub struct MemoryProvider {
    hierarchical: bool,
    default_region: Option<String>,
    inner: Mutex<Inner>,
}

impl MemoryProvider {
    /// Backend without parent resources (S3/GCS-like)
    pub fn flat() -> Self {
        Self {
            hierarchical: false,
            default_region: None,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Backend whose containers live inside a parent account (Azure-like)
    pub fn hierarchical() -> Self {
        Self {
            hierarchical: true,
            ..Self::flat()
        }
    }

    pub fn with_default_region(mut self, region: impl Into<String>) -> Self {
        self.default_region = Some(region.into());
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every call to `capability` fail with `kind` until cleared.
    pub fn fail_with(&self, capability: Capability, kind: FailureKind) {
        self.lock().faults.insert(capability, kind);
    }

    pub fn clear_faults(&self) {
        self.lock().faults.clear();
    }

    /// All calls so far, in order
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Number of calls made to `capability`
    pub fn call_count(&self, capability: Capability) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.capability() == capability)
            .count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn contains(&self, target: &ContainerRef) -> bool {
        self.lock().containers.contains_key(&target.to_string())
    }

    pub fn has_parent(&self, parent: &CanonicalId) -> bool {
        self.lock().parents.contains_key(parent.as_str())
    }

    /// Number of stored containers
    pub fn len(&self) -> usize {
        self.lock().containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Seed a container (and its parent) without recording a call.
    pub fn insert_container(&self, target: &ContainerRef, region: &str) {
        let mut inner = self.lock();
        if let Some(parent) = &target.parent {
            inner
                .parents
                .entry(parent.to_string())
                .or_insert_with(Utc::now);
        }
        inner.containers.insert(
            target.to_string(),
            StoredContainer {
                region: region.to_string(),
                storage_class: None,
                created_at: Utc::now(),
                objects: BTreeSet::new(),
            },
        );
    }

    /// Store an object in an existing container.
    pub fn put_object(&self, target: &ContainerRef, key: impl Into<String>) -> Result<()> {
        let mut inner = self.lock();
        let container = inner
            .containers
            .get_mut(&target.to_string())
            .ok_or_else(|| CloudError::NotFound(target.to_string()))?;
        container.objects.insert(key.into());
        Ok(())
    }

    pub fn object_count(&self, target: &ContainerRef) -> usize {
        self.lock()
            .containers
            .get(&target.to_string())
            .map(|c| c.objects.len())
            .unwrap_or(0)
    }

    /// Record the call and return the injected fault, if any.
    fn record(&self, call: Call) -> Result<MutexGuard<'_, Inner>> {
        let mut inner = self.lock();
        let capability = call.capability();
        let subject = format!("{:?}", call);
        inner.calls.push(call);
        if let Some(kind) = inner.faults.get(&capability).copied() {
            return Err(CloudError::from_kind(
                kind,
                format!("injected fault on {}", subject),
            ));
        }
        Ok(inner)
    }

    fn parent_missing(&self, inner: &Inner, target: &ContainerRef) -> bool {
        self.hierarchical
            && target
                .parent
                .as_ref()
                .is_none_or(|p| !inner.parents.contains_key(p.as_str()))
    }
}

#[async_trait]
impl StorageProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn display_name(&self) -> &str {
        if self.hierarchical {
            "In-memory (hierarchical)"
        } else {
            "In-memory"
        }
    }

    fn naming_rules(&self) -> NamingRules {
        CONTAINER_RULES
    }

    fn parent_naming_rules(&self) -> Option<NamingRules> {
        self.hierarchical.then_some(PARENT_RULES)
    }

    fn default_region(&self) -> Option<&str> {
        self.default_region.as_deref()
    }

    async fn exists(&self, target: &ContainerRef) -> Result<ResourceState> {
        let inner = self.record(Call::Exists(target.to_string()))?;
        if self.parent_missing(&inner, target) {
            return Ok(ResourceState::ParentMissing);
        }
        if inner.containers.contains_key(&target.to_string()) {
            Ok(ResourceState::Present)
        } else {
            Ok(ResourceState::Absent)
        }
    }

    async fn ensure_parent(&self, parent: &CanonicalId, _region: &str) -> Result<()> {
        let mut inner = self.record(Call::EnsureParent(parent.to_string()))?;
        if self.hierarchical {
            inner
                .parents
                .entry(parent.to_string())
                .or_insert_with(Utc::now);
        }
        Ok(())
    }

    async fn create(&self, target: &ContainerRef, options: &CreateOptions) -> Result<()> {
        let mut inner = self.record(Call::Create(target.to_string()))?;
        if self.parent_missing(&inner, target) {
            return Err(CloudError::Provisioning(format!(
                "parent of {} does not exist",
                target
            )));
        }
        let key = target.to_string();
        if inner.containers.contains_key(&key) {
            return Err(CloudError::Conflict(key));
        }
        inner.containers.insert(
            key,
            StoredContainer {
                region: options.region.clone(),
                storage_class: options.storage_class.clone(),
                created_at: Utc::now(),
                objects: BTreeSet::new(),
            },
        );
        Ok(())
    }

    async fn delete(&self, target: &ContainerRef) -> Result<()> {
        let mut inner = self.record(Call::Delete(target.to_string()))?;
        let key = target.to_string();
        let objects = match inner.containers.get(&key) {
            Some(container) => container.objects.len(),
            None => return Err(CloudError::NotFound(key)),
        };
        if objects > 0 {
            return Err(CloudError::Provisioning(format!(
                "{} is not empty ({} objects)",
                key, objects
            )));
        }
        inner.containers.remove(&key);
        Ok(())
    }

    async fn describe(&self, target: &ContainerRef) -> Result<ContainerMetadata> {
        let inner = self.record(Call::Describe(target.to_string()))?;
        let container = inner
            .containers
            .get(&target.to_string())
            .ok_or_else(|| CloudError::NotFound(target.to_string()))?;

        let mut metadata = ContainerMetadata::new()
            .with_region(container.region.clone())
            .with_created_at(container.created_at)
            .with_attribute("objects", serde_json::json!(container.objects.len()));
        if let Some(storage_class) = &container.storage_class {
            metadata = metadata.with_storage_class(storage_class.clone());
        }
        Ok(metadata)
    }

    async fn list(&self, parent: Option<&CanonicalId>) -> Result<Vec<ContainerSummary>> {
        let inner = self.record(Call::List(parent.map(|p| p.to_string())))?;

        match parent {
            Some(parent) if self.hierarchical => {
                if !inner.parents.contains_key(parent.as_str()) {
                    tracing::warn!("Parent {} does not exist", parent);
                    return Ok(Vec::new());
                }
                let prefix = format!("{}/", parent);
                Ok(inner
                    .containers
                    .iter()
                    .filter_map(|(key, c)| {
                        key.strip_prefix(&prefix)
                            .map(|id| ContainerSummary::new(id, Some(c.created_at)))
                    })
                    .collect())
            }
            None if self.hierarchical => Ok(inner
                .parents
                .iter()
                .map(|(id, created_at)| ContainerSummary::new(id.clone(), Some(*created_at)))
                .collect()),
            _ => Ok(inner
                .containers
                .iter()
                .map(|(key, c)| ContainerSummary::new(key.clone(), Some(c.created_at)))
                .collect()),
        }
    }

    async fn list_sub_resources(&self, target: &ContainerRef) -> Result<Vec<String>> {
        let inner = self.record(Call::ListSubResources(target.to_string()))?;
        let container = inner
            .containers
            .get(&target.to_string())
            .ok_or_else(|| CloudError::NotFound(target.to_string()))?;
        Ok(container.objects.iter().cloned().collect())
    }

    async fn delete_sub_resources(&self, target: &ContainerRef, keys: &[String]) -> Result<usize> {
        let mut inner = self.record(Call::DeleteSubResources(target.to_string(), keys.len()))?;
        let container = inner
            .containers
            .get_mut(&target.to_string())
            .ok_or_else(|| CloudError::NotFound(target.to_string()))?;
        Ok(keys.iter().filter(|k| container.objects.remove(*k)).count())
    }
}
