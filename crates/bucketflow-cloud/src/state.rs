//! Observed state of storage containers
//!
//! Nothing here is persisted: each reconciliation cycle observes the
//! provider again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Result of an existence probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    /// The container does not exist
    Absent,
    /// The container exists
    Present,
    /// The container's parent (e.g. a storage account) does not exist yet.
    /// Only reported by hierarchical providers.
    ParentMissing,
}

impl ResourceState {
    pub fn is_present(&self) -> bool {
        matches!(self, ResourceState::Present)
    }
}

impl std::fmt::Display for ResourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceState::Absent => write!(f, "absent"),
            ResourceState::Present => write!(f, "present"),
            ResourceState::ParentMissing => write!(f, "parent-missing"),
        }
    }
}

/// Properties of an existing container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerMetadata {
    pub region: Option<String>,

    pub created_at: Option<DateTime<Utc>>,

    pub storage_class: Option<String>,

    pub etag: Option<String>,

    /// Provider-specific extras (lease status, last-modified, ...)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, serde_json::Value>,
}

impl ContainerMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_storage_class(mut self, storage_class: impl Into<String>) -> Self {
        self.storage_class = Some(storage_class.into());
        self
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn get_attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// One entry of an enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSummary {
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl ContainerSummary {
    pub fn new(id: impl Into<String>, created_at: Option<DateTime<Utc>>) -> Self {
        Self {
            id: id.into(),
            created_at,
        }
    }
}

/// Parse an RFC 3339 timestamp as reported by provider APIs.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
