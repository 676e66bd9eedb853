//! Intent and result types for a reconciliation cycle

use crate::error::{CloudError, FailureKind};
use crate::state::{ContainerMetadata, ContainerSummary};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Parent hint key naming an explicit parent resource (Azure storage account)
pub const PARENT_HINT: &str = "parent";

/// Desired-state request for one container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceIntent {
    /// What to do
    pub action: IntentAction,

    /// User-supplied name, independent of provider rules.
    /// May be empty for [`IntentAction::Enumerate`].
    pub logical_name: String,

    /// Hints for resolving parent resources
    pub parent_hints: HashMap<String, String>,

    /// Region to create in; falls back to the provider default
    pub region: Option<String>,

    /// Storage class hint for creation
    pub storage_class: Option<String>,
}

impl ResourceIntent {
    pub fn new(action: IntentAction, logical_name: impl Into<String>) -> Self {
        Self {
            action,
            logical_name: logical_name.into(),
            parent_hints: HashMap::new(),
            region: None,
            storage_class: None,
        }
    }

    /// "container should exist"
    pub fn create(logical_name: impl Into<String>) -> Self {
        Self::new(IntentAction::Create, logical_name)
    }

    /// "container should not exist"
    pub fn delete(logical_name: impl Into<String>) -> Self {
        Self::new(IntentAction::Delete, logical_name)
    }

    pub fn describe(logical_name: impl Into<String>) -> Self {
        Self::new(IntentAction::Describe, logical_name)
    }

    pub fn enumerate() -> Self {
        Self::new(IntentAction::Enumerate, String::new())
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_storage_class(mut self, storage_class: impl Into<String>) -> Self {
        self.storage_class = Some(storage_class.into());
        self
    }

    pub fn with_parent_hint(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parent_hints.insert(key.into(), value.into());
        self
    }

    /// Shorthand for the [`PARENT_HINT`] hint
    pub fn with_parent(self, parent: impl Into<String>) -> Self {
        self.with_parent_hint(PARENT_HINT, parent)
    }

    pub fn parent_hint(&self) -> Option<&str> {
        self.parent_hints.get(PARENT_HINT).map(String::as_str)
    }
}

/// Requested action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentAction {
    /// Ensure the container exists
    Create,
    /// Ensure the container does not exist
    Delete,
    /// Report container properties
    Describe,
    /// List containers
    Enumerate,
}

impl std::fmt::Display for IntentAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntentAction::Create => write!(f, "create"),
            IntentAction::Delete => write!(f, "delete"),
            IntentAction::Describe => write!(f, "describe"),
            IntentAction::Enumerate => write!(f, "enumerate"),
        }
    }
}

/// Terminal outcome of a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Created,
    AlreadyExisted,
    Deleted,
    AlreadyAbsent,
    Listed,
    Failed,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::Failed)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Created => write!(f, "created"),
            Outcome::AlreadyExisted => write!(f, "already-existed"),
            Outcome::Deleted => write!(f, "deleted"),
            Outcome::AlreadyAbsent => write!(f, "already-absent"),
            Outcome::Listed => write!(f, "listed"),
            Outcome::Failed => write!(f, "failed"),
        }
    }
}

/// Structured detail attached to a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Detail {
    /// Container properties, verbatim from the provider
    Metadata(ContainerMetadata),

    /// Enumeration result, in provider order
    Listing { containers: Vec<ContainerSummary> },

    /// Objects removed before the container was deleted
    Cleanup { sub_resources_deleted: usize },

    /// Why the cycle failed
    Failure { kind: FailureKind, message: String },
}

/// Result of one reconciliation cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileResult {
    pub outcome: Outcome,

    /// Canonical resource the cycle acted on, when one was resolved
    pub resource: Option<String>,

    pub detail: Option<Detail>,
}

impl ReconcileResult {
    pub fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            resource: None,
            detail: None,
        }
    }

    pub fn failed(error: &CloudError) -> Self {
        Self::new(Outcome::Failed).with_detail(Detail::Failure {
            kind: error.kind(),
            message: error.to_string(),
        })
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_detail(mut self, detail: Detail) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Process exit status for this result
    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }

    /// Failure category, if the cycle failed
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.detail {
            Some(Detail::Failure { kind, .. }) => Some(*kind),
            _ => None,
        }
    }

    pub fn metadata(&self) -> Option<&ContainerMetadata> {
        match &self.detail {
            Some(Detail::Metadata(metadata)) => Some(metadata),
            _ => None,
        }
    }

    pub fn listing(&self) -> Option<&[ContainerSummary]> {
        match &self.detail {
            Some(Detail::Listing { containers }) => Some(containers),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        for outcome in [
            Outcome::Created,
            Outcome::AlreadyExisted,
            Outcome::Deleted,
            Outcome::AlreadyAbsent,
            Outcome::Listed,
        ] {
            assert_eq!(ReconcileResult::new(outcome).exit_code(), 0);
        }
        assert_eq!(ReconcileResult::new(Outcome::Failed).exit_code(), 1);
    }

    #[test]
    fn test_failed_keeps_kind_and_message() {
        let result = ReconcileResult::failed(&CloudError::AccessDenied("403".into()));
        assert_eq!(result.failure_kind(), Some(FailureKind::AccessDenied));
        match result.detail {
            Some(Detail::Failure { message, .. }) => assert!(message.contains("403")),
            other => panic!("unexpected detail: {:?}", other),
        }
    }

    #[test]
    fn test_intent_builders() {
        let intent = ResourceIntent::create("my-data")
            .with_region("r1")
            .with_parent("acct");
        assert_eq!(intent.action, IntentAction::Create);
        assert_eq!(intent.region.as_deref(), Some("r1"));
        assert_eq!(intent.parent_hint(), Some("acct"));
    }

    #[test]
    fn test_result_serializes_detail_tag() {
        let result = ReconcileResult::new(Outcome::Deleted)
            .with_resource("logs")
            .with_detail(Detail::Cleanup {
                sub_resources_deleted: 2,
            });
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["outcome"], "deleted");
        assert_eq!(json["detail"]["type"], "cleanup");
        assert_eq!(json["detail"]["sub_resources_deleted"], 2);
    }
}
