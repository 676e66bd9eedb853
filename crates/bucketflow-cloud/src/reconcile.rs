//! Reconciliation engine
//!
//! Drives any [`StorageProvider`] through one cycle:
//!
//! ```text
//! Start → Observing → Satisfying       → Done
//!                   ↘ AlreadySatisfied ↗
//!   (any phase) → Failed
//! ```
//!
//! The engine holds no state between cycles. Concurrent cycles for the same
//! container are tolerated: a create that loses a race (`Conflict`) and a
//! delete that loses a race (`NotFound`) both count as success.

use crate::action::{Detail, IntentAction, Outcome, ReconcileResult, ResourceIntent};
use crate::error::{CloudError, Result};
use crate::naming::{CanonicalId, normalize};
use crate::provider::{ContainerRef, CreateOptions, StorageProvider};
use crate::state::ResourceState;

/// Phase of a reconciliation cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    Observing,
    Satisfying,
    AlreadySatisfied,
    Done,
    Failed,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Start => write!(f, "start"),
            Phase::Observing => write!(f, "observing"),
            Phase::Satisfying => write!(f, "satisfying"),
            Phase::AlreadySatisfied => write!(f, "already-satisfied"),
            Phase::Done => write!(f, "done"),
            Phase::Failed => write!(f, "failed"),
        }
    }
}

/// Phase bookkeeping for a single cycle
struct Cycle<'a> {
    provider: &'a str,
    action: IntentAction,
    phase: Phase,
}

impl<'a> Cycle<'a> {
    fn start(provider: &'a str, action: IntentAction) -> Self {
        tracing::debug!(provider, %action, phase = %Phase::Start, "reconcile");
        Self {
            provider,
            action,
            phase: Phase::Start,
        }
    }

    fn enter(&mut self, next: Phase) {
        tracing::debug!(
            provider = self.provider,
            action = %self.action,
            "{} → {}",
            self.phase,
            next
        );
        self.phase = next;
    }

    fn finish(mut self, result: ReconcileResult) -> ReconcileResult {
        if self.phase != Phase::Done {
            self.enter(Phase::Done);
        }
        result
    }

    fn fail(mut self, error: &CloudError, resource: Option<&ContainerRef>) -> ReconcileResult {
        self.enter(Phase::Failed);
        tracing::error!(
            provider = self.provider,
            action = %self.action,
            kind = %error.kind(),
            "{}",
            error
        );
        let result = ReconcileResult::failed(error);
        match resource {
            Some(target) => result.with_resource(target.to_string()),
            None => result,
        }
    }
}

/// Provider-agnostic reconciliation engine
///
/// Borrows a provider for the duration of a cycle; the caller owns the
/// provider and whatever client handles it holds.
pub struct Reconciler<'a, P: StorageProvider + ?Sized> {
    provider: &'a P,
}

impl<'a, P: StorageProvider + ?Sized> Reconciler<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }

    /// Run one cycle for the intent.
    pub async fn reconcile(&self, intent: &ResourceIntent) -> ReconcileResult {
        match intent.action {
            IntentAction::Create => self.ensure_present(intent).await,
            IntentAction::Delete => self.ensure_absent(intent).await,
            IntentAction::Describe => self.describe(intent).await,
            IntentAction::Enumerate => self.enumerate(intent).await,
        }
    }

    /// Resolve the intent's logical name to canonical ids.
    pub fn resolve(&self, intent: &ResourceIntent) -> Result<ContainerRef> {
        let id = normalize(&intent.logical_name, &self.provider.naming_rules())?;
        let target = ContainerRef::new(id);
        match self.resolve_parent(intent)? {
            Some(parent) => Ok(target.with_parent(parent)),
            None => Ok(target),
        }
    }

    fn resolve_parent(&self, intent: &ResourceIntent) -> Result<Option<CanonicalId>> {
        let Some(rules) = self.provider.parent_naming_rules() else {
            return Ok(None);
        };
        let parent = match intent.parent_hint() {
            Some(explicit) => normalize(explicit, &rules.without_unique_suffix())?,
            None => normalize(&intent.logical_name, &rules)?,
        };
        Ok(Some(parent))
    }

    /// Ensure the container exists.
    pub async fn ensure_present(&self, intent: &ResourceIntent) -> ReconcileResult {
        let mut cycle = Cycle::start(self.provider.name(), IntentAction::Create);

        let target = match self.resolve(intent) {
            Ok(target) => target,
            Err(e) => return cycle.fail(&e, None),
        };

        cycle.enter(Phase::Observing);
        let state = match self.provider.exists(&target).await {
            Ok(state) => state,
            Err(e) => return cycle.fail(&e, Some(&target)),
        };
        tracing::debug!("{} is {}", target, state);

        if state.is_present() {
            cycle.enter(Phase::AlreadySatisfied);
            tracing::info!("{} already exists", target);
            return cycle
                .finish(ReconcileResult::new(Outcome::AlreadyExisted).with_resource(target.to_string()));
        }

        let region = match intent
            .region
            .as_deref()
            .or_else(|| self.provider.default_region())
        {
            Some(region) => region.to_string(),
            None => {
                let e = CloudError::InvalidConfig(format!(
                    "no region given for '{}' and {} has no default region",
                    target,
                    self.provider.display_name()
                ));
                return cycle.fail(&e, Some(&target));
            }
        };

        cycle.enter(Phase::Satisfying);
        if let Some(parent) = &target.parent {
            if let Err(e) = self.provider.ensure_parent(parent, &region).await {
                let e = match e {
                    CloudError::Provisioning(_) | CloudError::AccessDenied(_) => e,
                    other => CloudError::Provisioning(format!("parent '{}': {}", parent, other)),
                };
                return cycle.fail(&e, Some(&target));
            }
        }

        let mut options = CreateOptions::new(region);
        if let Some(storage_class) = &intent.storage_class {
            options = options.with_storage_class(storage_class.clone());
        }

        match self.provider.create(&target, &options).await {
            Ok(()) => tracing::info!("Created {} in {}", target, options.region),
            Err(CloudError::Conflict(message)) => {
                tracing::info!("{} was created concurrently: {}", target, message);
            }
            Err(e) => return cycle.fail(&e, Some(&target)),
        }

        cycle.finish(ReconcileResult::new(Outcome::Created).with_resource(target.to_string()))
    }

    /// Ensure the container does not exist.
    pub async fn ensure_absent(&self, intent: &ResourceIntent) -> ReconcileResult {
        let mut cycle = Cycle::start(self.provider.name(), IntentAction::Delete);

        let target = match self.resolve(intent) {
            Ok(target) => target,
            Err(e) => return cycle.fail(&e, None),
        };

        cycle.enter(Phase::Observing);
        let state = match self.provider.exists(&target).await {
            Ok(state) => state,
            Err(e) => return cycle.fail(&e, Some(&target)),
        };
        tracing::debug!("{} is {}", target, state);

        if !state.is_present() {
            cycle.enter(Phase::AlreadySatisfied);
            tracing::info!("{} does not exist", target);
            return cycle
                .finish(ReconcileResult::new(Outcome::AlreadyAbsent).with_resource(target.to_string()));
        }

        cycle.enter(Phase::Satisfying);
        let removed = self.empty_container(&target).await;

        match self.provider.delete(&target).await {
            Ok(()) => tracing::info!("Deleted {}", target),
            Err(CloudError::NotFound(message)) => {
                tracing::info!("{} was deleted concurrently: {}", target, message);
            }
            Err(e) => return cycle.fail(&e, Some(&target)),
        }

        cycle.finish(
            ReconcileResult::new(Outcome::Deleted)
                .with_resource(target.to_string())
                .with_detail(Detail::Cleanup {
                    sub_resources_deleted: removed,
                }),
        )
    }

    /// Best-effort removal of the container's objects.
    ///
    /// Some providers report failures when the container is already empty,
    /// so errors are only logged.
    async fn empty_container(&self, target: &ContainerRef) -> usize {
        let keys = match self.provider.list_sub_resources(target).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!("Could not list objects in {}: {}", target, e);
                return 0;
            }
        };
        if keys.is_empty() {
            tracing::debug!("{} is empty", target);
            return 0;
        }

        tracing::info!("Deleting {} object(s) from {}", keys.len(), target);
        match self.provider.delete_sub_resources(target, &keys).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!("Could not empty {}: {}", target, e);
                0
            }
        }
    }

    /// Report the properties of an existing container.
    pub async fn describe(&self, intent: &ResourceIntent) -> ReconcileResult {
        let mut cycle = Cycle::start(self.provider.name(), IntentAction::Describe);

        let target = match self.resolve(intent) {
            Ok(target) => target,
            Err(e) => return cycle.fail(&e, None),
        };

        cycle.enter(Phase::Observing);
        match self.provider.exists(&target).await {
            Ok(ResourceState::Present) => {}
            Ok(state) => {
                let e = CloudError::NotFound(format!("{} ({})", target, state));
                return cycle.fail(&e, Some(&target));
            }
            Err(e) => return cycle.fail(&e, Some(&target)),
        }

        match self.provider.describe(&target).await {
            Ok(metadata) => cycle.finish(
                ReconcileResult::new(Outcome::AlreadyExisted)
                    .with_resource(target.to_string())
                    .with_detail(Detail::Metadata(metadata)),
            ),
            Err(e) => cycle.fail(&e, Some(&target)),
        }
    }

    /// List containers.
    ///
    /// On hierarchical providers the listing is scoped to the parent named by
    /// the intent's parent hint, or derived from its logical name when one
    /// is given; otherwise the provider lists its top-level resources. A
    /// parent that does not exist yields an empty listing.
    pub async fn enumerate(&self, intent: &ResourceIntent) -> ReconcileResult {
        let mut cycle = Cycle::start(self.provider.name(), IntentAction::Enumerate);

        let parent = if intent.parent_hint().is_some() || !intent.logical_name.is_empty() {
            match self.resolve_parent(intent) {
                Ok(parent) => parent,
                Err(e) => return cycle.fail(&e, None),
            }
        } else {
            None
        };

        cycle.enter(Phase::Observing);
        match self.provider.list(parent.as_ref()).await {
            Ok(containers) => {
                tracing::debug!("Listed {} container(s)", containers.len());
                let result = ReconcileResult::new(Outcome::Listed)
                    .with_detail(Detail::Listing { containers });
                cycle.finish(match parent {
                    Some(parent) => result.with_resource(parent.into_string()),
                    None => result,
                })
            }
            Err(e) => cycle.fail(&e, None),
        }
    }
}
