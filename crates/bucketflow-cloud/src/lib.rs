//! BucketFlow Cloud Storage
//!
//! This crate provides the provider-agnostic core of BucketFlow: idempotent
//! lifecycle management (create, delete, inspect, enumerate) of
//! object-storage containers across cloud providers with different naming
//! rules and resource hierarchies.
//!
//! # Supported Providers
//!
//! - **AWS S3**: buckets (via aws CLI) in `bucketflow-cloud-aws`
//! - **Azure Blob Storage**: containers inside storage accounts (via az CLI)
//!   in `bucketflow-cloud-azure`
//! - **Google Cloud Storage**: buckets (via JSON API) in `bucketflow-cloud-gcp`
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 BucketFlow CLI                  │
//! │         (create / delete / check / list)        │
//! └─────────────────┬───────────────────────────────┘
//!                   │ ResourceIntent
//! ┌─────────────────▼───────────────────────────────┐
//! │                bucketflow-cloud                 │
//! │  ┌──────────────┐  ┌─────────────────────────┐  │
//! │  │    naming    │  │  Reconciler (engine)    │  │
//! │  └──────────────┘  └────────────┬────────────┘  │
//! │  ┌──────────────────────────────▼───────────┐   │
//! │  │  trait StorageProvider { exists, ... }   │   │
//! │  └──────────────────────────────────────────┘   │
//! └───────┬─────────────────┬─────────────────┬─────┘
//!         │                 │                 │
//! ┌───────▼──────┐ ┌────────▼───────┐ ┌───────▼──────┐
//! │   aws (s3)   │ │ azure (blob)   │ │  gcp (gcs)   │
//! └──────────────┘ └────────────────┘ └──────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use bucketflow_cloud::{MemoryProvider, Outcome, Reconciler, ResourceIntent};
//!
//! # tokio_test_block(async {
//! let provider = MemoryProvider::flat();
//! let engine = Reconciler::new(&provider);
//!
//! let intent = ResourceIntent::create("my-data").with_region("r1");
//! assert_eq!(engine.reconcile(&intent).await.outcome, Outcome::Created);
//! assert_eq!(engine.reconcile(&intent).await.outcome, Outcome::AlreadyExisted);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

pub mod action;
pub mod error;
pub mod memory;
pub mod naming;
pub mod provider;
pub mod reconcile;
pub mod state;

// Re-exports
pub use action::{Detail, IntentAction, Outcome, PARENT_HINT, ReconcileResult, ResourceIntent};
pub use error::{CloudError, FailureKind, Result};
pub use memory::{Call, Capability, MemoryProvider};
pub use naming::{CanonicalId, Charset, NamingRules, normalize};
pub use provider::{ContainerRef, CreateOptions, PollConfig, StorageProvider, poll_until};
pub use reconcile::{Phase, Reconciler};
pub use state::{ContainerMetadata, ContainerSummary, ResourceState};
