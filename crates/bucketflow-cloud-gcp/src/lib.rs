//! Google Cloud Storage provider for BucketFlow
//!
//! This crate implements the StorageProvider trait for GCS buckets using the
//! JSON API directly.
//!
//! # Requirements
//!
//! - An OAuth access token in `GOOGLE_OAUTH_ACCESS_TOKEN`
//!   (`export GOOGLE_OAUTH_ACCESS_TOKEN=$(gcloud auth print-access-token)`)
//! - A project in `GOOGLE_CLOUD_PROJECT` for create and list
//!
//! # Example
//!
//! ```ignore
//! use bucketflow_cloud::{Reconciler, ResourceIntent};
//! use bucketflow_cloud_gcp::{GcsConfig, GcsProvider};
//!
//! let provider = GcsProvider::new(GcsConfig::from_env().with_location("asia-northeast1"))?;
//! let result = Reconciler::new(&provider)
//!     .reconcile(&ResourceIntent::create("my-data"))
//!     .await;
//! ```

pub mod error;
pub mod gcs;
pub mod provider;

pub use error::{GcsError, Result};
pub use gcs::{Bucket, GcsClient};
pub use provider::{GcsConfig, GcsProvider};
