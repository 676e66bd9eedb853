//! AWS S3 provider for BucketFlow
//!
//! This crate implements the StorageProvider trait for Amazon S3 buckets.
//!
//! # Requirements
//!
//! - `aws` CLI v2 must be installed
//! - Credentials are resolved by the CLI (environment, `~/.aws`, SSO, ...)
//!
//! # Example
//!
//! ```ignore
//! use bucketflow_cloud::{Reconciler, ResourceIntent};
//! use bucketflow_cloud_aws::{AwsConfig, S3Provider};
//!
//! let provider = S3Provider::new(AwsConfig::new().with_region("ap-northeast-1"));
//! let result = Reconciler::new(&provider)
//!     .reconcile(&ResourceIntent::create("my-data"))
//!     .await;
//! ```

pub mod error;
pub mod provider;
pub mod s3api;

pub use error::{AwsError, Result};
pub use provider::{AwsConfig, S3Provider};
pub use s3api::{BucketInfo, BucketLocation, S3Api};
