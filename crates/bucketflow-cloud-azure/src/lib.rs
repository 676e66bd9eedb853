//! Azure Blob Storage provider for BucketFlow
//!
//! This crate implements the StorageProvider trait for Azure Blob Storage.
//! Unlike S3 and GCS, containers live inside a storage account, which is
//! created (and waited for) on demand.
//!
//! # Requirements
//!
//! - `az` CLI must be installed and signed in (`az login`)
//! - The identity needs Contributor on the resource group; container and
//!   blob commands use the account key unless [`AuthMode::Login`] is chosen
//!
//! # Example
//!
//! ```ignore
//! use bucketflow_cloud::{Reconciler, ResourceIntent};
//! use bucketflow_cloud_azure::{AzureBlobProvider, AzureConfig};
//!
//! let provider = AzureBlobProvider::new(AzureConfig::new("rg-data").with_region("japaneast"))?;
//! let result = Reconciler::new(&provider)
//!     .reconcile(&ResourceIntent::create("my-data"))
//!     .await;
//! ```

pub mod az;
pub mod error;
pub mod provider;

pub use az::{AuthMode, AzCli, BlobContainer, StorageAccount};
pub use error::{AzureError, Result};
pub use provider::{AzureBlobProvider, AzureConfig};
