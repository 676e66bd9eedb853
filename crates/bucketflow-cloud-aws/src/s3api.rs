//! aws CLI wrapper
//!
//! Wraps the `aws s3api` commands used for bucket lifecycle operations.

use crate::error::{AwsError, Result};
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::process::Command;

/// `delete-objects` accepts at most this many keys per request
pub const DELETE_BATCH_SIZE: usize = 1000;

/// Region S3 reports as a null `LocationConstraint`
pub const US_EAST_1: &str = "us-east-1";

/// aws CLI wrapper
pub struct S3Api {
    program: String,
    program_args: Vec<String>,
    profile: Option<String>,
}

impl S3Api {
    pub fn new(profile: Option<String>) -> Self {
        Self {
            program: "aws".to_string(),
            program_args: Vec::new(),
            profile,
        }
    }

    /// Use a different executable, e.g. a pinned `aws` or a wrapper script.
    #[doc(hidden)]
    pub fn with_program(mut self, program: impl Into<String>, args: Vec<String>) -> Self {
        self.program = program.into();
        self.program_args = args;
        self
    }

    /// Run an `aws s3api` command and return stdout
    async fn run_command(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.program_args);
        cmd.arg("s3api");
        cmd.args(args);
        if let Some(profile) = &self.profile {
            cmd.arg("--profile").arg(profile);
        }
        cmd.arg("--output").arg("json");
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("Running: {} s3api {}", self.program, args.join(" "));

        let output = match cmd.output().await {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AwsError::CliNotFound(self.program.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AwsError::from_stderr(&stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Check that the bucket exists and is accessible
    pub async fn head_bucket(&self, bucket: &str) -> Result<()> {
        self.run_command(&["head-bucket", "--bucket", bucket])
            .await?;
        Ok(())
    }

    /// Create a bucket in `region`
    pub async fn create_bucket(&self, bucket: &str, region: &str) -> Result<()> {
        let constraint = format!("LocationConstraint={}", region);
        let mut args = vec!["create-bucket", "--bucket", bucket, "--region", region];

        // us-east-1 rejects an explicit location constraint
        if region != US_EAST_1 {
            args.push("--create-bucket-configuration");
            args.push(constraint.as_str());
        }

        self.run_command(&args).await?;
        Ok(())
    }

    /// Delete an empty bucket
    pub async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        self.run_command(&["delete-bucket", "--bucket", bucket])
            .await?;
        Ok(())
    }

    /// Region the bucket lives in
    pub async fn get_bucket_location(&self, bucket: &str) -> Result<String> {
        let output = self
            .run_command(&["get-bucket-location", "--bucket", bucket])
            .await?;
        let location: BucketLocation = serde_json::from_str(&output)?;
        Ok(location.region())
    }

    /// List all buckets owned by the caller
    pub async fn list_buckets(&self) -> Result<Vec<BucketInfo>> {
        let output = self.run_command(&["list-buckets"]).await?;

        if output.trim().is_empty() {
            return Ok(Vec::new());
        }

        let list: ListBucketsOutput = serde_json::from_str(&output)?;
        Ok(list.buckets)
    }

    /// List every object key in the bucket (the CLI follows continuation tokens)
    pub async fn list_object_keys(&self, bucket: &str) -> Result<Vec<String>> {
        let output = self
            .run_command(&["list-objects-v2", "--bucket", bucket])
            .await?;

        if output.trim().is_empty() {
            return Ok(Vec::new());
        }

        let list: ListObjectsOutput = serde_json::from_str(&output)?;
        Ok(list.contents.into_iter().map(|o| o.key).collect())
    }

    /// Delete objects in batches, returning how many were removed
    pub async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<usize> {
        let mut deleted = 0;

        for batch in keys.chunks(DELETE_BATCH_SIZE) {
            let request = DeleteRequest {
                objects: batch
                    .iter()
                    .map(|key| ObjectIdentifier { key: key.clone() })
                    .collect(),
                quiet: true,
            };
            let payload = serde_json::to_string(&request)?;

            let output = self
                .run_command(&["delete-objects", "--bucket", bucket, "--delete", &payload])
                .await?;

            let errors = if output.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str::<DeleteObjectsOutput>(&output)?.errors
            };
            for error in &errors {
                tracing::warn!(
                    "Could not delete s3://{}/{}: {} {}",
                    bucket,
                    error.key,
                    error.code,
                    error.message
                );
            }
            deleted += batch.len() - errors.len().min(batch.len());
        }

        Ok(deleted)
    }
}

/// `get-bucket-location` response
#[derive(Debug, Clone, Deserialize)]
pub struct BucketLocation {
    #[serde(rename = "LocationConstraint")]
    pub location_constraint: Option<String>,
}

impl BucketLocation {
    /// Region name, resolving the legacy encodings S3 still returns
    pub fn region(&self) -> String {
        match self.location_constraint.as_deref() {
            None | Some("") => US_EAST_1.to_string(),
            Some("EU") => "eu-west-1".to_string(),
            Some(region) => region.to_string(),
        }
    }
}

/// Bucket entry from `list-buckets`
#[derive(Debug, Clone, Deserialize)]
pub struct BucketInfo {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "CreationDate")]
    pub creation_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListBucketsOutput {
    #[serde(rename = "Buckets", default)]
    buckets: Vec<BucketInfo>,
}

#[derive(Debug, Deserialize)]
struct ListObjectsOutput {
    #[serde(rename = "Contents", default)]
    contents: Vec<ObjectInfo>,
}

#[derive(Debug, Deserialize)]
struct ObjectInfo {
    #[serde(rename = "Key")]
    key: String,
}

#[derive(Debug, Serialize)]
struct DeleteRequest {
    #[serde(rename = "Objects")]
    objects: Vec<ObjectIdentifier>,

    #[serde(rename = "Quiet")]
    quiet: bool,
}

#[derive(Debug, Serialize)]
struct ObjectIdentifier {
    #[serde(rename = "Key")]
    key: String,
}

#[derive(Debug, Deserialize)]
struct DeleteObjectsOutput {
    #[serde(rename = "Errors", default)]
    errors: Vec<DeleteError>,
}

#[derive(Debug, Deserialize)]
struct DeleteError {
    #[serde(rename = "Key", default)]
    key: String,

    #[serde(rename = "Code", default)]
    code: String,

    #[serde(rename = "Message", default)]
    message: String,
}
