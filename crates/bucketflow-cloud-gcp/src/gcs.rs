//! Google Cloud Storage JSON API client
//!
//! Direct implementation of the bucket and object endpoints of the GCS JSON
//! API v1. Uses an OAuth access token as Bearer token, e.g. from
//! `gcloud auth print-access-token`.

use crate::error::{GcsError, Result};
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

pub const GCS_API_BASE: &str = "https://storage.googleapis.com/storage/v1";

/// Storage class used when none is requested
pub const DEFAULT_STORAGE_CLASS: &str = "STANDARD";

/// Page size for list requests
const PAGE_SIZE: &str = "1000";

/// GCS JSON API client
pub struct GcsClient {
    client: reqwest::Client,
    endpoint: Url,
    access_token: String,
    project: Option<String>,
}

impl GcsClient {
    pub fn new(
        endpoint: &str,
        access_token: impl Into<String>,
        project: Option<String>,
    ) -> Result<Self> {
        let endpoint =
            Url::parse(endpoint).map_err(|e| GcsError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
        if endpoint.cannot_be_a_base() {
            return Err(GcsError::InvalidEndpoint(endpoint.to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            access_token: access_token.into(),
            project,
        })
    }

    pub fn project(&self) -> Result<&str> {
        self.project.as_deref().ok_or(GcsError::MissingProject)
    }

    /// Endpoint URL with percent-encoded path segments appended
    pub fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| GcsError::InvalidEndpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        tracing::debug!("{} {}", method, url);
        self.client.request(method, url).bearer_auth(&self.access_token)
    }

    /// Send a request, turning non-success statuses into [`GcsError::Api`]
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(GcsError::from_response(status.as_u16(), &body))
    }

    /// Fetch every page of a list endpoint
    async fn list_all<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .request(Method::GET, url.clone())
                .query(query)
                .query(&[("maxResults", PAGE_SIZE)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: ListResponse<T> = self.send(request).await?.json().await?;
            items.extend(page.items);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(items)
    }

    /// Get bucket metadata
    pub async fn get_bucket(&self, bucket: &str) -> Result<Bucket> {
        let url = self.url(&["b", bucket])?;
        let response = self.send(self.request(Method::GET, url)).await?;
        Ok(response.json().await?)
    }

    /// Create a bucket in the configured project
    pub async fn insert_bucket(
        &self,
        bucket: &str,
        location: &str,
        storage_class: &str,
    ) -> Result<Bucket> {
        let project = self.project()?;
        let url = self.url(&["b"])?;
        let body = InsertBucketRequest {
            name: bucket,
            location,
            storage_class,
        };

        let response = self
            .send(
                self.request(Method::POST, url)
                    .query(&[("project", project)])
                    .json(&body),
            )
            .await?;
        Ok(response.json().await?)
    }

    /// Delete an empty bucket
    pub async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        let url = self.url(&["b", bucket])?;
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    /// List buckets in the configured project
    pub async fn list_buckets(&self) -> Result<Vec<Bucket>> {
        let project = self.project()?;
        let url = self.url(&["b"])?;
        self.list_all(url, &[("project", project)]).await
    }

    /// Names of every object in the bucket
    pub async fn list_objects(&self, bucket: &str) -> Result<Vec<String>> {
        let url = self.url(&["b", bucket, "o"])?;
        let objects: Vec<ObjectItem> = self
            .list_all(url, &[("fields", "items(name),nextPageToken")])
            .await?;
        Ok(objects.into_iter().map(|o| o.name).collect())
    }

    pub async fn delete_object(&self, bucket: &str, object: &str) -> Result<()> {
        let url = self.url(&["b", bucket, "o", object])?;
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }
}

/// Bucket resource
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub name: String,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub location_type: Option<String>,

    #[serde(default)]
    pub storage_class: Option<String>,

    #[serde(default)]
    pub time_created: Option<String>,

    #[serde(default)]
    pub updated: Option<String>,

    #[serde(default)]
    pub etag: Option<String>,

    #[serde(default)]
    pub project_number: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertBucketRequest<'a> {
    name: &'a str,
    location: &'a str,
    storage_class: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,

    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectItem {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GcsClient {
        GcsClient::new(GCS_API_BASE, "token", Some("my-project".to_string())).unwrap()
    }

    #[test]
    fn test_url_encodes_object_names() {
        let url = client().url(&["b", "my-data", "o", "dir/a b.csv"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://storage.googleapis.com/storage/v1/b/my-data/o/dir%2Fa%20b.csv"
        );
    }

    #[test]
    fn test_url_with_trailing_slash_endpoint() {
        let client = GcsClient::new("http://127.0.0.1:4443/storage/v1/", "token", None).unwrap();
        assert_eq!(
            client.url(&["b"]).unwrap().as_str(),
            "http://127.0.0.1:4443/storage/v1/b"
        );
    }

    #[test]
    fn test_invalid_endpoint() {
        assert!(GcsClient::new("not a url", "token", None).is_err());
        assert!(GcsClient::new("mailto:someone@example.com", "token", None).is_err());
    }

    #[test]
    fn test_project_required() {
        let client = GcsClient::new(GCS_API_BASE, "token", None).unwrap();
        assert!(matches!(client.project(), Err(GcsError::MissingProject)));
    }

    #[test]
    fn test_parse_bucket() {
        let json = r#"{
            "kind": "storage#bucket",
            "id": "my-data",
            "name": "my-data",
            "projectNumber": "123456789",
            "metageneration": "1",
            "location": "ASIA-NORTHEAST1",
            "storageClass": "STANDARD",
            "etag": "CAE=",
            "timeCreated": "2024-05-12T00:00:00.000Z",
            "updated": "2024-05-12T00:00:00.000Z",
            "locationType": "region"
        }"#;
        let bucket: Bucket = serde_json::from_str(json).unwrap();
        assert_eq!(bucket.location.as_deref(), Some("ASIA-NORTHEAST1"));
        assert_eq!(bucket.storage_class.as_deref(), Some("STANDARD"));
        assert_eq!(bucket.location_type.as_deref(), Some("region"));
    }

    #[test]
    fn test_parse_empty_list() {
        let list: ListResponse<Bucket> =
            serde_json::from_str(r#"{"kind": "storage#buckets"}"#).unwrap();
        assert!(list.items.is_empty());
        assert!(list.next_page_token.is_none());
    }

    #[test]
    fn test_insert_request_shape() {
        let body = InsertBucketRequest {
            name: "my-data",
            location: "US",
            storage_class: DEFAULT_STORAGE_CLASS,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["storageClass"], "STANDARD");
        assert_eq!(json["location"], "US");
    }
}
