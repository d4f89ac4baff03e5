//! Cloud Storage blob store.
//!
//! Uses the JSON API directly: bucket lookup (`GET /b/{bucket}`), bucket
//! creation (`POST /b?project=`) and simple media uploads.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::json;
use tracing::info;

use crate::errors::BlobStoreError;
use crate::interfaces::BlobStore;

/// Default Cloud Storage JSON API endpoint.
pub const DEFAULT_GCS_URL: &str = "https://storage.googleapis.com/storage/v1";

/// Default Cloud Storage upload endpoint.
pub const DEFAULT_GCS_UPLOAD_URL: &str = "https://storage.googleapis.com/upload/storage/v1";

/// Configuration for the Cloud Storage blob store.
#[derive(Debug, Clone)]
pub struct GcsConfig {
    /// Project that owns buckets created by this store.
    pub project_id: String,
    /// OAuth bearer token sent with every request, if any.
    pub access_token: Option<String>,
    pub base_url: String,
    pub upload_url: String,
}

impl GcsConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            access_token: None,
            base_url: DEFAULT_GCS_URL.to_string(),
            upload_url: DEFAULT_GCS_UPLOAD_URL.to_string(),
        }
    }

    pub fn with_access_token(mut self, access_token: Option<String>) -> Self {
        self.access_token = access_token;
        self
    }
}

/// Blob store backed by Cloud Storage buckets.
pub struct GcsBlobStore {
    client: Client,
    config: GcsConfig,
}

impl GcsBlobStore {
    pub fn new(config: GcsConfig) -> Result<Self, BlobStoreError> {
        let client = Client::builder()
            .build()
            .map_err(|e| BlobStoreError::connection(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.config.access_token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn bucket_url(&self, bucket: &str) -> String {
        format!("{}/b/{}", self.config.base_url, urlencoding::encode(bucket))
    }

    fn upload_url(&self, bucket: &str, name: &str) -> String {
        format!(
            "{}/b/{}/o?uploadType=media&name={}",
            self.config.upload_url,
            urlencoding::encode(bucket),
            urlencoding::encode(name)
        )
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, BlobStoreError> {
        self.authorize(request)
            .send()
            .await
            .map_err(|e| BlobStoreError::connection(e.to_string()))
    }

    async fn describe(response: Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        format!("status {}: {}", status, body)
    }
}

#[async_trait]
impl BlobStore for GcsBlobStore {
    async fn ensure_container(&self, container: &str) -> Result<(), BlobStoreError> {
        let response = self.send(self.client.get(self.bucket_url(container))).await?;

        match response.status() {
            status if status.is_success() => return Ok(()),
            StatusCode::NOT_FOUND => {}
            _ => return Err(BlobStoreError::container(Self::describe(response).await)),
        }

        let request = self
            .client
            .post(format!("{}/b", self.config.base_url))
            .query(&[("project", &self.config.project_id)])
            .json(&json!({ "name": container }));
        let response = self.send(request).await?;

        // 409: created by someone else since the lookup.
        if !response.status().is_success() && response.status() != StatusCode::CONFLICT {
            return Err(BlobStoreError::container(Self::describe(response).await));
        }

        info!(bucket = %container, "Created bucket");
        Ok(())
    }

    async fn write_blob(
        &self,
        container: &str,
        name: &str,
        content: Vec<u8>,
    ) -> Result<(), BlobStoreError> {
        let request = self
            .client
            .post(self.upload_url(container, name))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(content);
        let response = self.send(request).await?;

        if !response.status().is_success() {
            return Err(BlobStoreError::write(Self::describe(response).await));
        }
        Ok(())
    }
}
