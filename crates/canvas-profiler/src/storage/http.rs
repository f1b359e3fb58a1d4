use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::{ProfilerError, Result};

use super::ObjectStore;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Object store speaking the Supabase storage REST API.
///
/// `GET`/`POST {base}/storage/v1/object/{bucket}/{path}` with the service key
/// as bearer token.
#[derive(Clone)]
pub struct HttpObjectStore {
    base_url: String,
    service_key: String,
    client: Client,
}

impl HttpObjectStore {
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ProfilerError::InvalidConfig(
                "storage base URL must not be empty".to_string(),
            ));
        }

        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            base_url,
            service_key: service_key.into(),
            client,
        })
    }

    /// Build from `SUPABASE_URL` and `SUPABASE_SERVICE_KEY`.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("SUPABASE_URL")
            .map_err(|_| ProfilerError::InvalidConfig("SUPABASE_URL is not set".to_string()))?;
        let key = std::env::var("SUPABASE_SERVICE_KEY").map_err(|_| {
            ProfilerError::InvalidConfig("SUPABASE_SERVICE_KEY is not set".to_string())
        })?;
        Self::new(url, key)
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            bucket,
            path.trim_start_matches('/')
        )
    }

    async fn check(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ProfilerError::Storage(format!(
            "{action} failed with status {}: {body}",
            status.as_u16()
        )))
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>> {
        let url = self.object_url(bucket, path);
        debug!("Downloading {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .send()
            .await?;
        let response = Self::check(response, &format!("download of {bucket}/{path}")).await?;

        Ok(response.bytes().await?.to_vec())
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        let url = self.object_url(bucket, path);
        debug!("Uploading {} bytes to {}", bytes.len(), url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await?;
        Self::check(response, &format!("upload of {bucket}/{path}")).await?;

        Ok(())
    }
}
