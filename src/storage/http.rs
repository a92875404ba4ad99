//! HTTP client for the hosted storage REST API.
//!
//! Objects live under `{base}/storage/v1/object/{bucket}/{path}`; signed URLs
//! are minted by `POST {base}/storage/v1/object/sign/{bucket}/{path}` and
//! returned relative to `{base}/storage/v1`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{ObjectStore, StorageError, validate_path};

const API_PREFIX: &str = "storage/v1";
const BODY_SNIPPET_CHARS: usize = 200;

pub struct HttpObjectStore {
    client: reqwest::Client,
    base_url: Url,
    bucket: String,
    service_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignRequest {
    expires_in: u64,
}

#[derive(Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL", alias = "signedUrl")]
    signed_url: String,
}

impl HttpObjectStore {
    pub fn new(base_url: &str, bucket: &str, service_key: &str) -> Result<Self, StorageError> {
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: Url::parse(base_url)?,
            bucket: bucket.to_string(),
            service_key: service_key.to_string(),
        })
    }

    /// `{base}/storage/v1/{action...}/{bucket}/{path}` with each segment escaped.
    fn endpoint(&self, action: &[&str], path: &str) -> Result<Url, StorageError> {
        validate_path(path)?;

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StorageError::InvalidPath(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(API_PREFIX.split('/'))
            .extend(action)
            .push(&self.bucket)
            .extend(path.split('/'));
        Ok(url)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
    }

    async fn failure(path: &str, response: reqwest::Response) -> StorageError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status == StatusCode::NOT_FOUND || body.contains("\"statusCode\":\"404\"") {
            return StorageError::NotFound(path.to_string());
        }

        StorageError::Api {
            status: status.as_u16(),
            message: body.chars().take(BODY_SNIPPET_CHARS).collect(),
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn download(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let url = self.endpoint(&["object"], path)?;
        let response = self.authorized(self.client.get(url)).send().await?;

        if !response.status().is_success() {
            return Err(Self::failure(path, response).await);
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let url = self.endpoint(&["object"], path)?;
        let response = self
            .authorized(self.client.post(url))
            .header("content-type", content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::failure(path, response).await);
        }

        tracing::debug!(path, "Uploaded object");
        Ok(())
    }

    async fn signed_url(&self, path: &str, expires_in: Duration) -> Result<String, StorageError> {
        let url = self.endpoint(&["object", "sign"], path)?;
        let response = self
            .authorized(self.client.post(url))
            .json(&SignRequest {
                expires_in: expires_in.as_secs(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::failure(path, response).await);
        }

        let signed: SignResponse = response.json().await?;
        Ok(format!(
            "{}/{}{}",
            self.base_url.as_str().trim_end_matches('/'),
            API_PREFIX,
            signed.signed_url
        ))
    }
}
