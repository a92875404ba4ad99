//! # Object Storage
//!
//! Templates, rendered documents and signer attachments live in one storage
//! bucket. [`ObjectStore`] is the seam; [`HttpObjectStore`] talks to the hosted
//! storage REST API and [`MemoryObjectStore`] keeps objects in process for
//! local runs and tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::config::StorageConfig;

pub mod http;

pub use http::HttpObjectStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("invalid object path: {0}")]
    InvalidPath(String),
    #[error("storage API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid storage url: {0}")]
    Url(#[from] url::ParseError),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn download(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Creates or replaces the object at `path`.
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Time-limited URL granting read access to `path`.
    async fn signed_url(&self, path: &str, expires_in: Duration) -> Result<String, StorageError>;
}

/// Builds the store selected by configuration: HTTP when a base URL is set,
/// in-memory otherwise.
pub fn from_config(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>, StorageError> {
    match (&config.base_url, &config.service_key) {
        (Some(base_url), Some(service_key)) => Ok(Arc::new(HttpObjectStore::new(
            base_url,
            &config.bucket,
            service_key,
        )?)),
        _ => {
            tracing::warn!("No storage base URL configured; objects are kept in memory");
            Ok(Arc::new(MemoryObjectStore::new()))
        }
    }
}

/// Rejects empty, absolute and parent-relative object keys.
pub fn validate_path(path: &str) -> Result<(), StorageError> {
    let invalid = path.is_empty()
        || path.starts_with('/')
        || path
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");

    if invalid {
        Err(StorageError::InvalidPath(path.to_string()))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Process-local object store.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, path: &str) -> Option<StoredObject> {
        self.objects.read().await.get(path).cloned()
    }

    pub async fn paths(&self) -> Vec<String> {
        let mut paths: Vec<_> = self.objects.read().await.keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn download(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        validate_path(path)?;
        self.objects
            .read()
            .await
            .get(path)
            .map(|object| object.bytes.clone())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        validate_path(path)?;
        self.objects.write().await.insert(
            path.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn signed_url(&self, path: &str, expires_in: Duration) -> Result<String, StorageError> {
        validate_path(path)?;
        if !self.objects.read().await.contains_key(path) {
            return Err(StorageError::NotFound(path.to_string()));
        }
        Ok(format!(
            "memory://{}?expires_in={}",
            path,
            expires_in.as_secs()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_validation() {
        assert!(validate_path("templates/contrato.docx").is_ok());
        assert!(validate_path("").is_err());
        assert!(validate_path("/abs.docx").is_err());
        assert!(validate_path("a/../b.docx").is_err());
        assert!(validate_path("a//b.docx").is_err());
    }

    #[tokio::test]
    async fn memory_store_round_trip_and_signing() {
        let store = MemoryObjectStore::new();
        store
            .upload("templates/a.docx", b"doc".to_vec(), "application/octet-stream")
            .await
            .unwrap();

        assert_eq!(store.download("templates/a.docx").await.unwrap(), b"doc");
        assert_eq!(
            store
                .signed_url("templates/a.docx", Duration::from_secs(3600))
                .await
                .unwrap(),
            "memory://templates/a.docx?expires_in=3600"
        );
        assert!(matches!(
            store.download("templates/missing.docx").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn unconfigured_storage_falls_back_to_memory() {
        assert!(from_config(&StorageConfig::default()).is_ok());
    }
}
