//! Object storage access
//!
//! [`ObjectStore`] is the seam to the remote bucket. [`HttpObjectStore`] talks
//! to an S3-compatible path-style endpoint (`{endpoint}/{bucket}/{key}`);
//! [`InMemoryObjectStore`] keeps everything in process for tests and dry runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

use cah_common::ObjectStoreConfig;

use crate::models::{Blob, StorageKey};

const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// Object store errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("HTTP {status} for key {key}")]
    Status { status: u16, key: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

/// Result of a conditional put
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionalPut {
    Created,
    AlreadyExists,
}

/// Remote object storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// `Ok(false)` only when the store positively reports the key absent
    async fn exists(&self, key: &StorageKey) -> Result<bool, StoreError>;

    /// Unconditional write (overwrites)
    async fn put(&self, key: &StorageKey, blob: &Blob) -> Result<(), StoreError>;

    async fn get(&self, key: &StorageKey) -> Result<Blob, StoreError>;

    fn supports_conditional_put(&self) -> bool {
        false
    }

    /// Atomic create-if-absent
    async fn put_if_not_exists(
        &self,
        key: &StorageKey,
        _blob: &Blob,
    ) -> Result<ConditionalPut, StoreError> {
        Err(StoreError::Unsupported(format!(
            "conditional put of {}",
            key
        )))
    }
}

/// S3-compatible object store over plain HTTP
///
/// Request signing is not performed; point it at a gateway or bucket that
/// accepts the client's credentials out of band.
pub struct HttpObjectStore {
    http_client: reqwest::Client,
    endpoint: String,
    bucket: String,
    conditional_put: bool,
}

impl HttpObjectStore {
    pub fn new(config: &ObjectStoreConfig) -> Result<Self, StoreError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        Ok(Self::with_client(http_client, config))
    }

    pub fn with_client(http_client: reqwest::Client, config: &ObjectStoreConfig) -> Self {
        Self {
            http_client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            bucket: config.bucket.trim_matches('/').to_string(),
            conditional_put: config.conditional_put,
        }
    }

    /// Path-style `{endpoint}/{bucket}/{key}`
    ///
    /// Each `/`-separated part of the key is percent-encoded as its own path
    /// segment.
    fn object_url(&self, key: &StorageKey) -> Result<reqwest::Url, StoreError> {
        let mut url = reqwest::Url::parse(&self.endpoint).map_err(|e| {
            StoreError::Transport(format!("invalid endpoint {}: {}", self.endpoint, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                StoreError::Transport(format!("endpoint {} cannot take a path", self.endpoint))
            })?
            .pop_if_empty()
            .push(&self.bucket)
            .extend(key.as_str().split('/'));
        Ok(url)
    }

    fn put_request(
        &self,
        key: &StorageKey,
        blob: &Blob,
    ) -> Result<reqwest::RequestBuilder, StoreError> {
        let content_type = blob.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE);

        Ok(self
            .http_client
            .put(self.object_url(key)?)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(blob.bytes.clone()))
    }
}

fn transport(e: reqwest::Error) -> StoreError {
    StoreError::Transport(e.to_string())
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn exists(&self, key: &StorageKey) -> Result<bool, StoreError> {
        let response = self
            .http_client
            .head(self.object_url(key)?)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status.is_success() {
            Ok(true)
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Ok(false)
        } else {
            Err(StoreError::Status {
                status: status.as_u16(),
                key: key.to_string(),
            })
        }
    }

    async fn put(&self, key: &StorageKey, blob: &Blob) -> Result<(), StoreError> {
        let response = self.put_request(key, blob)?.send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                key: key.to_string(),
            });
        }

        tracing::debug!(key = %key, bytes = blob.len(), "Stored object");
        Ok(())
    }

    async fn get(&self, key: &StorageKey) -> Result<Blob, StoreError> {
        let response = self
            .http_client
            .get(self.object_url(key)?)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(key.to_string()));
        }
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                key: key.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(transport)?;

        let mut blob = Blob::new(bytes);
        blob.content_type = content_type;
        Ok(blob)
    }

    fn supports_conditional_put(&self) -> bool {
        self.conditional_put
    }

    async fn put_if_not_exists(
        &self,
        key: &StorageKey,
        blob: &Blob,
    ) -> Result<ConditionalPut, StoreError> {
        if !self.conditional_put {
            return Err(StoreError::Unsupported(format!(
                "conditional put disabled for bucket {}",
                self.bucket
            )));
        }

        let response = self
            .put_request(key, blob)?
            .header(reqwest::header::IF_NONE_MATCH, "*")
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status == reqwest::StatusCode::PRECONDITION_FAILED {
            return Ok(ConditionalPut::AlreadyExists);
        }
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                key: key.to_string(),
            });
        }

        Ok(ConditionalPut::Created)
    }
}

/// In-process [`ObjectStore`]
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<String, Blob>>,
    conditional_put: bool,
    puts: AtomicUsize,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that advertises (and honours) conditional put
    pub fn with_conditional_put() -> Self {
        Self {
            conditional_put: true,
            ..Self::default()
        }
    }

    pub async fn contains(&self, key: &StorageKey) -> bool {
        self.objects.read().await.contains_key(key.as_str())
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// Number of writes that transferred bytes (conditional or not)
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn exists(&self, key: &StorageKey) -> Result<bool, StoreError> {
        Ok(self.contains(key).await)
    }

    async fn put(&self, key: &StorageKey, blob: &Blob) -> Result<(), StoreError> {
        self.objects
            .write()
            .await
            .insert(key.as_str().to_string(), blob.clone());
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, key: &StorageKey) -> Result<Blob, StoreError> {
        self.objects
            .read()
            .await
            .get(key.as_str())
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn supports_conditional_put(&self) -> bool {
        self.conditional_put
    }

    async fn put_if_not_exists(
        &self,
        key: &StorageKey,
        blob: &Blob,
    ) -> Result<ConditionalPut, StoreError> {
        if !self.conditional_put {
            return Err(StoreError::Unsupported(format!("conditional put of {}", key)));
        }

        let mut objects = self.objects.write().await;
        if objects.contains_key(key.as_str()) {
            return Ok(ConditionalPut::AlreadyExists);
        }
        objects.insert(key.as_str().to_string(), blob.clone());
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(ConditionalPut::Created)
    }
}
