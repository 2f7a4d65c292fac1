//! Cover image download

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::models::Blob;

const USER_AGENT: &str = concat!("cah-ingest/", env!("CARGO_PKG_VERSION"));

/// Download errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DownloadError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status} fetching {url}")]
    Status { status: u16, url: String },
}

/// Retrieves raw bytes for a URL
///
/// One attempt per call. Nothing is written to local storage.
#[async_trait]
pub trait BlobDownloader: Send + Sync {
    async fn download(&self, url: &str) -> Result<Blob, DownloadError>;
}

/// reqwest-backed [`BlobDownloader`]
pub struct HttpBlobDownloader {
    http_client: reqwest::Client,
}

impl HttpBlobDownloader {
    pub fn new(timeout: Duration) -> Result<Self, DownloadError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| DownloadError::Transport(e.to_string()))?;

        Ok(Self { http_client })
    }

    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl BlobDownloader for HttpBlobDownloader {
    async fn download(&self, url: &str) -> Result<Blob, DownloadError> {
        tracing::debug!(url = %url, "Downloading blob");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DownloadError::Transport(e.to_string()))?;

        let mut blob = Blob::new(bytes);
        blob.content_type = content_type;

        tracing::debug!(url = %url, bytes = blob.len(), "Downloaded blob");

        Ok(blob)
    }
}
