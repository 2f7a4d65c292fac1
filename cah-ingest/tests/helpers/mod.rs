//! Shared fakes for cah-ingest integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use cah_ingest::models::{Blob, PageCursor, PageToken, RawRecord, StorageKey};
use cah_ingest::services::{
    BlobDownloader, CollectionSource, DownloadError, FetchError, ObjectStore, StoreError,
};

/// Playlist item record with a single cover image
pub fn track_record(id: &str) -> RawRecord {
    RawRecord(json!({
        "added_at": "2024-03-01T12:00:00Z",
        "track": {
            "id": id,
            "name": format!("Track {}", id),
            "album": {"images": [
                {"url": cover_url(id), "height": 640, "width": 640},
                {"url": format!("{}-small", cover_url(id)), "height": 64, "width": 64}
            ]}
        }
    }))
}

pub fn cover_url(id: &str) -> String {
    format!("https://img.example/{}", id)
}

/// Serves records in fixed-size pages with cursors `c1`, `c2`, ...
pub struct PagedSource {
    pages: Vec<Vec<RawRecord>>,
    requests: AtomicUsize,
}

impl PagedSource {
    pub fn new(records: Vec<RawRecord>, page_size: usize) -> Self {
        let pages = if records.is_empty() {
            vec![Vec::new()]
        } else {
            records.chunks(page_size).map(<[RawRecord]>::to_vec).collect()
        };
        Self {
            pages,
            requests: AtomicUsize::new(0),
        }
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CollectionSource for PagedSource {
    async fn fetch_page(
        &self,
        _collection_id: &str,
        cursor: Option<&PageToken>,
    ) -> Result<PageCursor, FetchError> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        let index = match cursor {
            None => 0,
            Some(token) => token
                .as_str()
                .trim_start_matches('c')
                .parse::<usize>()
                .map_err(|e| FetchError::MalformedPage(e.to_string()))?,
        };

        let items = self
            .pages
            .get(index)
            .cloned()
            .ok_or_else(|| FetchError::Transport(format!("no page {}", index)))?;

        if index + 1 < self.pages.len() {
            Ok(PageCursor::with_next(items, PageToken::new(format!("c{}", index + 1))))
        } else {
            Ok(PageCursor::last(items))
        }
    }
}

/// Source whose every request fails
pub struct UnreachableSource;

#[async_trait]
impl CollectionSource for UnreachableSource {
    async fn fetch_page(
        &self,
        _collection_id: &str,
        _cursor: Option<&PageToken>,
    ) -> Result<PageCursor, FetchError> {
        Err(FetchError::Transport("connection refused".to_string()))
    }
}

/// Returns the URL bytes as the image, except for URLs marked as failing
#[derive(Default)]
pub struct FakeDownloader {
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl FakeDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, url: impl Into<String>) -> Self {
        self.failing.insert(url.into());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobDownloader for FakeDownloader {
    async fn download(&self, url: &str) -> Result<Blob, DownloadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.failing.contains(url) {
            return Err(DownloadError::Status {
                status: 404,
                url: url.to_string(),
            });
        }
        Ok(Blob::new(url.as_bytes().to_vec()).with_content_type("image/jpeg"))
    }
}

/// Existence checks fail with 503; puts are recorded
#[derive(Default)]
pub struct UnavailableStore {
    pub put_keys: Mutex<Vec<String>>,
}

#[async_trait]
impl ObjectStore for UnavailableStore {
    async fn exists(&self, key: &StorageKey) -> Result<bool, StoreError> {
        Err(StoreError::Status {
            status: 503,
            key: key.to_string(),
        })
    }

    async fn put(&self, key: &StorageKey, _blob: &Blob) -> Result<(), StoreError> {
        self.put_keys
            .lock()
            .unwrap()
            .push(key.as_str().to_string());
        Ok(())
    }

    async fn get(&self, key: &StorageKey) -> Result<Blob, StoreError> {
        Err(StoreError::NotFound(key.to_string()))
    }
}
