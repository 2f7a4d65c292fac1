//! Records flowing from the metadata API to the object store

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque continuation token returned by a paged API call
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageToken(String);

impl PageToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One track record exactly as the metadata API returned it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(pub serde_json::Value);

/// One page of a paged collection
///
/// `next == None` is the only normal end of a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct PageCursor {
    pub items: Vec<RawRecord>,
    pub next: Option<PageToken>,
}

impl PageCursor {
    /// Final page (no continuation)
    pub fn last(items: Vec<RawRecord>) -> Self {
        Self { items, next: None }
    }

    /// Page followed by another one
    pub fn with_next(items: Vec<RawRecord>, next: PageToken) -> Self {
        Self {
            items,
            next: Some(next),
        }
    }
}

/// Normalized cover art reference for one track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverArtRef {
    /// Track ID, unique within the collection and never empty
    pub id: String,
    /// Track title
    pub name: String,
    /// Cover image URL
    pub url: String,
}

/// Downloaded image bytes
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

impl Blob {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Destination key of a cover in the object store
///
/// Depends only on the collection and track IDs, so re-running a collection
/// always targets the same keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageKey(String);

impl StorageKey {
    /// `{collection_id}/cover_art/{track_id}.jpg`
    pub fn for_cover(collection_id: &str, track_id: &str) -> Self {
        Self(format!("{}/cover_art/{}.jpg", collection_id, track_id))
    }

    /// Wrap an existing key (e.g. one read back for palette analysis)
    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
