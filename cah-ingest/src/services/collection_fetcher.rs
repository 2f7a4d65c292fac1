//! Paged collection fetching
//!
//! Follows continuation tokens until the API returns a page without one,
//! flattening every page into one ordered record sequence.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::models::{PageCursor, PageToken, RawRecord};

/// Default bound on pages fetched for one collection
pub const DEFAULT_MAX_PAGES: usize = 1000;

/// Collection fetch errors
///
/// Any of these aborts the whole fetch: partial metadata risks missed items.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FetchError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed page: {0}")]
    MalformedPage(String),

    #[error("Pagination overrun: still paging after {max_pages} pages")]
    PaginationOverrun { max_pages: usize },

    #[error("Collection fetch cancelled")]
    Cancelled,
}

/// Source of collection pages (the remote metadata API)
#[async_trait]
pub trait CollectionSource: Send + Sync {
    /// Fetch the first page (`cursor == None`) or the page a token points to
    async fn fetch_page(
        &self,
        collection_id: &str,
        cursor: Option<&PageToken>,
    ) -> Result<PageCursor, FetchError>;
}

/// Drains a [`CollectionSource`] page by page
pub struct CollectionFetcher {
    source: Arc<dyn CollectionSource>,
    max_pages: usize,
}

impl CollectionFetcher {
    pub fn new(source: Arc<dyn CollectionSource>) -> Self {
        Self {
            source,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Bound the number of pages requested (at least one)
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// Fetch every record of a collection, in API order
    ///
    /// Items are not deduplicated across pages. Cancellation is checked before
    /// each page request.
    pub async fn fetch_all(
        &self,
        collection_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawRecord>, FetchError> {
        let mut records = Vec::new();
        let mut cursor: Option<PageToken> = None;
        let mut pages = 0usize;

        loop {
            if pages >= self.max_pages {
                tracing::error!(
                    collection_id = %collection_id,
                    max_pages = self.max_pages,
                    "Collection never returned a terminal page"
                );
                return Err(FetchError::PaginationOverrun {
                    max_pages: self.max_pages,
                });
            }

            if cancel.is_cancelled() {
                tracing::info!(collection_id = %collection_id, pages, "Collection fetch cancelled");
                return Err(FetchError::Cancelled);
            }

            let page = self.source.fetch_page(collection_id, cursor.as_ref()).await?;
            pages += 1;

            tracing::debug!(
                collection_id = %collection_id,
                page = pages,
                items = page.items.len(),
                has_next = page.next.is_some(),
                "Fetched collection page"
            );

            records.extend(page.items);

            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        tracing::info!(
            collection_id = %collection_id,
            pages,
            records = records.len(),
            "Fetched collection"
        );

        Ok(records)
    }
}
