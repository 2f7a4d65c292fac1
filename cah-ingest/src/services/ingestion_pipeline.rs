//! Collection ingestion
//!
//! Fetch → extract → download → dedup-upload for every record of a
//! collection. Pagination failures abort the run; everything after that is
//! isolated per item and ends up in the [`IngestReport`].

use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use cah_common::TomlConfig;

use super::blob_downloader::BlobDownloader;
use super::collection_fetcher::{CollectionFetcher, CollectionSource};
use super::cover_extractor::TrackCoverExtractor;
use super::dedup_store::DedupStore;
use super::object_store::ObjectStore;
use crate::error::PipelineError;
use crate::models::{
    CoverArtRef, IngestEntry, IngestOutcome, IngestReport, RejectedRecord, StorageKey,
};

/// Default number of refs in flight at once
pub const DEFAULT_CONCURRENCY: usize = 4;

pub struct IngestionPipeline {
    fetcher: CollectionFetcher,
    extractor: TrackCoverExtractor,
    downloader: Arc<dyn BlobDownloader>,
    dedup: DedupStore,
    concurrency: usize,
}

impl IngestionPipeline {
    pub fn new(
        source: Arc<dyn CollectionSource>,
        downloader: Arc<dyn BlobDownloader>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            fetcher: CollectionFetcher::new(source),
            extractor: TrackCoverExtractor::new(),
            downloader,
            dedup: DedupStore::new(store),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Pipeline tuned from `[pipeline]` and `[metadata_api]`
    pub fn from_config(
        source: Arc<dyn CollectionSource>,
        downloader: Arc<dyn BlobDownloader>,
        store: Arc<dyn ObjectStore>,
        config: &TomlConfig,
    ) -> Self {
        Self::new(source, downloader, store)
            .with_concurrency(config.pipeline.concurrency)
            .with_max_pages(config.metadata_api.max_pages)
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.fetcher = self.fetcher.with_max_pages(max_pages);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Ingest every cover of a collection
    ///
    /// Entries keep collection order. When `cancel` fires mid-run, refs that
    /// had not started are left out and `report.cancelled` is set.
    pub async fn run(
        &self,
        collection_id: &str,
        cancel: &CancellationToken,
    ) -> Result<IngestReport, PipelineError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        tracing::info!(run_id = %run_id, collection_id = %collection_id, "Starting ingestion run");

        let records = self.fetcher.fetch_all(collection_id, cancel).await?;

        let mut covers = Vec::with_capacity(records.len());
        let mut rejected = Vec::new();
        for (index, record) in records.iter().enumerate() {
            match self.extractor.extract(record) {
                Ok(cover) => covers.push(cover),
                Err(e) => {
                    tracing::warn!(
                        run_id = %run_id,
                        collection_id = %collection_id,
                        index,
                        track_id = e.track_id().unwrap_or("<unknown>"),
                        error = %e,
                        "Rejected track record"
                    );
                    rejected.push(RejectedRecord {
                        index,
                        track_id: e.track_id().map(str::to_string),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let total = covers.len();

        // Ordered buffering: up to `concurrency` refs in flight, results in input order
        let entries: Vec<IngestEntry> = stream::iter(covers)
            .map(|cover| async move {
                if cancel.is_cancelled() {
                    return None;
                }
                Some(self.ingest_one(run_id, collection_id, cover).await)
            })
            .buffered(self.concurrency)
            .filter_map(futures::future::ready)
            .collect()
            .await;

        let cancelled = entries.len() < total;

        let report = IngestReport {
            run_id,
            collection_id: collection_id.to_string(),
            started_at,
            finished_at: Utc::now(),
            entries,
            rejected,
            cancelled,
        };

        if cancelled {
            tracing::info!(
                run_id = %run_id,
                collection_id = %collection_id,
                processed = report.entries.len(),
                total,
                "Ingestion run cancelled"
            );
        } else {
            tracing::info!(
                run_id = %run_id,
                collection_id = %collection_id,
                uploaded = report.uploaded_count(),
                skipped = report.skipped_count(),
                download_failed = report.download_failed_count(),
                upload_failed = report.upload_failed_count(),
                rejected = report.rejected.len(),
                "Ingestion run completed"
            );
        }

        Ok(report)
    }

    async fn ingest_one(
        &self,
        run_id: Uuid,
        collection_id: &str,
        cover: CoverArtRef,
    ) -> IngestEntry {
        let key = StorageKey::for_cover(collection_id, &cover.id);

        let outcome = match self.downloader.download(&cover.url).await {
            Ok(blob) => self.dedup.put_if_absent(&key, blob).await,
            Err(e) => {
                tracing::warn!(
                    run_id = %run_id,
                    track_id = %cover.id,
                    url = %cover.url,
                    error = %e,
                    "Cover download failed"
                );
                IngestOutcome::DownloadFailed(e.to_string())
            }
        };

        tracing::debug!(
            run_id = %run_id,
            track_id = %cover.id,
            key = %key,
            outcome = ?outcome,
            "Processed cover"
        );

        IngestEntry { cover, key, outcome }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Blob, PageCursor, PageToken, RawRecord};
    use crate::services::blob_downloader::DownloadError;
    use crate::services::collection_fetcher::FetchError;
    use crate::services::object_store::InMemoryObjectStore;
    use async_trait::async_trait;
    use serde_json::json;

    struct OnePage(Vec<RawRecord>);

    #[async_trait]
    impl CollectionSource for OnePage {
        async fn fetch_page(
            &self,
            _collection_id: &str,
            _cursor: Option<&PageToken>,
        ) -> Result<PageCursor, FetchError> {
            Ok(PageCursor::last(self.0.clone()))
        }
    }

    struct EchoDownloader;

    #[async_trait]
    impl BlobDownloader for EchoDownloader {
        async fn download(&self, url: &str) -> Result<Blob, DownloadError> {
            Ok(Blob::new(url.as_bytes().to_vec()))
        }
    }

    fn track(id: &str) -> RawRecord {
        let images = json!([{ "url": format!("https://img/{}", id) }]);
        RawRecord(json!({"track": {"id": id, "name": id, "album": {"images": images}}}))
    }

    #[tokio::test]
    async fn test_rejected_records_do_not_stop_siblings() {
        let records = vec![
            track("a"),
            RawRecord(json!({"track": {"id": "b", "album": {"images": []}}})),
            track("c"),
        ];
        let store = Arc::new(InMemoryObjectStore::new());
        let pipeline =
            IngestionPipeline::new(Arc::new(OnePage(records)), Arc::new(EchoDownloader), store);

        let report = pipeline.run("pl", &CancellationToken::new()).await.unwrap();

        assert_eq!(report.uploaded_count(), 2);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].index, 1);
        assert_eq!(report.rejected[0].track_id.as_deref(), Some("b"));
        assert!(!report.cancelled);
    }

    #[test]
    fn test_concurrency_floor_is_one() {
        let pipeline = IngestionPipeline::new(
            Arc::new(OnePage(Vec::new())),
            Arc::new(EchoDownloader),
            Arc::new(InMemoryObjectStore::new()),
        )
        .with_concurrency(0);

        assert_eq!(pipeline.concurrency(), 1);
    }

    #[test]
    fn test_from_config_applies_tuning() {
        let mut config = TomlConfig::default();
        config.pipeline.concurrency = 8;
        config.metadata_api.max_pages = 3;

        let pipeline = IngestionPipeline::from_config(
            Arc::new(OnePage(Vec::new())),
            Arc::new(EchoDownloader),
            Arc::new(InMemoryObjectStore::new()),
            &config,
        );

        assert_eq!(pipeline.concurrency(), 8);
        assert_eq!(pipeline.fetcher.max_pages(), 3);
    }
}
