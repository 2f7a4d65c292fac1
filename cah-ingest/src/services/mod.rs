//! Service modules for cover art ingestion
//!
//! Traits at the external seams (collection source, downloader, object
//! store) with reqwest-backed implementations, plus the pipeline that wires
//! them together.

pub mod blob_downloader;
pub mod collection_fetcher;
pub mod cover_extractor;
pub mod dedup_store;
pub mod http_collection_source;
pub mod ingestion_pipeline;
pub mod object_store;
pub mod palette_analyzer;

pub use blob_downloader::{BlobDownloader, DownloadError, HttpBlobDownloader};
pub use collection_fetcher::{CollectionFetcher, CollectionSource, FetchError, DEFAULT_MAX_PAGES};
pub use cover_extractor::{ExtractError, TrackCoverExtractor};
pub use dedup_store::DedupStore;
pub use http_collection_source::{parse_page, HttpCollectionSource};
pub use ingestion_pipeline::{IngestionPipeline, DEFAULT_CONCURRENCY};
pub use object_store::{
    ConditionalPut, HttpObjectStore, InMemoryObjectStore, ObjectStore, StoreError,
};
pub use palette_analyzer::{AnalyzeError, CoverPaletteAnalyzer, DEFAULT_PALETTE_SIZE};
