//! Data models for cah-ingest

pub mod cover_art;
pub mod ingest_report;

pub use cover_art::{Blob, CoverArtRef, PageCursor, PageToken, RawRecord, StorageKey};
pub use ingest_report::{IngestEntry, IngestOutcome, IngestReport, RejectedRecord};
