//! cah-ingest - Cover Art Harvester
//!
//! Walks a paged playlist collection, downloads each track's cover image and
//! uploads it to an object store only when its key is not already there.
//! Stored covers can be read back and reduced to their dominant colors.
//!
//! Exposed as a library so the pipeline can be driven (and tested) with
//! in-process sources and stores.

pub mod error;
pub mod models;
pub mod services;

pub use crate::error::PipelineError;
pub use crate::models::{IngestOutcome, IngestReport, StorageKey};
pub use crate::services::{CoverPaletteAnalyzer, IngestionPipeline};
