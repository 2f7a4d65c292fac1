//! Dominant colors of stored covers
//!
//! Reads a cover back from the object store and runs it through the palette
//! clusterer. Decoding and clustering are CPU-bound and run on the blocking
//! pool.

use std::sync::Arc;
use thiserror::Error;

use cah_common::PaletteConfig;
use cah_palette::{ChannelOrder, ClusterConfig, Palette, PaletteError};

use super::object_store::{ObjectStore, StoreError};
use crate::models::{IngestOutcome, IngestReport, StorageKey};

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("Object store error: {0}")]
    Store(#[from] StoreError),

    #[error("Palette error: {0}")]
    Palette(#[from] PaletteError),

    #[error("Palette task failed: {0}")]
    Task(String),
}

/// Default number of colors per palette
pub const DEFAULT_PALETTE_SIZE: usize = 3;

pub struct CoverPaletteAnalyzer {
    store: Arc<dyn ObjectStore>,
    config: ClusterConfig,
    k: usize,
    order: ChannelOrder,
}

impl CoverPaletteAnalyzer {
    /// Analyzer producing RGB palettes of [`DEFAULT_PALETTE_SIZE`] colors
    pub fn new(store: Arc<dyn ObjectStore>, config: ClusterConfig) -> Self {
        Self {
            store,
            config,
            k: DEFAULT_PALETTE_SIZE,
            order: ChannelOrder::Rgb,
        }
    }

    /// Analyzer tuned from `[palette]`
    pub fn from_config(store: Arc<dyn ObjectStore>, config: &PaletteConfig) -> Self {
        Self::new(store, ClusterConfig::from(config)).with_k(config.k)
    }

    /// Number of colors to extract
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Channel order of the samples handed to the clusterer
    pub fn with_order(mut self, order: ChannelOrder) -> Self {
        self.order = order;
        self
    }

    pub async fn analyze(&self, key: &StorageKey) -> Result<Palette, AnalyzeError> {
        let blob = self.store.get(key).await?;
        let k = self.k;

        tracing::debug!(key = %key, bytes = blob.len(), k, "Analyzing cover palette");

        let config = self.config.clone();
        let order = self.order;
        let palette = tokio::task::spawn_blocking(move || {
            Palette::from_image(&blob.bytes, order, k, &config)
        })
        .await
        .map_err(|e| AnalyzeError::Task(e.to_string()))??;

        tracing::info!(
            key = %key,
            colors = ?palette.hex_colors(),
            "Cover palette extracted"
        );

        Ok(palette)
    }

    /// Palettes of every cover a run uploaded, in report order
    ///
    /// Skipped and failed entries are not analyzed. A cover that cannot be
    /// analyzed yields its error without stopping the rest.
    pub async fn analyze_uploaded(
        &self,
        report: &IngestReport,
    ) -> Vec<(StorageKey, Result<Palette, AnalyzeError>)> {
        let mut palettes = Vec::new();
        for entry in &report.entries {
            if entry.outcome != IngestOutcome::Uploaded {
                continue;
            }
            let result = self.analyze(&entry.key).await;
            if let Err(e) = &result {
                tracing::warn!(
                    run_id = %report.run_id,
                    track_id = %entry.cover.id,
                    key = %entry.key,
                    error = %e,
                    "Cover palette extraction failed"
                );
            }
            palettes.push((entry.key.clone(), result));
        }
        palettes
    }
}
