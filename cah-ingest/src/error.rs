//! Pipeline-level errors

use thiserror::Error;

use crate::services::FetchError;

/// Hard failures of an ingestion run
///
/// Per-item failures never surface here; they are recorded in the report.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Collection fetch failed: {0}")]
    Fetch(#[from] FetchError),
}

impl PipelineError {
    /// Run stopped by cancellation before any ref was processed
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Fetch(FetchError::Cancelled))
    }
}
