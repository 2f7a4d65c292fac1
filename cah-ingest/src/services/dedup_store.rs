//! Existence-checked uploads
//!
//! Upload a blob only when its key is absent from the object store. With a
//! store that supports conditional put the decision is atomic. Otherwise the
//! check and the put are separate calls without a lock, so two concurrent runs
//! may both upload the same key; since keys are derived from track IDs the
//! second write carries the same content.

use std::sync::Arc;

use super::object_store::{ConditionalPut, ObjectStore};
use crate::models::{Blob, IngestOutcome, StorageKey};

pub struct DedupStore {
    store: Arc<dyn ObjectStore>,
}

impl DedupStore {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Store `blob` under `key` unless something is already there
    ///
    /// Never returns `DownloadFailed`. An existence check that fails for any
    /// reason other than "absent" yields `UploadFailed` without a put.
    pub async fn put_if_absent(&self, key: &StorageKey, blob: Blob) -> IngestOutcome {
        if self.store.supports_conditional_put() {
            return match self.store.put_if_not_exists(key, &blob).await {
                Ok(ConditionalPut::Created) => {
                    tracing::debug!(key = %key, bytes = blob.len(), "Uploaded (conditional)");
                    IngestOutcome::Uploaded
                }
                Ok(ConditionalPut::AlreadyExists) => {
                    tracing::debug!(key = %key, "Already stored, skipping");
                    IngestOutcome::Skipped
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Conditional upload failed");
                    IngestOutcome::UploadFailed(e.to_string())
                }
            };
        }

        match self.store.exists(key).await {
            Ok(true) => {
                tracing::debug!(key = %key, "Already stored, skipping");
                return IngestOutcome::Skipped;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Existence check failed");
                return IngestOutcome::UploadFailed(e.to_string());
            }
        }

        match self.store.put(key, &blob).await {
            Ok(()) => {
                tracing::debug!(key = %key, bytes = blob.len(), "Uploaded");
                IngestOutcome::Uploaded
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Upload failed");
                IngestOutcome::UploadFailed(e.to_string())
            }
        }
    }
}
