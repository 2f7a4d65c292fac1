//! Per-item ingestion outcomes and the run report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cover_art::{CoverArtRef, StorageKey};

/// What happened to one cover ref
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum IngestOutcome {
    /// Key was absent and the blob was stored
    Uploaded,
    /// Key already present; nothing transferred to the store
    Skipped,
    /// Image could not be fetched; storage was not attempted
    DownloadFailed(String),
    /// Existence check or put failed
    UploadFailed(String),
}

impl IngestOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::DownloadFailed(_) | Self::UploadFailed(_))
    }
}

/// One processed cover ref
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestEntry {
    pub cover: CoverArtRef,
    pub key: StorageKey,
    pub outcome: IngestOutcome,
}

/// A record that never became a cover ref
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRecord {
    /// Position in the fetched collection
    pub index: usize,
    /// Track ID when the record carried one
    pub track_id: Option<String>,
    pub reason: String,
}

/// Result of one pipeline run over a collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub run_id: Uuid,
    pub collection_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Processed refs, in collection order
    pub entries: Vec<IngestEntry>,
    /// Records rejected during cover extraction
    pub rejected: Vec<RejectedRecord>,
    /// True when cancellation left some refs unprocessed
    pub cancelled: bool,
}

impl IngestReport {
    pub fn uploaded_count(&self) -> usize {
        self.count(|outcome| matches!(outcome, IngestOutcome::Uploaded))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|outcome| matches!(outcome, IngestOutcome::Skipped))
    }

    pub fn download_failed_count(&self) -> usize {
        self.count(|outcome| matches!(outcome, IngestOutcome::DownloadFailed(_)))
    }

    pub fn upload_failed_count(&self) -> usize {
        self.count(|outcome| matches!(outcome, IngestOutcome::UploadFailed(_)))
    }

    /// Failed refs plus rejected records
    pub fn failure_count(&self) -> usize {
        self.count(IngestOutcome::is_failure) + self.rejected.len()
    }

    /// Outcome recorded for a track, if it was processed
    pub fn outcome_for(&self, track_id: &str) -> Option<&IngestOutcome> {
        self.entries
            .iter()
            .find(|entry| entry.cover.id == track_id)
            .map(|entry| &entry.outcome)
    }

    fn count(&self, predicate: impl Fn(&IngestOutcome) -> bool) -> usize {
        self.entries
            .iter()
            .filter(|entry| predicate(&entry.outcome))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, outcome: IngestOutcome) -> IngestEntry {
        IngestEntry {
            cover: CoverArtRef {
                id: id.to_string(),
                name: format!("Track {}", id),
                url: format!("https://img.example/{}", id),
            },
            key: StorageKey::for_cover("pl", id),
            outcome,
        }
    }

    fn report(entries: Vec<IngestEntry>, rejected: Vec<RejectedRecord>) -> IngestReport {
        IngestReport {
            run_id: Uuid::new_v4(),
            collection_id: "pl".to_string(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            entries,
            rejected,
            cancelled: false,
        }
    }

    #[test]
    fn test_counts_by_outcome() {
        let report = report(
            vec![
                entry("a", IngestOutcome::Uploaded),
                entry("b", IngestOutcome::Skipped),
                entry("c", IngestOutcome::DownloadFailed("HTTP 404".to_string())),
                entry("d", IngestOutcome::UploadFailed("HTTP 403".to_string())),
                entry("e", IngestOutcome::Uploaded),
            ],
            vec![RejectedRecord {
                index: 5,
                track_id: Some("f".to_string()),
                reason: "no cover art".to_string(),
            }],
        );

        assert_eq!(report.uploaded_count(), 2);
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.download_failed_count(), 1);
        assert_eq!(report.upload_failed_count(), 1);
        assert_eq!(report.failure_count(), 3);
        assert_eq!(report.outcome_for("b"), Some(&IngestOutcome::Skipped));
        assert_eq!(report.outcome_for("zzz"), None);
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(IngestOutcome::UploadFailed("denied".to_string())).unwrap();
        assert_eq!(json["status"], "upload_failed");
        assert_eq!(json["reason"], "denied");

        let json = serde_json::to_value(IngestOutcome::Skipped).unwrap();
        assert_eq!(json["status"], "skipped");
    }
}
