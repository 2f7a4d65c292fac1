//! Projection of raw track records into cover art refs
//!
//! Expected record shape (playlist item wrapper optional):
//! `{"track": {"id", "name", "album": {"images": [{"url", "width", "height"}]}}}`
//!
//! When an album lists several images the first one is taken as the cover.
//! The API lists the largest image first; no resolution comparison is made.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{CoverArtRef, RawRecord};

/// Cover extraction errors (per record, never fatal to a run)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExtractError {
    #[error("Track {track_id} has no cover art")]
    MissingCoverArt { track_id: String },

    #[error("Malformed track record: {0}")]
    MalformedRecord(String),
}

impl ExtractError {
    /// Track ID of the offending record, when known
    pub fn track_id(&self) -> Option<&str> {
        match self {
            ExtractError::MissingCoverArt { track_id } => Some(track_id),
            ExtractError::MalformedRecord(_) => None,
        }
    }
}

/// Builds [`CoverArtRef`]s from raw API records
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackCoverExtractor;

impl TrackCoverExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, record: &RawRecord) -> Result<CoverArtRef, ExtractError> {
        let track = track_object(&record.0)?;

        let id = track
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ExtractError::MalformedRecord("missing track id".to_string()))?;

        let name = track.get("name").and_then(Value::as_str).unwrap_or_default();

        let url = track
            .get("album")
            .and_then(|album| album.get("images"))
            .and_then(Value::as_array)
            .and_then(|images| images.first())
            .and_then(|image| image.get("url"))
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ExtractError::MissingCoverArt {
                track_id: id.to_string(),
            })?;

        Ok(CoverArtRef {
            id: id.to_string(),
            name: name.to_string(),
            url: url.to_string(),
        })
    }
}

/// Unwrap the playlist item `track` field if present
fn track_object(value: &Value) -> Result<&Map<String, Value>, ExtractError> {
    let object = value
        .as_object()
        .ok_or_else(|| ExtractError::MalformedRecord("record is not a JSON object".to_string()))?;

    match object.get("track") {
        None => Ok(object),
        Some(Value::Object(track)) => Ok(track),
        // Removed or local tracks come back as `"track": null`
        Some(Value::Null) => Err(ExtractError::MalformedRecord("track is null".to_string())),
        Some(_) => Err(ExtractError::MalformedRecord("track is not an object".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extract(value: Value) -> Result<CoverArtRef, ExtractError> {
        TrackCoverExtractor::new().extract(&RawRecord(value))
    }

    #[test]
    fn test_first_image_selected() {
        let cover = extract(json!({
            "added_at": "2024-01-01T00:00:00Z",
            "track": {
                "id": "0CPWIY1etGeJLg12CAuP4n",
                "name": "Song",
                "album": {"images": [
                    {"url": "https://i.scdn.co/image/640", "height": 640, "width": 640},
                    {"url": "https://i.scdn.co/image/300", "height": 300, "width": 300}
                ]}
            }
        }))
        .unwrap();

        assert_eq!(cover.id, "0CPWIY1etGeJLg12CAuP4n");
        assert_eq!(cover.name, "Song");
        assert_eq!(cover.url, "https://i.scdn.co/image/640");
    }

    #[test]
    fn test_bare_track_record_accepted() {
        let cover = extract(json!({
            "id": "t1",
            "album": {"images": [{"url": "https://img/1"}]}
        }))
        .unwrap();

        assert_eq!(cover.id, "t1");
        assert_eq!(cover.name, "");
    }

    #[test]
    fn test_empty_images_is_missing_cover_art() {
        let result = extract(json!({"track": {"id": "t1", "album": {"images": []}}}));
        assert_eq!(
            result,
            Err(ExtractError::MissingCoverArt {
                track_id: "t1".to_string()
            })
        );
        assert_eq!(result.unwrap_err().track_id(), Some("t1"));
    }

    #[test]
    fn test_missing_album_is_missing_cover_art() {
        let result = extract(json!({"track": {"id": "t2", "name": "x"}}));
        assert!(matches!(result, Err(ExtractError::MissingCoverArt { .. })));
    }

    #[test]
    fn test_missing_or_empty_id_is_malformed() {
        for record in [
            json!({"track": {"album": {"images": [{"url": "u"}]}}}),
            json!({"track": {"id": "", "album": {"images": [{"url": "u"}]}}}),
            json!({"track": null}),
            json!("not an object"),
        ] {
            let result = extract(record);
            assert!(matches!(result, Err(ExtractError::MalformedRecord(_))));
        }
    }
}
