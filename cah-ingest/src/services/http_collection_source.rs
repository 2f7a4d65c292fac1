//! Playlist API client
//!
//! Reads playlist tracks from a Spotify-style Web API:
//! `GET {base_url}/playlists/{id}/tracks?limit=N` returns
//! `{"items": [...], "next": "<absolute url>" | null}`. The `next` URL is used
//! verbatim as the continuation token.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use cah_common::MetadataApiConfig;

use super::collection_fetcher::{CollectionSource, FetchError};
use crate::models::{PageCursor, PageToken, RawRecord};

const USER_AGENT: &str = concat!("cah-ingest/", env!("CARGO_PKG_VERSION"));

/// Rate limiter enforcing a minimum interval between requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait if necessary to comply with rate limit
    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// HTTP implementation of [`CollectionSource`]
///
/// Authentication is the caller's concern: pass a client with default
/// headers through [`HttpCollectionSource::with_client`].
pub struct HttpCollectionSource {
    http_client: reqwest::Client,
    base_url: String,
    page_limit: u32,
    rate_limiter: Arc<RateLimiter>,
}

impl HttpCollectionSource {
    pub fn new(config: &MetadataApiConfig) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self::with_client(http_client, config))
    }

    pub fn with_client(http_client: reqwest::Client, config: &MetadataApiConfig) -> Self {
        Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            page_limit: config.page_limit,
            rate_limiter: Arc::new(RateLimiter::new(config.min_request_interval_ms)),
        }
    }

    /// `{base_url}/playlists/{id}/tracks?limit=N` with the id percent-encoded
    fn first_page_url(&self, collection_id: &str) -> Result<reqwest::Url, FetchError> {
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| {
            FetchError::Transport(format!("invalid base URL {}: {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                FetchError::Transport(format!("base URL {} cannot take a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(["playlists", collection_id, "tracks"]);
        url.query_pairs_mut()
            .append_pair("limit", &self.page_limit.to_string());
        Ok(url)
    }
}

#[async_trait]
impl CollectionSource for HttpCollectionSource {
    async fn fetch_page(
        &self,
        collection_id: &str,
        cursor: Option<&PageToken>,
    ) -> Result<PageCursor, FetchError> {
        let url = match cursor {
            Some(token) => token.as_str().to_string(),
            None => self.first_page_url(collection_id)?.to_string(),
        };

        self.rate_limiter.wait().await;

        tracing::debug!(collection_id = %collection_id, url = %url, "Requesting collection page");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(FetchError::Transport(format!(
                "HTTP {} from {}: {}",
                status.as_u16(),
                url,
                error_text
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| FetchError::MalformedPage(e.to_string()))?;

        parse_page(body)
    }
}

/// Interpret one page body
///
/// Both `items` (array) and `next` (string or null) must be present. An empty
/// `next` string is treated like null.
pub fn parse_page(body: Value) -> Result<PageCursor, FetchError> {
    let Value::Object(mut object) = body else {
        return Err(FetchError::MalformedPage("page is not a JSON object".to_string()));
    };

    let items = match object.remove("items") {
        Some(Value::Array(items)) => items.into_iter().map(RawRecord).collect(),
        Some(_) => return Err(FetchError::MalformedPage("items is not an array".to_string())),
        None => return Err(FetchError::MalformedPage("missing items".to_string())),
    };

    let next = match object.remove("next") {
        Some(Value::Null) => None,
        Some(Value::String(next)) if next.is_empty() => None,
        Some(Value::String(next)) => Some(PageToken::new(next)),
        Some(_) => {
            return Err(FetchError::MalformedPage(
                "next is neither a string nor null".to_string(),
            ))
        }
        None => return Err(FetchError::MalformedPage("missing next cursor".to_string())),
    };

    Ok(PageCursor { items, next })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_page_with_next() {
        let page = parse_page(json!({
            "items": [{"track": {"id": "a"}}, {"track": {"id": "b"}}],
            "next": "https://api.example/v1/playlists/pl/tracks?offset=2"
        }))
        .unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(
            page.next.as_ref().map(PageToken::as_str),
            Some("https://api.example/v1/playlists/pl/tracks?offset=2")
        );
    }

    #[test]
    fn test_parse_page_terminal() {
        let page = parse_page(json!({"items": [], "next": null})).unwrap();
        assert!(page.items.is_empty());
        assert!(page.next.is_none());

        let page = parse_page(json!({"items": [], "next": ""})).unwrap();
        assert!(page.next.is_none());
    }

    #[test]
    fn test_parse_page_rejects_missing_shape() {
        for body in [
            json!([]),
            json!({"next": null}),
            json!({"items": {}, "next": null}),
            json!({"items": []}),
            json!({"items": [], "next": 5}),
        ] {
            assert!(
                matches!(parse_page(body.clone()), Err(FetchError::MalformedPage(_))),
                "expected malformed page for {}",
                body
            );
        }
    }

    #[test]
    fn test_first_page_url_trims_trailing_slash() {
        let config = MetadataApiConfig {
            base_url: "http://localhost:1234/v1/".to_string(),
            page_limit: 50,
            ..MetadataApiConfig::default()
        };
        let source = HttpCollectionSource::new(&config).unwrap();

        assert_eq!(
            source.first_page_url("pl").unwrap().as_str(),
            "http://localhost:1234/v1/playlists/pl/tracks?limit=50"
        );
    }

    #[test]
    fn test_first_page_url_encodes_collection_id() {
        let config = MetadataApiConfig {
            base_url: "http://localhost:1234/v1".to_string(),
            page_limit: 10,
            ..MetadataApiConfig::default()
        };
        let source = HttpCollectionSource::new(&config).unwrap();

        // Reserved characters stay inside the id segment
        assert_eq!(
            source.first_page_url("a b?c#d/e").unwrap().as_str(),
            "http://localhost:1234/v1/playlists/a%20b%3Fc%23d%2Fe/tracks?limit=10"
        );
    }

    #[test]
    fn test_unparseable_base_url_is_transport_error() {
        let config = MetadataApiConfig {
            base_url: "not a url".to_string(),
            ..MetadataApiConfig::default()
        };
        let source = HttpCollectionSource::new(&config).unwrap();

        assert!(matches!(
            source.first_page_url("pl"),
            Err(FetchError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_rate_limiter_spaces_requests() {
        let limiter = RateLimiter::new(200);

        let start = Instant::now();
        limiter.wait().await;
        let first_elapsed = start.elapsed();
        limiter.wait().await;
        let second_elapsed = start.elapsed();

        assert!(first_elapsed < Duration::from_millis(100));
        assert!(second_elapsed >= Duration::from_millis(180));
    }

    #[tokio::test]
    async fn test_zero_interval_never_waits() {
        let limiter = RateLimiter::new(0);

        let start = Instant::now();
        for _ in 0..5 {
            limiter.wait().await;
        }

        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
