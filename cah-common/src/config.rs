//! Configuration loading and config file resolution
//!
//! Bootstrap configuration is read once from a TOML file. The file is located
//! in priority order:
//! 1. Explicit path passed by the caller (highest priority)
//! 2. `CAH_CONFIG` environment variable
//! 3. `{config_dir}/cah/config.toml`
//! 4. Compiled defaults (fallback, logged as a warning)
//!
//! A missing file never aborts startup. A file that exists but cannot be read
//! or parsed is an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "CAH_CONFIG";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Paged metadata API settings
    #[serde(default)]
    pub metadata_api: MetadataApiConfig,

    /// Object store settings
    #[serde(default)]
    pub object_store: ObjectStoreConfig,

    /// Ingestion pipeline settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Dominant-color clustering settings
    #[serde(default)]
    pub palette: PaletteConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Paged metadata API configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataApiConfig {
    /// API root, e.g. `https://api.spotify.com/v1`
    #[serde(default = "default_metadata_base_url")]
    pub base_url: String,

    /// Items requested per page
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,

    /// Minimum spacing between two page requests
    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,

    /// Pages fetched before the collection is declared runaway
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MetadataApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_metadata_base_url(),
            page_limit: default_page_limit(),
            min_request_interval_ms: default_min_request_interval_ms(),
            max_pages: default_max_pages(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Object store configuration (S3-compatible, path-style addressing)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    /// Store endpoint, e.g. `http://localhost:9000`
    #[serde(default = "default_store_endpoint")]
    pub endpoint: String,

    /// Destination bucket
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Use `If-None-Match: *` puts instead of check-then-put
    #[serde(default)]
    pub conditional_put: bool,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: default_store_endpoint(),
            bucket: default_bucket(),
            conditional_put: false,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Ingestion pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of cover refs processed concurrently
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Collections harvested by the batch binary
    #[serde(default)]
    pub collections: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            collections: Vec::new(),
        }
    }
}

/// Dominant-color clustering configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaletteConfig {
    /// Number of clusters
    #[serde(default = "default_k")]
    pub k: usize,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Centroid movement below which an attempt has converged
    #[serde(default = "default_epsilon")]
    pub epsilon: f32,

    /// Independent seedings; the most compact result wins
    #[serde(default = "default_attempts")]
    pub attempts: usize,

    /// Fixed RNG seed (omit for entropy seeding)
    #[serde(default)]
    pub seed: Option<u64>,

    /// Extract and log the palette of every cover uploaded by a run
    #[serde(default)]
    pub analyze_uploaded: bool,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            max_iterations: default_max_iterations(),
            epsilon: default_epsilon(),
            attempts: default_attempts(),
            seed: None,
            analyze_uploaded: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metadata_base_url() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_page_limit() -> u32 {
    100
}

fn default_min_request_interval_ms() -> u64 {
    100
}

fn default_max_pages() -> usize {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_store_endpoint() -> String {
    "http://localhost:9000".to_string()
}

fn default_bucket() -> String {
    "playlist-images".to_string()
}

fn default_concurrency() -> usize {
    4
}

fn default_k() -> usize {
    3
}

fn default_max_iterations() -> usize {
    100
}

fn default_epsilon() -> f32 {
    0.2
}

fn default_attempts() -> usize {
    10
}

impl TomlConfig {
    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate configuration from a TOML file
    ///
    /// An unreadable file is [`Error::Io`]; bad content is [`Error::Config`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Resolve the config file and load it, falling back to defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (config, source) = Self::load_resolved(explicit)?;
        match source {
            Some(path) => info!("Loaded configuration from {}", path.display()),
            None => warn!("No configuration file found, using compiled defaults"),
        }
        Ok(config)
    }

    /// Like [`TomlConfig::load`] but silent, returning the file actually read
    ///
    /// For callers that can only install a log subscriber once the config
    /// (and its log level) is known.
    pub fn load_resolved(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        match resolve_config_path(explicit) {
            Some(path) => {
                let config = Self::from_file(&path)?;
                Ok((config, Some(path)))
            }
            None => Ok((Self::default(), None)),
        }
    }

    /// Reject values the pipeline and clusterer cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.concurrency == 0 {
            return Err(Error::Config("pipeline.concurrency must be at least 1".to_string()));
        }
        if self.metadata_api.max_pages == 0 {
            return Err(Error::Config("metadata_api.max_pages must be at least 1".to_string()));
        }
        if self.metadata_api.page_limit == 0 {
            return Err(Error::Config("metadata_api.page_limit must be at least 1".to_string()));
        }
        if self.palette.k == 0 {
            return Err(Error::Config("palette.k must be at least 1".to_string()));
        }
        if self.palette.attempts == 0 || self.palette.max_iterations == 0 {
            return Err(Error::Config(
                "palette.attempts and palette.max_iterations must be at least 1".to_string(),
            ));
        }
        if !(self.palette.epsilon >= 0.0) {
            return Err(Error::Config("palette.epsilon must be non-negative".to_string()));
        }
        if self.object_store.bucket.trim().is_empty() {
            return Err(Error::Config("object_store.bucket must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Locate the config file following the documented priority order
///
/// Explicit and environment paths are returned even when they do not exist,
/// so that a typo surfaces as a read error instead of silent defaults.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Caller-supplied path
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Per-user config directory
    default_config_path().filter(|path| path.exists())
}

/// Default per-user config file location for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cah").join("config.toml"))
}
