//! # Cover Art Harvester Common Library
//!
//! Shared code for the cah crates:
//! - Error and result types
//! - TOML bootstrap configuration and its resolution

pub mod config;
pub mod error;

pub use config::{
    LoggingConfig, MetadataApiConfig, ObjectStoreConfig, PaletteConfig, PipelineConfig,
    TomlConfig,
};
pub use error::{Error, Result};
