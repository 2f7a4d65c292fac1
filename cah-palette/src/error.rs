//! Error types for palette extraction

use thiserror::Error;

/// Palette extraction errors
///
/// These are caller-input errors and are never worth retrying.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PaletteError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to decode image: {0}")]
    Decode(String),
}
