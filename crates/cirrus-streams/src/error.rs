//! Error types for cirrus-streams.

use thiserror::Error;

/// Result type alias for cirrus-streams operations.
pub type Result<T> = std::result::Result<T, StreamsError>;

/// Errors that can occur while querying an image index.
#[derive(Debug, Error)]
pub enum StreamsError {
    /// HTTP request to the mirror failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Mirror returned a document that is not valid JSON for its format
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The mirror index has no image-downloads catalogue
    #[error("no image-downloads catalogue listed in {0}")]
    MissingCatalogue(String),

    /// Filter string is not of the form `key=value`
    #[error("invalid filter '{0}': expected key=value")]
    InvalidFilter(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}
