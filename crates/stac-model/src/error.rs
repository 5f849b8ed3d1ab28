//! Error types for STAC parsing and document access.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading or parsing STAC documents.
#[derive(Error, Debug)]
pub enum StacError {
    /// Failed to read a local document.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// HTTP transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus { url: String, status: u16 },

    /// The document is not valid JSON or does not match the STAC model.
    #[error("invalid STAC JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The href could not be interpreted as a path or URL.
    #[error("invalid href: {0}")]
    InvalidHref(String),

    /// No document registered under this href (in-memory reader).
    #[error("document not found: {0}")]
    NotFound(String),
}

impl StacError {
    /// Create an InvalidHref error.
    pub fn invalid_href(msg: impl Into<String>) -> Self {
        Self::InvalidHref(msg.into())
    }
}

/// Result type for STAC model operations.
pub type Result<T> = std::result::Result<T, StacError>;
