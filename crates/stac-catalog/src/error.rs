//! Error types for the catalog adapter.

use array_loader::LoaderError;
use stac_model::StacError;
use thiserror::Error;

/// Errors that can occur while traversing a catalog or opening an asset.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The requested child is not one of the node's keys.
    #[error("key '{key}' not found; available keys: {available:?}")]
    KeyNotFound { key: String, available: Vec<String> },

    /// No loader could be resolved for an asset. The asset itself is still
    /// reachable through its leaf.
    #[error("unsupported asset type for '{key}' (type: {}, href: {href}): {reason}", media_type.as_deref().unwrap_or("none"))]
    UnsupportedAssetType {
        key: String,
        media_type: Option<String>,
        href: String,
        reason: String,
    },

    /// Parsing or fetching a STAC document failed.
    #[error(transparent)]
    Stac(#[from] StacError),

    /// The array loader failed.
    #[error(transparent)]
    Loader(#[from] LoaderError),

    /// The item does not declare a required STAC extension.
    #[error("STAC item '{item}' must implement the \"{extension}\" extension")]
    MissingExtension { item: String, extension: String },

    /// A requested band matched neither a band name nor a common name.
    #[error("{band} not found in eo:bands; valid values: {valid:?}")]
    BandNotFound { band: String, valid: Vec<String> },

    /// Selected bands do not share one media type.
    #[error("stacking failed: bands must share one media type, found {found:?}")]
    MixedMediaTypes { found: Vec<String> },

    /// Invalid configuration or driver table.
    #[error("configuration error: {0}")]
    Config(String),

    /// YAML (de)serialization failed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CatalogError {
    /// Create a KeyNotFound error.
    pub fn key_not_found(key: impl Into<String>, available: Vec<String>) -> Self {
        Self::KeyNotFound {
            key: key.into(),
            available,
        }
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
