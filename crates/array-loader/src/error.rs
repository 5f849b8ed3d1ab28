//! Error types for array loaders.

use thiserror::Error;

/// Errors that can occur while opening an array source.
#[derive(Error, Debug)]
pub enum LoaderError {
    /// Local I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus { url: String, status: u16 },

    /// The href could not be interpreted.
    #[error("invalid href: {0}")]
    InvalidHref(String),

    /// The location kind is not supported by this loader.
    #[error("unsupported location for this loader: {0}")]
    UnsupportedLocation(String),

    /// Malformed TIFF/GeoTIFF header.
    #[error("invalid TIFF: {0}")]
    Tiff(String),

    /// Malformed GRIB2 message.
    #[error("invalid GRIB2 data: {0}")]
    Grib(String),

    /// Zarr store or metadata error.
    #[error("Zarr error: {0}")]
    Zarr(String),

    /// Image header error.
    #[error("image error: {0}")]
    Image(String),

    /// A keyword option had an unusable value.
    #[error("invalid value for option '{key}': {message}")]
    InvalidOption { key: String, message: String },

    /// Handles could not be stacked along a new dimension.
    #[error("cannot stack arrays: {0}")]
    StackMismatch(String),

    /// No loader registered under this driver name.
    #[error("no loader registered for driver '{0}'")]
    UnknownDriver(String),
}

impl LoaderError {
    /// Create an InvalidOption error.
    pub fn invalid_option(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOption {
            key: key.into(),
            message: message.into(),
        }
    }
}

impl From<tiff::TiffError> for LoaderError {
    fn from(err: tiff::TiffError) -> Self {
        Self::Tiff(err.to_string())
    }
}

impl From<image::ImageError> for LoaderError {
    fn from(err: image::ImageError) -> Self {
        Self::Image(err.to_string())
    }
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;
