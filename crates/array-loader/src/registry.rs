//! Loader trait and registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{LoaderError, Result};
use crate::geotiff::GeoTiffLoader;
use crate::grib2::Grib2Loader;
use crate::handle::ArrayHandle;
use crate::source::SourceConfig;
use crate::zarr::ZarrLoader;

/// Everything a loader needs besides the href.
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    /// Open-time keyword arguments, e.g. `chunks`.
    pub kwargs: Map<String, Value>,
    /// Transport options, e.g. HTTP `headers`.
    pub storage_options: Map<String, Value>,
    pub source: SourceConfig,
}

impl OpenOptions {
    pub fn new(kwargs: Map<String, Value>) -> Self {
        Self {
            kwargs,
            ..Default::default()
        }
    }

    pub fn with_storage_options(mut self, storage_options: Map<String, Value>) -> Self {
        self.storage_options = storage_options;
        self
    }

    pub fn with_source(mut self, source: SourceConfig) -> Self {
        self.source = source;
        self
    }

    /// Boolean keyword, defaulting to `default` when absent or not a bool.
    pub fn flag(&self, key: &str, default: bool) -> bool {
        self.kwargs.get(key).and_then(Value::as_bool).unwrap_or(default)
    }
}

/// Produces lazy handles for one kind of data source.
pub trait ArrayLoader: Send + Sync {
    /// Driver name this loader is registered under.
    fn driver(&self) -> &str;

    /// Read metadata for `href` and describe it as an [`ArrayHandle`].
    ///
    /// Must not read bulk array data.
    fn open(&self, href: &str, options: &OpenOptions) -> Result<ArrayHandle>;
}

/// Loaders keyed by driver name.
#[derive(Clone, Default)]
pub struct LoaderRegistry {
    loaders: BTreeMap<String, Arc<dyn ArrayLoader>>,
}

impl std::fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderRegistry")
            .field("drivers", &self.drivers())
            .finish()
    }
}

impl LoaderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the GeoTIFF, GRIB2 and Zarr loaders.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(GeoTiffLoader);
        registry.register(Grib2Loader);
        registry.register(ZarrLoader);
        registry
    }

    /// Add a loader, replacing any previous loader for the same driver.
    pub fn register<L: ArrayLoader + 'static>(&mut self, loader: L) -> &mut Self {
        let driver = loader.driver().to_string();
        debug!(driver = %driver, "Registering array loader");
        self.loaders.insert(driver, Arc::new(loader));
        self
    }

    pub fn get(&self, driver: &str) -> Option<Arc<dyn ArrayLoader>> {
        self.loaders.get(driver).cloned()
    }

    pub fn contains(&self, driver: &str) -> bool {
        self.loaders.contains_key(driver)
    }

    /// Registered driver names, sorted.
    pub fn drivers(&self) -> Vec<&str> {
        self.loaders.keys().map(String::as_str).collect()
    }

    /// Open `href` with the loader for `driver`.
    ///
    /// A `chunks` keyword is applied to the returned handle, and the keywords
    /// are recorded on it.
    pub fn open(&self, driver: &str, href: &str, options: &OpenOptions) -> Result<ArrayHandle> {
        let loader = self
            .get(driver)
            .ok_or_else(|| LoaderError::UnknownDriver(driver.to_string()))?;

        info!(driver = %driver, href = %href, "Opening array source");
        let mut handle = loader.open(href, options)?;
        if let Some(chunks) = options.kwargs.get("chunks") {
            handle.apply_chunks(chunks)?;
        }
        handle.options = options.kwargs.clone();
        Ok(handle)
    }
}
