//! Shared context and entry points for opening catalogs.

use std::sync::Arc;

use array_loader::{ArrayLoader, ImageLoader, LoaderRegistry, SourceConfig};
use serde_json::Value;
use stac_model::{from_json, DefaultReader, HttpReader, StacObject, StacReader};
use tracing::info;

use crate::config::CatalogConfig;
use crate::dispatch::{DriverRule, DriverTable};
use crate::error::{CatalogError, Result};
use crate::node::{CatalogNode, CollectionNode, Entry, ItemCollectionNode, ItemNode};

#[derive(Clone)]
struct ContextInner {
    reader: Arc<dyn StacReader>,
    drivers: DriverTable,
    loaders: LoaderRegistry,
    source: SourceConfig,
}

/// Reader, driver table, loaders and byte-source settings shared by every
/// entry opened from it. Cloning is cheap.
#[derive(Clone)]
pub struct CatalogContext {
    inner: Arc<ContextInner>,
}

impl std::fmt::Debug for CatalogContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogContext")
            .field("drivers", &self.inner.drivers.rules().len())
            .field("loaders", &self.inner.loaders)
            .finish()
    }
}

impl CatalogContext {
    /// A context with the built-in driver table and default loaders.
    pub fn new(reader: impl StacReader + 'static) -> Self {
        Self::from_reader(Arc::new(reader))
    }

    /// Like [`new`](Self::new), for an already shared reader.
    pub fn from_reader(reader: Arc<dyn StacReader>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                reader,
                drivers: DriverTable::builtin(),
                loaders: LoaderRegistry::with_defaults(),
                source: SourceConfig::default(),
            }),
        }
    }

    /// Build reader, driver table and loaders from `config`.
    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        config.validate().map_err(CatalogError::Config)?;

        let http = HttpReader::new(config.http_timeout(), &config.user_agent)?;
        let mut ctx =
            Self::new(DefaultReader::new(http)).with_source_config(config.source_config());

        if let Some(path) = &config.driver_table_path {
            let rules = DriverTable::rules_from_yaml_file(path)?;
            info!(path = %path.display(), rules = rules.len(), "Loaded driver rules");
            ctx = ctx.with_driver_rules(rules);
        }
        if config.register_image_loader {
            ctx = ctx.with_loader(ImageLoader);
        }
        Ok(ctx)
    }

    fn inner_mut(&mut self) -> &mut ContextInner {
        Arc::make_mut(&mut self.inner)
    }

    /// Replace the driver table.
    pub fn with_driver_table(mut self, drivers: DriverTable) -> Self {
        self.inner_mut().drivers = drivers;
        self
    }

    /// Consult `rules` before the current table.
    pub fn with_driver_rules(mut self, rules: Vec<DriverRule>) -> Self {
        self.inner_mut().drivers.prepend(rules);
        self
    }

    /// Register an extra loader, replacing any with the same driver name.
    pub fn with_loader<L: ArrayLoader + 'static>(mut self, loader: L) -> Self {
        self.inner_mut().loaders.register(loader);
        self
    }

    /// Replace the loader registry.
    pub fn with_loaders(mut self, loaders: LoaderRegistry) -> Self {
        self.inner_mut().loaders = loaders;
        self
    }

    pub fn with_source_config(mut self, source: SourceConfig) -> Self {
        self.inner_mut().source = source;
        self
    }

    pub fn reader(&self) -> &dyn StacReader {
        self.inner.reader.as_ref()
    }

    pub fn drivers(&self) -> &DriverTable {
        &self.inner.drivers
    }

    pub fn loaders(&self) -> &LoaderRegistry {
        &self.inner.loaders
    }

    pub fn source_config(&self) -> &SourceConfig {
        &self.inner.source
    }

    /// Fetch the document at `href` and wrap it.
    pub fn open(&self, href: &str) -> Result<Entry> {
        info!(href = %href, "Opening STAC document");
        let object = self.reader().read_object(href)?;
        Ok(self.wrap(object, Some(href)))
    }

    /// Wrap an already parsed JSON document. `href` is its location, used
    /// to resolve relative links.
    pub fn open_value(&self, value: Value, href: Option<&str>) -> Result<Entry> {
        let object = from_json(value)?;
        Ok(self.wrap(object, href))
    }

    /// Wrap a typed STAC object.
    pub fn wrap(&self, object: StacObject, href: Option<&str>) -> Entry {
        let href = href.map(str::to_string);
        match object {
            StacObject::Catalog(c) => Entry::Catalog(CatalogNode::new(c, href, self.clone())),
            StacObject::Collection(c) => {
                Entry::Collection(CollectionNode::new(c, href, self.clone()))
            }
            StacObject::Item(i) => Entry::Item(ItemNode::new(i, href, self.clone())),
            StacObject::ItemCollection(ic) => {
                Entry::ItemCollection(ItemCollectionNode::new(ic, href, self.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stac_model::{MemoryReader, StacError};

    use crate::node::{EntryKind, Node};

    #[test]
    fn test_wrap_dispatches_on_type() {
        let ctx = CatalogContext::new(MemoryReader::new());
        let cases = [
            (
                json!({"type": "Catalog", "id": "c", "description": "d", "links": []}),
                EntryKind::Catalog,
            ),
            (
                json!({
                    "type": "Collection", "id": "c", "description": "d", "license": "MIT",
                    "extent": {"spatial": {"bbox": [[-180, -90, 180, 90]]},
                               "temporal": {"interval": [[null, null]]}},
                    "links": []
                }),
                EntryKind::Collection,
            ),
            (
                json!({"type": "Feature", "id": "i", "properties": {}, "assets": {}, "links": []}),
                EntryKind::Item,
            ),
            (
                json!({"type": "FeatureCollection", "features": []}),
                EntryKind::ItemCollection,
            ),
        ];
        for (value, kind) in cases {
            assert_eq!(ctx.open_value(value, None).unwrap().kind(), kind);
        }
    }

    #[test]
    fn test_open_missing_document() {
        let ctx = CatalogContext::new(MemoryReader::new());
        let err = ctx.open("mem://nowhere/catalog.json").unwrap_err();
        assert!(matches!(err, CatalogError::Stac(StacError::NotFound(_))));
    }

    #[test]
    fn test_builders_do_not_affect_clones() {
        let base = CatalogContext::new(MemoryReader::new());
        let extended = base.clone().with_loader(ImageLoader);
        assert!(!base.loaders().contains("image"));
        assert!(extended.loaders().contains("image"));
    }

    #[test]
    fn test_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let table = dir.path().join("drivers.yaml");
        std::fs::write(&table, "rules:\n  - extension: .cog\n    driver: geotiff\n").unwrap();

        let config = CatalogConfig {
            driver_table_path: Some(table),
            register_image_loader: true,
            range_block_size: 8192,
            ..Default::default()
        };
        let ctx = CatalogContext::from_config(&config).unwrap();
        assert!(ctx.loaders().contains("image"));
        assert_eq!(ctx.source_config().block_size, 8192);
        assert_eq!(ctx.drivers().lookup_extension("scene.cog").unwrap().driver, "geotiff");

        let bad = CatalogConfig {
            http_timeout_secs: 0,
            ..Default::default()
        };
        assert!(matches!(
            CatalogContext::from_config(&bad),
            Err(CatalogError::Config(_))
        ));
    }
}
