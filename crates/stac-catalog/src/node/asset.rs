//! Asset leaves.

use array_loader::{ArrayHandle, OpenOptions};
use serde_json::{Map, Value};
use stac_model::href::resolve;
use stac_model::{Asset, AssetExt};
use tracing::{info, warn};

use crate::context::CatalogContext;
use crate::dispatch::ResolvedDriver;
use crate::error::{CatalogError, Result};
use crate::node::{EntryKind, Node};

/// A wrapped STAC Asset. Terminal: has no children.
#[derive(Debug)]
pub struct AssetLeaf {
    key: String,
    asset: Asset,
    href: String,
    ctx: CatalogContext,
}

impl AssetLeaf {
    /// Wrap `asset`, resolving its href against `base` (the owning
    /// document's location).
    pub(crate) fn new(key: String, asset: Asset, base: Option<&str>, ctx: CatalogContext) -> Self {
        let href = resolve(base, &asset.href).unwrap_or_else(|e| {
            warn!(key = %key, href = %asset.href, error = %e, "Could not resolve asset href");
            asset.href.clone()
        });
        Self {
            key,
            asset,
            href,
            ctx,
        }
    }

    /// Key of the asset in its owner's asset map.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The wrapped asset, with its href as written in the document.
    pub fn asset(&self) -> &Asset {
        &self.asset
    }

    /// The asset href resolved against its owning document.
    pub fn href(&self) -> &str {
        &self.href
    }

    pub fn media_type(&self) -> Option<&str> {
        self.asset.media_type()
    }

    pub fn roles(&self) -> &[String] {
        &self.asset.roles
    }

    /// Pick a loader driver and merge open-time keywords.
    pub fn resolve_driver(&self) -> Result<ResolvedDriver> {
        self.ctx.drivers().resolve(&self.key, &self.asset, &self.href)
    }

    /// Open the asset as a lazy array handle.
    pub fn to_array_handle(&self) -> Result<ArrayHandle> {
        self.to_array_handle_with(Map::new(), Map::new())
    }

    /// Like [`to_array_handle`](Self::to_array_handle), with caller keywords
    /// and storage options layered over the resolved ones.
    pub fn to_array_handle_with(
        &self,
        kwargs: Map<String, Value>,
        storage_options: Map<String, Value>,
    ) -> Result<ArrayHandle> {
        let mut resolved = self.resolve_driver()?;
        resolved.kwargs.extend(kwargs);
        resolved.storage_options.extend(storage_options);

        if !self.ctx.loaders().contains(&resolved.driver) {
            return Err(CatalogError::UnsupportedAssetType {
                key: self.key.clone(),
                media_type: self.asset.media_type().map(str::to_string),
                href: self.href.clone(),
                reason: format!("no loader registered for driver '{}'", resolved.driver),
            });
        }

        info!(key = %self.key, href = %self.href, driver = %resolved.driver, "Opening asset");
        let options = OpenOptions::new(resolved.kwargs)
            .with_storage_options(resolved.storage_options)
            .with_source(self.ctx.source_config().clone());
        Ok(self
            .ctx
            .loaders()
            .open(&resolved.driver, &self.href, &options)?)
    }
}

impl Node for AssetLeaf {
    fn id(&self) -> &str {
        &self.key
    }

    fn title(&self) -> Option<&str> {
        self.asset.title.as_deref()
    }

    fn description(&self) -> Option<&str> {
        self.asset.description.as_deref()
    }

    fn metadata(&self) -> Map<String, Value> {
        self.asset.to_map()
    }

    fn kind(&self) -> EntryKind {
        EntryKind::Asset
    }
}
