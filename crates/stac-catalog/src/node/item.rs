//! Item entries.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use stac_model::{self_href, Item, ItemExt};

use crate::children::Children;
use crate::context::CatalogContext;
use crate::error::{CatalogError, Result};
use crate::node::{AssetLeaf, Container, Entry, EntryKind, Node};
use crate::stack::{self, StackedBands};

/// A wrapped STAC Item. Its children are its assets.
#[derive(Debug)]
pub struct ItemNode {
    item: Item,
    properties: Map<String, Value>,
    href: Option<String>,
    base: Option<String>,
    ctx: CatalogContext,
    assets: Children<()>,
}

impl ItemNode {
    pub(crate) fn new(item: Item, href: Option<String>, ctx: CatalogContext) -> Self {
        let base = href.clone().or_else(|| self_href(&item.links));
        let assets = Children::new(item.assets.keys().map(|k| (k.clone(), ())));
        let properties = item.properties_map();
        Self {
            item,
            properties,
            href,
            base,
            ctx,
            assets,
        }
    }

    /// The wrapped item.
    pub fn item(&self) -> &Item {
        &self.item
    }

    pub fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }

    /// Nominal acquisition time.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        self.item.nominal_datetime()
    }

    /// Stack `eo` bands into one descriptor.
    ///
    /// Each entry of `bands` is a band name or a `common_name`. The result
    /// opens every band and concatenates them along `concat_dim`
    /// (`band` when `None`).
    pub fn stack_bands(&self, bands: &[&str], concat_dim: Option<&str>) -> Result<StackedBands> {
        stack::select_bands(self, bands, concat_dim.unwrap_or(stack::DEFAULT_CONCAT_DIM))
    }

    pub(crate) fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    /// An asset leaf built outside the cache, for callers that only need
    /// the resolved href and driver.
    pub(crate) fn leaf(&self, key: &str) -> Result<AssetLeaf> {
        let asset = self
            .item
            .assets
            .get(key)
            .cloned()
            .ok_or_else(|| CatalogError::key_not_found(key, self.assets.keys()))?;
        Ok(AssetLeaf::new(
            key.to_string(),
            asset,
            self.base(),
            self.ctx.clone(),
        ))
    }
}

impl Node for ItemNode {
    fn id(&self) -> &str {
        &self.item.id
    }

    fn title(&self) -> Option<&str> {
        self.properties.get("title").and_then(Value::as_str)
    }

    fn description(&self) -> Option<&str> {
        self.properties.get("description").and_then(Value::as_str)
    }

    /// Item properties plus `bbox`, `geometry` and `datetime`.
    fn metadata(&self) -> Map<String, Value> {
        let mut metadata = self.properties.clone();
        if let Some(bbox) = &self.item.bbox {
            if let Ok(bbox) = serde_json::to_value(bbox) {
                metadata.insert("bbox".to_string(), bbox);
            }
        }
        if let Some(geometry) = &self.item.geometry {
            if let Ok(geometry) = serde_json::to_value(geometry) {
                metadata.insert("geometry".to_string(), geometry);
            }
        }
        if let Some(datetime) = self.datetime() {
            metadata.insert("datetime".to_string(), Value::String(datetime.to_rfc3339()));
        }
        metadata
    }

    fn kind(&self) -> EntryKind {
        EntryKind::Item
    }
}

impl Container for ItemNode {
    fn list_keys(&self) -> Vec<String> {
        self.assets.keys()
    }

    fn get(&self, key: &str) -> Result<Arc<Entry>> {
        self.assets
            .get_or_build(key, |_| self.leaf(key).map(Entry::Asset))
    }

    fn contains(&self, key: &str) -> bool {
        self.assets.contains(key)
    }

    fn len(&self) -> usize {
        self.assets.len()
    }
}
