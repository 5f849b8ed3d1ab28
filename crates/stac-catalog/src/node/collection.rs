//! Collection entries.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use stac_model::{hierarchy_links, self_href, Collection};

use crate::children::Children;
use crate::context::CatalogContext;
use crate::error::{CatalogError, Result};
use crate::node::{
    metadata_without_links, AssetLeaf, Container, Entry, EntryKind, LinkedChildren, Node,
};
use crate::search;

/// A wrapped STAC Collection.
///
/// Behaves like a catalog and adds substring search over all descendants
/// plus access to collection-level assets.
#[derive(Debug)]
pub struct CollectionNode {
    collection: Collection,
    href: Option<String>,
    base: Option<String>,
    children: LinkedChildren,
    assets: Children<()>,
}

impl CollectionNode {
    pub(crate) fn new(collection: Collection, href: Option<String>, ctx: CatalogContext) -> Self {
        let base = href.clone().or_else(|| self_href(&collection.links));
        let children =
            LinkedChildren::new(ctx, base.as_deref(), hierarchy_links(&collection.links));
        let assets = Children::new(collection.assets.keys().map(|k| (k.clone(), ())));
        Self {
            collection,
            href,
            base,
            children,
            assets,
        }
    }

    /// The wrapped collection.
    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }

    /// Every descendant whose key, id, title or description contains
    /// `term`, keyed by entry key in depth-first order.
    pub fn search(&self, term: &str) -> Result<IndexMap<String, Arc<Entry>>> {
        search::search(self, term)
    }

    /// Keys of the collection-level assets.
    pub fn asset_keys(&self) -> Vec<String> {
        self.assets.keys()
    }

    /// A collection-level asset (e.g. a Zarr store covering every item).
    pub fn get_asset(&self, key: &str) -> Result<Arc<Entry>> {
        self.assets.get_or_build(key, |_| {
            let asset = self
                .collection
                .assets
                .get(key)
                .cloned()
                .ok_or_else(|| CatalogError::key_not_found(key, self.asset_keys()))?;
            Ok(Entry::Asset(AssetLeaf::new(
                key.to_string(),
                asset,
                self.base.as_deref(),
                self.children.ctx().clone(),
            )))
        })
    }

    pub(crate) fn children(&self) -> &LinkedChildren {
        &self.children
    }
}

impl Node for CollectionNode {
    fn id(&self) -> &str {
        &self.collection.id
    }

    fn title(&self) -> Option<&str> {
        self.collection.title.as_deref()
    }

    fn description(&self) -> Option<&str> {
        Some(self.collection.description.as_str()).filter(|d| !d.is_empty())
    }

    fn metadata(&self) -> Map<String, Value> {
        serde_json::to_value(&self.collection)
            .map(metadata_without_links)
            .unwrap_or_default()
    }

    fn kind(&self) -> EntryKind {
        EntryKind::Collection
    }
}

impl Container for CollectionNode {
    fn list_keys(&self) -> Vec<String> {
        self.children.keys()
    }

    fn get(&self, key: &str) -> Result<Arc<Entry>> {
        self.children.get(key)
    }

    fn contains(&self, key: &str) -> bool {
        self.children.contains(key)
    }

    fn len(&self) -> usize {
        self.children.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stac_model::{MemoryReader, StacObject};

    fn collection_entry() -> Entry {
        let ctx = CatalogContext::new(MemoryReader::new());
        let collection: Collection = serde_json::from_value(json!({
            "type": "Collection", "stac_version": "1.0.0", "id": "daymet",
            "description": "Daily weather",
            "license": "proprietary",
            "extent": {"spatial": {"bbox": [[-180, -90, 180, 90]]}, "temporal": {"interval": [[null, null]]}},
            "links": [],
            "assets": {
                "zarr-abfs": {
                    "href": "abfs://daymet/daily.zarr",
                    "type": "application/vnd+zarr",
                    "xarray:open_kwargs": {"consolidated": true}
                }
            }
        }))
        .unwrap();
        ctx.wrap(StacObject::Collection(collection), Some("https://example.com/daymet"))
    }

    #[test]
    fn test_get_asset() {
        let entry = collection_entry();
        let node = entry.as_collection().unwrap();
        assert_eq!(node.asset_keys(), vec!["zarr-abfs"]);
        assert!(node.list_keys().is_empty());

        let asset = node.get_asset("zarr-abfs").unwrap();
        let leaf = asset.as_asset().unwrap();
        assert_eq!(leaf.href(), "abfs://daymet/daily.zarr");
        let resolved = leaf.resolve_driver().unwrap();
        assert_eq!(resolved.driver, "zarr");
        assert_eq!(resolved.kwargs["consolidated"], true);

        let again = node.get_asset("zarr-abfs").unwrap();
        assert!(Arc::ptr_eq(&asset, &again));
    }

    #[test]
    fn test_get_asset_missing() {
        let entry = collection_entry();
        let err = entry.as_collection().unwrap().get_asset("nope").unwrap_err();
        assert!(matches!(
            err,
            CatalogError::KeyNotFound { ref available, .. } if available == &vec!["zarr-abfs".to_string()]
        ));
    }

    #[test]
    fn test_metadata() {
        let entry = collection_entry();
        let metadata = entry.metadata();
        assert_eq!(metadata["license"], "proprietary");
        assert!(metadata.contains_key("extent"));
        assert!(!metadata.contains_key("links"));
        assert_eq!(entry.kind(), EntryKind::Collection);
    }
}
