//! Catalog entries and link-based child discovery.

use std::sync::Arc;

use serde_json::{Map, Value};
use stac_model::href::resolve;
use stac_model::{hierarchy_links, link_href, self_href, Catalog, Link, ObjectExt};
use tracing::{debug, warn};

use crate::children::{link_keys, Children};
use crate::context::CatalogContext;
use crate::error::Result;
use crate::node::{metadata_without_links, Container, Entry, EntryKind, Node};

/// A `child` or `item` link, with its href resolved against the parent.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ChildLink {
    pub href: String,
    pub rel: String,
    pub title: Option<String>,
}

impl ChildLink {
    pub(crate) fn is_item(&self) -> bool {
        self.rel == stac_model::link::rel::ITEM
    }
}

/// Children discovered from `child` and `item` links.
///
/// Only keys are computed up front; documents are fetched on first `get`.
#[derive(Debug)]
pub(crate) struct LinkedChildren {
    ctx: CatalogContext,
    slots: Children<ChildLink>,
}

impl LinkedChildren {
    /// A document linked more than once is kept at its first link. Links
    /// whose hrefs share a stem get directory-qualified keys.
    pub(crate) fn new(ctx: CatalogContext, base: Option<&str>, links: Vec<&Link>) -> Self {
        let mut raw_hrefs: Vec<String> = Vec::new();
        let mut children: Vec<ChildLink> = Vec::new();
        for link in links {
            let raw = link_href(link);
            let href = resolve(base, &raw).unwrap_or_else(|e| {
                warn!(href = %raw, error = %e, "Could not resolve child href");
                raw.clone()
            });
            if children.iter().any(|c| c.href == href) {
                debug!(href, "Skipping repeated child link");
                continue;
            }
            raw_hrefs.push(raw);
            children.push(ChildLink {
                href,
                rel: link.rel.clone(),
                title: link.title.clone(),
            });
        }
        let raw: Vec<&str> = raw_hrefs.iter().map(String::as_str).collect();
        let keys = link_keys(&raw);
        Self {
            ctx,
            slots: Children::new(keys.into_iter().zip(children)),
        }
    }

    pub(crate) fn ctx(&self) -> &CatalogContext {
        &self.ctx
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.slots.keys()
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.slots.contains(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn links(&self) -> impl Iterator<Item = (&str, &ChildLink)> {
        self.slots.sources()
    }

    pub(crate) fn get(&self, key: &str) -> Result<Arc<Entry>> {
        self.slots.get_or_build(key, |link| {
            debug!(key, href = %link.href, rel = %link.rel, "Fetching child document");
            let object = self.ctx.reader().read_object(&link.href)?;
            if let Some(id) = object.object_id() {
                if id != key {
                    warn!(key, id, href = %link.href, "Child id differs from its link key");
                }
            }
            Ok(self.ctx.wrap(object, Some(&link.href)))
        })
    }
}

/// A wrapped STAC Catalog.
#[derive(Debug)]
pub struct CatalogNode {
    catalog: Catalog,
    href: Option<String>,
    children: LinkedChildren,
}

impl CatalogNode {
    pub(crate) fn new(catalog: Catalog, href: Option<String>, ctx: CatalogContext) -> Self {
        let base = href.clone().or_else(|| self_href(&catalog.links));
        let children = LinkedChildren::new(ctx, base.as_deref(), hierarchy_links(&catalog.links));
        Self {
            catalog,
            href,
            children,
        }
    }

    /// The wrapped catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Where the catalog was read from, if known.
    pub fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }

    pub(crate) fn children(&self) -> &LinkedChildren {
        &self.children
    }
}

impl Node for CatalogNode {
    fn id(&self) -> &str {
        &self.catalog.id
    }

    fn title(&self) -> Option<&str> {
        self.catalog.title.as_deref()
    }

    fn description(&self) -> Option<&str> {
        Some(self.catalog.description.as_str()).filter(|d| !d.is_empty())
    }

    fn metadata(&self) -> Map<String, Value> {
        serde_json::to_value(&self.catalog)
            .map(metadata_without_links)
            .unwrap_or_default()
    }

    fn kind(&self) -> EntryKind {
        EntryKind::Catalog
    }
}

impl Container for CatalogNode {
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
    use test_utils::item_json;

    fn catalog(value: Value) -> Catalog {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_keys_follow_link_order() {
        let ctx = CatalogContext::new(MemoryReader::new());
        let cat = catalog(json!({
            "type": "Catalog", "stac_version": "1.0.0", "id": "root", "description": "d",
            "links": [
                {"rel": "self", "href": "mem://root/catalog.json"},
                {"rel": "child", "href": "./zeta/catalog.json"},
                {"rel": "parent", "href": "../catalog.json"},
                {"rel": "item", "href": "./alpha/alpha.json"},
                {"rel": "child", "href": "./mid/collection.json"}
            ]
        }));
        let entry = ctx.wrap(StacObject::Catalog(cat), None);
        let node = entry.as_catalog().unwrap();

        assert_eq!(node.list_keys(), vec!["zeta", "alpha", "mid"]);
        assert!(node.contains("alpha"));
        assert!(!node.contains("root"));

        let hrefs: Vec<_> = node.children().links().map(|(_, l)| l.href.clone()).collect();
        assert_eq!(
            hrefs,
            vec![
                "mem://root/zeta/catalog.json",
                "mem://root/alpha/alpha.json",
                "mem://root/mid/collection.json"
            ]
        );
    }

    #[test]
    fn test_shared_stems_keep_every_child() {
        let reader = MemoryReader::new()
            .with("mem://root/a/item.json", item_json("scene-a", "A", json!({})))
            .with("mem://root/b/item.json", item_json("scene-b", "B", json!({})));
        let ctx = CatalogContext::new(reader);
        let cat = catalog(json!({
            "type": "Catalog", "stac_version": "1.0.0", "id": "root", "description": "d",
            "links": [
                {"rel": "self", "href": "mem://root/catalog.json"},
                {"rel": "item", "href": "./a/item.json"},
                {"rel": "item", "href": "./b/item.json"},
                {"rel": "item", "href": "./a/item.json"}
            ]
        }));
        let entry = ctx.wrap(StacObject::Catalog(cat), None);
        let node = entry.as_catalog().unwrap();

        assert_eq!(node.list_keys(), vec!["a/item", "b/item"]);
        assert_eq!(node.get("a/item").unwrap().id(), "scene-a");
        assert_eq!(node.get("b/item").unwrap().id(), "scene-b");
    }

    #[test]
    fn test_metadata_drops_links() {
        let ctx = CatalogContext::new(MemoryReader::new());
        let cat = catalog(json!({
            "type": "Catalog", "stac_version": "1.0.0", "id": "root", "title": "Root",
            "description": "d",
            "links": [], "license": "MIT"
        }));
        let entry = ctx.wrap(StacObject::Catalog(cat), None);

        let metadata = entry.metadata();
        assert!(!metadata.contains_key("links"));
        assert_eq!(metadata["license"], "MIT");
        assert_eq!(entry.title(), Some("Root"));
        assert_eq!(entry.kind(), EntryKind::Catalog);
    }
}
