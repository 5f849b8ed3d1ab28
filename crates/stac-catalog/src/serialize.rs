//! YAML rendering of entries as catalog documents.
//!
//! A container renders as `metadata` plus one `sources` entry per child.
//! Linked children are described by href without being fetched; item
//! assets carry their resolved driver and merged open keywords.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use stac_model::{self_href, ItemExt};

use crate::error::Result;
use crate::node::{
    AssetLeaf, Container, Entry, ItemCollectionNode, ItemNode, LinkedChildren, Node,
};

const CATALOG_DRIVER: &str = "stac_catalog";
const ITEM_DRIVER: &str = "stac_item";

#[derive(Debug, Serialize)]
struct YamlCatalog {
    metadata: Map<String, Value>,
    sources: IndexMap<String, YamlSource>,
}

#[derive(Debug, Serialize)]
struct YamlSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    driver: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    args: Map<String, Value>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    metadata: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    direct_access: Option<&'static str>,
}

fn href_args(href: &str) -> Map<String, Value> {
    let mut args = Map::new();
    args.insert("href".to_string(), Value::String(href.to_string()));
    args
}

fn linked_sources(children: &LinkedChildren) -> IndexMap<String, YamlSource> {
    children
        .links()
        .map(|(key, link)| {
            let driver = if link.is_item() { ITEM_DRIVER } else { CATALOG_DRIVER };
            let source = YamlSource {
                driver: Some(driver.to_string()),
                description: link.title.clone(),
                args: href_args(&link.href),
                metadata: Map::new(),
                direct_access: None,
            };
            (key.to_string(), source)
        })
        .collect()
}

fn item_collection_sources(node: &ItemCollectionNode) -> IndexMap<String, YamlSource> {
    let mut sources = IndexMap::new();
    for (key, item) in node.list_keys().into_iter().zip(&node.item_collection().items) {
        let args = match self_href(&item.links) {
            Some(href) => href_args(&href),
            None => {
                let mut args = Map::new();
                args.insert("id".to_string(), Value::String(item.id.clone()));
                args
            }
        };
        let source = YamlSource {
            driver: Some(ITEM_DRIVER.to_string()),
            description: item
                .properties_map()
                .get("title")
                .and_then(Value::as_str)
                .map(str::to_string),
            args,
            metadata: Map::new(),
            direct_access: None,
        };
        sources.insert(key, source);
    }
    sources
}

fn asset_source(leaf: &AssetLeaf) -> YamlSource {
    let mut args = Map::new();
    args.insert("urlpath".to_string(), Value::String(leaf.href().to_string()));

    let driver = match leaf.resolve_driver() {
        Ok(resolved) => {
            args.extend(resolved.kwargs);
            if !resolved.storage_options.is_empty() {
                args.insert(
                    "storage_options".to_string(),
                    Value::Object(resolved.storage_options),
                );
            }
            Some(resolved.driver)
        }
        Err(_) => None,
    };

    YamlSource {
        driver,
        description: leaf.title().map(str::to_string),
        args,
        metadata: leaf.metadata(),
        direct_access: Some("allow"),
    }
}

fn item_sources(node: &ItemNode) -> Result<IndexMap<String, YamlSource>> {
    node.item()
        .assets
        .keys()
        .map(|key| Ok((key.clone(), asset_source(&node.leaf(key)?))))
        .collect()
}

impl Entry {
    /// Render this entry as a YAML catalog document.
    ///
    /// Linked children are not fetched.
    pub fn to_yaml(&self) -> Result<String> {
        let sources = match self {
            Entry::Catalog(node) => linked_sources(node.children()),
            Entry::Collection(node) => linked_sources(node.children()),
            Entry::ItemCollection(node) => item_collection_sources(node),
            Entry::Item(node) => item_sources(node)?,
            Entry::Asset(leaf) => {
                let mut sources = IndexMap::new();
                sources.insert(leaf.key().to_string(), asset_source(leaf));
                sources
            }
        };
        let metadata = match self {
            Entry::Asset(_) => Map::new(),
            other => other.metadata(),
        };
        Ok(serde_yaml::to_string(&YamlCatalog { metadata, sources })?)
    }
}
