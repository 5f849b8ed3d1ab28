//! ItemCollection entries (GeoJSON FeatureCollections, e.g. search results).

use std::sync::Arc;

use serde_json::{Map, Value};
use stac_model::href::resolve;
use stac_model::{self_href, ItemCollection};

use crate::children::{key_from_href, Children};
use crate::context::CatalogContext;
use crate::error::Result;
use crate::node::{Container, Entry, EntryKind, ItemNode, Node};
use crate::table::FeatureTable;

const DEFAULT_ID: &str = "item-collection";

/// A wrapped ItemCollection. Its children are its items, keyed by item id.
#[derive(Debug)]
pub struct ItemCollectionNode {
    id: String,
    items: ItemCollection,
    href: Option<String>,
    base: Option<String>,
    ctx: CatalogContext,
    children: Children<usize>,
}

impl ItemCollectionNode {
    pub(crate) fn new(items: ItemCollection, href: Option<String>, ctx: CatalogContext) -> Self {
        let base = href.clone().or_else(|| self_href(&items.links));
        let id = items
            .additional_fields
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| base.as_deref().map(key_from_href))
            .unwrap_or_else(|| DEFAULT_ID.to_string());
        let children = Children::new(
            items
                .items
                .iter()
                .enumerate()
                .map(|(i, item)| (item.id.clone(), i)),
        );
        Self {
            id,
            items,
            href,
            base,
            ctx,
            children,
        }
    }

    pub fn item_collection(&self) -> &ItemCollection {
        &self.items
    }

    pub fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }

    /// The items as a table with a geometry column and one column per
    /// property. `crs` defaults to `EPSG:4326`.
    pub fn to_feature_table(&self, crs: Option<&str>) -> FeatureTable {
        FeatureTable::from_item_collection(&self.items, crs)
    }
}

impl Node for ItemCollectionNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> Option<&str> {
        self.items
            .additional_fields
            .get("title")
            .and_then(Value::as_str)
    }

    fn description(&self) -> Option<&str> {
        self.items
            .additional_fields
            .get("description")
            .and_then(Value::as_str)
    }

    /// Top-level fields other than features and links (e.g. `numberMatched`).
    fn metadata(&self) -> Map<String, Value> {
        self.items
            .additional_fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn kind(&self) -> EntryKind {
        EntryKind::ItemCollection
    }
}

impl Container for ItemCollectionNode {
    fn list_keys(&self) -> Vec<String> {
        self.children.keys()
    }

    fn get(&self, key: &str) -> Result<Arc<Entry>> {
        self.children.get_or_build(key, |index| {
            let item = self.items.items[*index].clone();
            // Inline items resolve relative asset hrefs against their own
            // self link, else against the collection's location.
            let href = match self_href(&item.links) {
                Some(own) => Some(resolve(self.base.as_deref(), &own)?),
                None => self.base.clone(),
            };
            Ok(Entry::Item(ItemNode::new(item, href, self.ctx.clone())))
        })
    }

    fn contains(&self, key: &str) -> bool {
        self.children.contains(key)
    }

    fn len(&self) -> usize {
        self.children.len()
    }
}
