//! Catalog entries.
//!
//! Every wrapped STAC object is an [`Entry`]. All entries implement
//! [`Node`]; everything except assets also implements [`Container`].

mod asset;
mod catalog;
mod collection;
mod item;
mod item_collection;

pub use asset::AssetLeaf;
pub use catalog::CatalogNode;
pub use collection::CollectionNode;
pub use item::ItemNode;
pub use item_collection::ItemCollectionNode;

pub(crate) use catalog::LinkedChildren;

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Result;

/// The kind of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Catalog,
    Collection,
    ItemCollection,
    Item,
    Asset,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Catalog => "catalog",
            Self::Collection => "collection",
            Self::ItemCollection => "item_collection",
            Self::Item => "item",
            Self::Asset => "asset",
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Descriptive accessors shared by every entry.
pub trait Node {
    /// Identifier of the wrapped object (asset key for assets).
    fn id(&self) -> &str;

    fn title(&self) -> Option<&str>;

    fn description(&self) -> Option<&str>;

    /// Metadata exposed to catalog consumers.
    fn metadata(&self) -> Map<String, Value>;

    fn kind(&self) -> EntryKind;
}

/// Entries with children.
pub trait Container: Node {
    /// Child keys in document order.
    fn list_keys(&self) -> Vec<String>;

    /// The child stored under `key`, built on first access and cached.
    fn get(&self, key: &str) -> Result<Arc<Entry>>;

    fn contains(&self, key: &str) -> bool {
        self.list_keys().iter().any(|k| k == key)
    }

    fn len(&self) -> usize {
        self.list_keys().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Any wrapped STAC object.
#[derive(Debug)]
pub enum Entry {
    Catalog(CatalogNode),
    Collection(CollectionNode),
    ItemCollection(ItemCollectionNode),
    Item(ItemNode),
    Asset(AssetLeaf),
}

impl Entry {
    fn node(&self) -> &dyn Node {
        match self {
            Self::Catalog(n) => n,
            Self::Collection(n) => n,
            Self::ItemCollection(n) => n,
            Self::Item(n) => n,
            Self::Asset(n) => n,
        }
    }

    /// Child access, for every kind except assets.
    pub fn as_container(&self) -> Option<&dyn Container> {
        match self {
            Self::Catalog(n) => Some(n),
            Self::Collection(n) => Some(n),
            Self::ItemCollection(n) => Some(n),
            Self::Item(n) => Some(n),
            Self::Asset(_) => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Asset(_))
    }

    pub fn as_catalog(&self) -> Option<&CatalogNode> {
        match self {
            Self::Catalog(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&CollectionNode> {
        match self {
            Self::Collection(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_item_collection(&self) -> Option<&ItemCollectionNode> {
        match self {
            Self::ItemCollection(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_item(&self) -> Option<&ItemNode> {
        match self {
            Self::Item(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_asset(&self) -> Option<&AssetLeaf> {
        match self {
            Self::Asset(n) => Some(n),
            _ => None,
        }
    }
}

impl Node for Entry {
    fn id(&self) -> &str {
        self.node().id()
    }

    fn title(&self) -> Option<&str> {
        self.node().title()
    }

    fn description(&self) -> Option<&str> {
        self.node().description()
    }

    fn metadata(&self) -> Map<String, Value> {
        self.node().metadata()
    }

    fn kind(&self) -> EntryKind {
        self.node().kind()
    }
}

/// Document metadata without its links.
pub(crate) fn metadata_without_links(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(mut map) => {
            map.remove("links");
            map
        }
        _ => Map::new(),
    }
}
