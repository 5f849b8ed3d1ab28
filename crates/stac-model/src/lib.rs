//! Document access around the `stac` object model.
//!
//! Catalogs, Collections, Items, Assets and ItemCollections are the `stac`
//! crate's types, re-exported here. This crate adds what the catalog layer
//! needs on top of them:
//!
//! - Parsing raw JSON, including pre-1.0 documents, into a [`StacObject`]
//! - Untyped field access on assets and items ([`AssetExt`], [`ItemExt`])
//! - Fetching documents from the filesystem, HTTP, or memory ([`reader`])
//! - Resolving relative hrefs against the document they appear in ([`href`])

pub mod asset;
pub mod error;
pub mod href;
pub mod link;
pub mod object;
pub mod reader;

pub use stac::{Asset, Catalog, Collection, Item, ItemCollection, Link};

pub use asset::AssetExt;
pub use error::{Result, StacError};
pub use link::{hierarchy_links, link_href, self_href};
pub use object::{from_json, ItemExt, ObjectExt, StacObject};
pub use reader::{DefaultReader, FsReader, HttpReader, MemoryReader, StacReader};
