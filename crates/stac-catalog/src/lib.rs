//! Lazily-traversed catalog view over STAC metadata.
//!
//! Opening a STAC document yields an [`Entry`]: a Catalog, Collection,
//! ItemCollection, Item or Asset wrapper. Containers expose their children
//! by key and fetch each child document only on first access. Asset leaves
//! resolve a loader driver from their media type and open the underlying
//! file as a lazy [`ArrayHandle`](array_loader::ArrayHandle).
//!
//! ```no_run
//! use stac_catalog::{CatalogContext, Container, Node};
//! use stac_model::FsReader;
//!
//! let ctx = CatalogContext::new(FsReader);
//! let root = ctx.open("data/catalog.json")?;
//! for key in root.as_container().map(|c| c.list_keys()).unwrap_or_default() {
//!     println!("{key}");
//! }
//! # Ok::<(), stac_catalog::CatalogError>(())
//! ```

mod children;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod node;
mod search;
mod serialize;
pub mod stack;
pub mod table;

pub use config::CatalogConfig;
pub use context::CatalogContext;
pub use dispatch::{DriverRule, DriverTable, MatchSource, Matcher, ResolvedDriver};
pub use error::{CatalogError, Result};
pub use node::{
    AssetLeaf, CatalogNode, CollectionNode, Container, Entry, EntryKind, ItemCollectionNode,
    ItemNode, Node,
};
pub use stack::StackedBands;
pub use table::FeatureTable;

/// Open `href` with a context configured from the environment.
pub fn open(href: &str) -> Result<Entry> {
    CatalogContext::from_config(&CatalogConfig::from_env())?.open(href)
}
