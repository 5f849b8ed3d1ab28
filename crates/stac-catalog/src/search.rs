//! Substring search over a container's descendants.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::Result;
use crate::node::{Container, Entry, Node};

/// Depth-first walk of every descendant of `root`, collecting entries whose
/// key, id, title or description contains `term` (case-sensitive).
///
/// A key seen twice keeps its first match. Any fetch failure aborts the
/// walk with no partial result.
pub(crate) fn search(root: &dyn Container, term: &str) -> Result<IndexMap<String, Arc<Entry>>> {
    let mut found = IndexMap::new();
    walk(root, term, &mut found)?;
    debug!(term, matches = found.len(), "Search finished");
    Ok(found)
}

fn walk(
    container: &dyn Container,
    term: &str,
    found: &mut IndexMap<String, Arc<Entry>>,
) -> Result<()> {
    for key in container.list_keys() {
        let child = container.get(&key)?;
        if matches(&key, &child, term) && !found.contains_key(&key) {
            found.insert(key.clone(), child.clone());
        }
        if let Some(sub) = child.as_container() {
            walk(sub, term, found)?;
        }
    }
    Ok(())
}

fn matches(key: &str, entry: &Entry, term: &str) -> bool {
    key.contains(term)
        || entry.id().contains(term)
        || entry.title().is_some_and(|t| t.contains(term))
        || entry.description().is_some_and(|d| d.contains(term))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stac_model::MemoryReader;

    use crate::context::CatalogContext;

    fn tree() -> Entry {
        let reader = MemoryReader::new()
            .with(
                "mem://c/collection.json",
                json!({
                    "type": "Collection", "id": "root", "description": "top",
                    "links": [
                        {"rel": "item", "href": "./a/a.json"},
                        {"rel": "item", "href": "./b/b.json"}
                    ]
                }),
            )
            .with(
                "mem://c/a/a.json",
                json!({
                    "type": "Feature", "id": "a", "properties": {"title": "Flood extent"},
                    "assets": {"flood-map": {"href": "./map.tif", "title": "Map"}}
                }),
            )
            .with(
                "mem://c/b/b.json",
                json!({
                    "type": "Feature", "id": "b", "properties": {},
                    "assets": {"flood-map": {"href": "./other.tif"}}
                }),
            );
        CatalogContext::new(reader)
            .open("mem://c/collection.json")
            .unwrap()
    }

    #[test]
    fn test_matches_title_and_nested_keys() {
        let root = tree();
        let found = root.as_collection().unwrap().search("lood").unwrap();
        let keys: Vec<_> = found.keys().cloned().collect();
        assert_eq!(keys, vec!["a", "flood-map"]);

        let map = &found["flood-map"];
        assert_eq!(map.title(), Some("Map"));
    }

    #[test]
    fn test_case_sensitive_and_empty() {
        let root = tree();
        let node = root.as_collection().unwrap();
        assert!(node.search("FLOOD").unwrap().is_empty());
        assert!(node.search("zzz").unwrap().is_empty());
    }
}
