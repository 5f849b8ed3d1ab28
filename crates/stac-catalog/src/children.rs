//! Lazily-populated child slots.
//!
//! Every container keeps one slot per child key, fixed at construction.
//! A slot holds whatever the parent needs to build the child later (a link
//! href, an index) and a `OnceLock` that caches the built entry for the
//! container's lifetime.

use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use stac_model::href::strip_query;
use tracing::{debug, warn};

use crate::error::{CatalogError, Result};
use crate::node::Entry;

#[derive(Debug)]
struct Slot<T> {
    source: T,
    cell: OnceLock<Arc<Entry>>,
}

/// Ordered child slots keyed by child identifier.
#[derive(Debug)]
pub(crate) struct Children<T> {
    slots: IndexMap<String, Slot<T>>,
}

impl<T> Children<T> {
    /// Build slots in iteration order.
    ///
    /// A repeated key is suffixed with `-2`, `-3`, ... so every source keeps
    /// a slot.
    pub(crate) fn new(entries: impl IntoIterator<Item = (String, T)>) -> Self {
        let mut slots = IndexMap::new();
        for (key, source) in entries {
            let key = if slots.contains_key(&key) {
                let renamed = (2..)
                    .map(|n| format!("{key}-{n}"))
                    .find(|k| !slots.contains_key(k))
                    .unwrap_or_default();
                warn!(key, renamed, "Duplicate child key");
                renamed
            } else {
                key
            };
            slots.insert(
                key,
                Slot {
                    source,
                    cell: OnceLock::new(),
                },
            );
        }
        Self { slots }
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.slots.keys().cloned().collect()
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn sources(&self) -> impl Iterator<Item = (&str, &T)> {
        self.slots.iter().map(|(k, slot)| (k.as_str(), &slot.source))
    }

    /// The cached child for `key`, building it with `build` on first access.
    ///
    /// Concurrent first accesses may each build a child; all of them get the
    /// one that was stored first.
    pub(crate) fn get_or_build(
        &self,
        key: &str,
        build: impl FnOnce(&T) -> Result<Entry>,
    ) -> Result<Arc<Entry>> {
        let slot = self
            .slots
            .get(key)
            .ok_or_else(|| CatalogError::key_not_found(key, self.keys()))?;

        if let Some(entry) = slot.cell.get() {
            debug!(key, "Child cache hit");
            return Ok(entry.clone());
        }

        let built = Arc::new(build(&slot.source)?);
        match slot.cell.set(built.clone()) {
            Ok(()) => Ok(built),
            Err(_) => Ok(slot.cell.get().cloned().unwrap_or(built)),
        }
    }
}

/// Child key for a linked document.
///
/// `<id>/catalog.json` and `<id>/collection.json` yield `<id>`; anything
/// else yields the file stem. Query strings and fragments are ignored.
pub(crate) fn key_from_href(href: &str) -> String {
    let path = strip_query(href).trim_end_matches(['/', '\\']);
    let mut segments = path.rsplit(['/', '\\']);
    let file = segments.next().unwrap_or(path);

    if matches!(file, "catalog.json" | "collection.json") {
        if let Some(parent) = segments.next() {
            if !matches!(parent, "" | "." | "..") {
                return parent.to_string();
            }
        }
    }

    match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => file.to_string(),
    }
}

/// Directory segments above the key, and the key itself.
fn key_parts(href: &str) -> (Vec<String>, String) {
    let key = key_from_href(href);
    let path = strip_query(href).trim_end_matches(['/', '\\']);
    let mut dirs: Vec<String> = path
        .split(['/', '\\'])
        .filter(|s| !matches!(*s, "" | "." | ".."))
        .map(str::to_string)
        .collect();
    let file = dirs.pop().unwrap_or_default();
    if matches!(file.as_str(), "catalog.json" | "collection.json")
        && dirs.last().is_some_and(|d| *d == key)
    {
        dirs.pop();
    }
    (dirs, key)
}

/// Child keys for a list of linked hrefs.
///
/// Each href is keyed by [`key_from_href`]. Hrefs whose keys collide are
/// qualified with parent directories (`a/item`, `b/item`) until they are
/// distinct or run out of directories.
pub(crate) fn link_keys(hrefs: &[&str]) -> Vec<String> {
    let parts: Vec<_> = hrefs.iter().map(|h| key_parts(h)).collect();
    let mut depth = vec![0usize; parts.len()];
    loop {
        let keys: Vec<String> = parts
            .iter()
            .zip(&depth)
            .map(|((dirs, key), &d)| {
                if d == 0 {
                    key.clone()
                } else {
                    format!("{}/{key}", dirs[dirs.len() - d..].join("/"))
                }
            })
            .collect();

        let mut counts: IndexMap<&str, usize> = IndexMap::new();
        for key in &keys {
            *counts.entry(key.as_str()).or_default() += 1;
        }
        let mut deepened = false;
        for (i, key) in keys.iter().enumerate() {
            if counts[key.as_str()] > 1 && depth[i] < parts[i].0.len() {
                depth[i] += 1;
                deepened = true;
            }
        }
        if !deepened {
            return keys;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stac_model::{Catalog, StacObject};

    use crate::context::CatalogContext;
    use stac_model::MemoryReader;

    #[test]
    fn test_key_from_href() {
        assert_eq!(key_from_href("./disasters/collection.json"), "disasters");
        assert_eq!(key_from_href("sub/catalog.json"), "sub");
        assert_eq!(key_from_href("./houston/houston.json"), "houston");
        assert_eq!(
            key_from_href("https://example.com/items/LC08_001.json?token=x#frag"),
            "LC08_001"
        );
        assert_eq!(key_from_href("./catalog.json"), "catalog");
        assert_eq!(key_from_href("catalog.json"), "catalog");
        assert_eq!(key_from_href("noext"), "noext");
    }

    #[test]
    fn test_duplicate_keys_are_suffixed() {
        let children = Children::new(vec![
            ("a".to_string(), 1),
            ("b".to_string(), 2),
            ("a".to_string(), 3),
            ("a".to_string(), 4),
        ]);
        assert_eq!(children.keys(), vec!["a", "b", "a-2", "a-3"]);
        let sources: Vec<_> = children.sources().map(|(_, s)| *s).collect();
        assert_eq!(sources, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_link_keys_qualify_shared_stems() {
        assert_eq!(
            link_keys(&["./a/item.json", "./b/item.json", "./c/other.json"]),
            vec!["a/item", "b/item", "other"]
        );
        assert_eq!(
            link_keys(&["./x/a/catalog.json", "./y/a/catalog.json"]),
            vec!["x/a", "y/a"]
        );
        // Only the colliding tail is qualified.
        assert_eq!(
            link_keys(&["s1/2020/scene.json", "s2/2020/scene.json"]),
            vec!["s1/2020/scene", "s2/2020/scene"]
        );
        assert_eq!(
            link_keys(&["./disasters/collection.json", "./houston/houston.json"]),
            vec!["disasters", "houston"]
        );
    }

    #[test]
    fn test_link_keys_without_directories_stay_ambiguous() {
        assert_eq!(link_keys(&["item.json", "./item.json"]), vec!["item", "item"]);
    }

    #[test]
    fn test_get_or_build_caches() {
        let ctx = CatalogContext::new(MemoryReader::new());
        let children = Children::new(vec![("root".to_string(), ())]);
        let mut builds = 0;

        let first = children
            .get_or_build("root", |_| {
                builds += 1;
                Ok(ctx.wrap(StacObject::Catalog(Catalog::new("root", "d")), None))
            })
            .unwrap();
        let second = children
            .get_or_build("root", |_| panic!("rebuilt a cached child"))
            .unwrap();

        assert_eq!(builds, 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_missing_key_lists_available() {
        let children: Children<()> = Children::new(vec![("a".to_string(), ())]);
        let err = children
            .get_or_build("z", |_| panic!("should not build"))
            .unwrap_err();
        match err {
            CatalogError::KeyNotFound { key, available } => {
                assert_eq!(key, "z");
                assert_eq!(available, vec!["a"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
