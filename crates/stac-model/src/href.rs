//! Href classification and resolution.
//!
//! STAC documents reference each other with absolute URLs, absolute paths, or
//! paths relative to the referencing document.

use std::path::{Component, Path, PathBuf};

use reqwest::Url;

use crate::error::{Result, StacError};

/// Where an href points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HrefKind {
    /// `http://` or `https://`
    Remote(Url),
    /// A local path, or a `file://` URL converted to one.
    Local(PathBuf),
}

/// Whether `href` is an absolute URL with a real scheme.
///
/// Single-letter schemes are treated as Windows drive letters, not URLs.
pub fn is_url(href: &str) -> bool {
    match Url::parse(href) {
        Ok(url) => url.scheme().len() > 1,
        Err(_) => false,
    }
}

/// Classify an href.
pub fn classify(href: &str) -> Result<HrefKind> {
    if !is_url(href) {
        return Ok(HrefKind::Local(PathBuf::from(href)));
    }

    let url = Url::parse(href).map_err(|e| StacError::invalid_href(format!("{href}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(HrefKind::Remote(url)),
        "file" => url
            .to_file_path()
            .map(HrefKind::Local)
            .map_err(|_| StacError::invalid_href(format!("not a local file URL: {href}"))),
        other => Err(StacError::invalid_href(format!(
            "unsupported scheme '{other}' in {href}"
        ))),
    }
}

/// Resolve `href` against the href of the document it appears in.
///
/// Absolute URLs and absolute paths are returned as-is. Relative hrefs are
/// joined with URL semantics when `base` is a URL, otherwise against the
/// parent directory of `base` with `.`/`..` normalised lexically.
pub fn resolve(base: Option<&str>, href: &str) -> Result<String> {
    if is_url(href) || Path::new(href).is_absolute() {
        return Ok(href.to_string());
    }

    let Some(base) = base else {
        return Ok(normalize(Path::new(href)).to_string_lossy().into_owned());
    };

    if is_url(base) {
        let base_url =
            Url::parse(base).map_err(|e| StacError::invalid_href(format!("{base}: {e}")))?;
        let joined = base_url
            .join(href)
            .map_err(|e| StacError::invalid_href(format!("{href} against {base}: {e}")))?;
        return Ok(joined.to_string());
    }

    let parent = Path::new(base).parent().unwrap_or_else(|| Path::new(""));
    Ok(normalize(&parent.join(href)).to_string_lossy().into_owned())
}

/// Lexically normalise a path: drop `.` components and fold `..` into its
/// parent where possible. Does not touch the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().collect()
}

/// Strip any query string or fragment from an href.
pub fn strip_query(href: &str) -> &str {
    let end = href.find(['?', '#']).unwrap_or(href.len());
    &href[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/catalog.json"));
        assert!(is_url("file:///tmp/catalog.json"));
        assert!(!is_url("catalog.json"));
        assert!(!is_url("/data/catalog.json"));
        assert!(!is_url("C:\\data\\catalog.json"));
    }

    #[test]
    fn test_resolve_relative_url() {
        let resolved = resolve(
            Some("https://example.com/stac/catalog.json"),
            "./disasters/collection.json",
        )
        .unwrap();
        assert_eq!(resolved, "https://example.com/stac/disasters/collection.json");

        let up = resolve(Some("https://example.com/stac/a/item.json"), "../b/item.json").unwrap();
        assert_eq!(up, "https://example.com/stac/b/item.json");
    }

    #[test]
    fn test_resolve_relative_path() {
        let resolved = resolve(Some("data/stac/catalog.json"), "./disasters/../x/collection.json")
            .unwrap();
        assert_eq!(resolved, "data/stac/x/collection.json");
    }

    #[test]
    fn test_resolve_absolute_is_unchanged() {
        assert_eq!(
            resolve(Some("data/catalog.json"), "https://cdn.example.com/a.tif").unwrap(),
            "https://cdn.example.com/a.tif"
        );
        assert_eq!(resolve(Some("data/catalog.json"), "/abs/a.tif").unwrap(), "/abs/a.tif");
    }

    #[test]
    fn test_resolve_without_base() {
        assert_eq!(resolve(None, "./a/b.json").unwrap(), "a/b.json");
    }

    #[test]
    fn test_classify() {
        assert!(matches!(classify("https://x.org/a.json").unwrap(), HrefKind::Remote(_)));
        assert_eq!(
            classify("file:///tmp/a.json").unwrap(),
            HrefKind::Local(PathBuf::from("/tmp/a.json"))
        );
        assert_eq!(classify("a.json").unwrap(), HrefKind::Local(PathBuf::from("a.json")));
        assert!(classify("s3://bucket/a.json").is_err());
    }

    #[test]
    fn test_strip_query() {
        assert_eq!(strip_query("https://x.org/a.tif?sig=abc"), "https://x.org/a.tif");
        assert_eq!(strip_query("a.json#frag"), "a.json");
        assert_eq!(strip_query("a.json"), "a.json");
    }
}
