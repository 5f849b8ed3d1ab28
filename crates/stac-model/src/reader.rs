//! Fetching STAC documents.
//!
//! A [`StacReader`] turns an href into raw JSON. Parsing into typed objects
//! goes through [`StacReader::read_object`], which dispatches on the
//! document's `type`.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::error::{Result, StacError};
use crate::href::{classify, HrefKind};
use crate::object::{from_json, StacObject};

/// Source of STAC JSON documents.
pub trait StacReader: Send + Sync {
    /// Fetch the document at `href` as raw JSON.
    fn read_json(&self, href: &str) -> Result<Value>;

    /// Fetch and parse the document at `href`.
    fn read_object(&self, href: &str) -> Result<StacObject> {
        from_json(self.read_json(href)?)
    }
}

// ============================================================================
// Filesystem
// ============================================================================

/// Reads documents from local paths and `file://` URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsReader;

impl StacReader for FsReader {
    fn read_json(&self, href: &str) -> Result<Value> {
        let path = match classify(href)? {
            HrefKind::Local(path) => path,
            HrefKind::Remote(url) => {
                return Err(StacError::invalid_href(format!(
                    "filesystem reader cannot fetch {url}"
                )))
            }
        };

        debug!(path = %path.display(), "Reading STAC document");
        let bytes = std::fs::read(&path).map_err(|source| StacError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

// ============================================================================
// HTTP
// ============================================================================

/// Reads documents over HTTP(S) with a blocking client.
#[derive(Debug, Clone)]
pub struct HttpReader {
    client: reqwest::blocking::Client,
}

impl HttpReader {
    /// Create a reader with the given request timeout and user agent.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn with_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl StacReader for HttpReader {
    fn read_json(&self, href: &str) -> Result<Value> {
        debug!(url = %href, "Fetching STAC document");
        let resp = self.client.get(href).send()?;

        let status = resp.status();
        if !status.is_success() {
            return Err(StacError::HttpStatus {
                url: href.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = resp.bytes()?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

// ============================================================================
// Scheme dispatch
// ============================================================================

/// Dispatches to [`FsReader`] or [`HttpReader`] based on the href scheme.
#[derive(Debug, Clone)]
pub struct DefaultReader {
    fs: FsReader,
    http: HttpReader,
}

impl DefaultReader {
    pub fn new(http: HttpReader) -> Self {
        Self { fs: FsReader, http }
    }
}

impl StacReader for DefaultReader {
    fn read_json(&self, href: &str) -> Result<Value> {
        match classify(href)? {
            HrefKind::Remote(_) => self.http.read_json(href),
            HrefKind::Local(_) => self.fs.read_json(href),
        }
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Serves documents registered in memory, keyed by exact href.
///
/// Useful for catalogs assembled programmatically and for tests.
#[derive(Debug, Default)]
pub struct MemoryReader {
    documents: RwLock<HashMap<String, Value>>,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document under `href`, replacing any previous one.
    pub fn insert(&self, href: impl Into<String>, document: Value) {
        if let Ok(mut docs) = self.documents.write() {
            docs.insert(href.into(), document);
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(self, href: impl Into<String>, document: Value) -> Self {
        self.insert(href, document);
        self
    }

    pub fn len(&self) -> usize {
        self.documents.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StacReader for MemoryReader {
    fn read_json(&self, href: &str) -> Result<Value> {
        let docs = self
            .documents
            .read()
            .map_err(|_| StacError::NotFound(href.to_string()))?;
        docs.get(href)
            .cloned()
            .ok_or_else(|| StacError::NotFound(href.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectExt;
    use serde_json::json;

    #[test]
    fn test_memory_reader() {
        let reader = MemoryReader::new().with(
            "mem://root/catalog.json",
            json!({"type": "Catalog", "id": "root", "description": "d", "links": []}),
        );

        let obj = reader.read_object("mem://root/catalog.json").unwrap();
        assert_eq!(obj.object_id(), Some("root"));
        assert!(matches!(
            reader.read_json("mem://missing.json"),
            Err(StacError::NotFound(_))
        ));
    }

    #[test]
    fn test_fs_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("item.json");
        std::fs::write(
            &path,
            r#"{"type":"Feature","id":"houston","properties":{},"assets":{}}"#,
        )
        .unwrap();

        let obj = FsReader.read_object(path.to_str().unwrap()).unwrap();
        assert_eq!(obj.object_id(), Some("houston"));
    }

    #[test]
    fn test_fs_reader_missing_file() {
        let err = FsReader.read_json("/definitely/not/here/catalog.json").unwrap_err();
        assert!(matches!(err, StacError::Io { .. }));
    }

    #[test]
    fn test_fs_reader_rejects_remote() {
        let err = FsReader.read_json("https://example.com/catalog.json").unwrap_err();
        assert!(matches!(err, StacError::InvalidHref(_)));
    }
}
