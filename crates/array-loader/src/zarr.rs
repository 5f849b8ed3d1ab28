//! Zarr loader.
//!
//! Opens local Zarr v2/v3 stores with `zarrs`. A store whose root is a group
//! yields one variable per child array; a store whose root is an array
//! yields a single variable named after the store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::debug;
use zarrs::array::{Array, DataType as ZarrDataType};
use zarrs_filesystem::FilesystemStore;

use crate::error::{LoaderError, Result};
use crate::handle::{ArrayHandle, DataType, Variable};
use crate::registry::{ArrayLoader, OpenOptions};
use crate::source::Location;

/// Attribute xarray uses for dimension names in Zarr.
const DIMENSIONS_ATTR: &str = "_ARRAY_DIMENSIONS";

/// Loader for the `zarr` driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZarrLoader;

impl ArrayLoader for ZarrLoader {
    fn driver(&self) -> &str {
        "zarr"
    }

    fn open(&self, href: &str, options: &OpenOptions) -> Result<ArrayHandle> {
        let root = match Location::parse(href)? {
            Location::Local(path) => path,
            Location::Remote(url) => {
                return Err(LoaderError::UnsupportedLocation(format!(
                    "remote Zarr stores are not supported: {url}"
                )))
            }
        };
        if !root.is_dir() {
            return Err(LoaderError::Zarr(format!(
                "{} is not a Zarr store directory",
                root.display()
            )));
        }

        let store = Arc::new(
            FilesystemStore::new(&root).map_err(|e| LoaderError::Zarr(e.to_string()))?,
        );
        let mut handle = ArrayHandle::new(href, self.driver());

        match node_kind(&root) {
            Some(NodeKind::Array) => {
                let name = root
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("data")
                    .to_string();
                handle.variables.push(read_variable(&store, "/", &name)?);
            }
            Some(NodeKind::Group) => {
                handle.attributes = group_attributes(&root);
                for name in child_arrays(&root)? {
                    let path = format!("/{name}");
                    handle.variables.push(read_variable(&store, &path, &name)?);
                }
            }
            None => {
                return Err(LoaderError::Zarr(format!(
                    "no Zarr metadata found in {}",
                    root.display()
                )))
            }
        }

        if options.flag("consolidated", false) && !root.join(".zmetadata").exists() {
            debug!(href = %href, "Consolidated metadata requested but absent, read per-array metadata");
        }

        debug!(href = %href, variables = handle.variables.len(), "Opened Zarr store");
        Ok(handle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Array,
    Group,
}

/// Detect a node from its v3 `zarr.json` or v2 `.zarray`/`.zgroup` file.
fn node_kind(dir: &Path) -> Option<NodeKind> {
    if let Some(meta) = read_json(&dir.join("zarr.json")) {
        return match meta.get("node_type").and_then(Value::as_str) {
            Some("array") => Some(NodeKind::Array),
            Some("group") => Some(NodeKind::Group),
            _ => None,
        };
    }
    if dir.join(".zarray").is_file() {
        Some(NodeKind::Array)
    } else if dir.join(".zgroup").is_file() {
        Some(NodeKind::Group)
    } else {
        None
    }
}

fn read_json(path: &Path) -> Option<Value> {
    let bytes = std::fs::read(path).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn group_attributes(dir: &Path) -> Map<String, Value> {
    let attrs = read_json(&dir.join("zarr.json"))
        .and_then(|m| m.get("attributes").cloned())
        .or_else(|| read_json(&dir.join(".zattrs")));
    match attrs {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// Names of the arrays directly under a group, sorted.
fn child_arrays(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path: PathBuf = entry.path();
        if !path.is_dir() || node_kind(&path) != Some(NodeKind::Array) {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

fn read_variable(store: &Arc<FilesystemStore>, path: &str, name: &str) -> Result<Variable> {
    let array = Array::open(store.clone(), path).map_err(|e| LoaderError::Zarr(e.to_string()))?;
    let shape = array.shape().to_vec();

    let origin = vec![0u64; shape.len()];
    let chunks = array
        .chunk_grid()
        .chunk_shape(&origin, array.shape())
        .map_err(|e| LoaderError::Zarr(e.to_string()))?
        .map(|c| c.iter().map(|n| n.get()).collect())
        .unwrap_or_else(|| shape.clone());

    let mut attributes = array.attributes().clone();
    let dims = match attributes.remove(DIMENSIONS_ATTR) {
        Some(Value::Array(names)) if names.len() == shape.len() => names
            .iter()
            .enumerate()
            .map(|(i, n)| n.as_str().map_or_else(|| format!("dim_{i}"), str::to_string))
            .collect(),
        _ => (0..shape.len()).map(|i| format!("dim_{i}")).collect(),
    };

    let native = array.data_type();
    if map_dtype(native) == DataType::Other {
        attributes.insert("zarr_data_type".into(), json!(format!("{native:?}")));
    }

    Ok(Variable {
        name: name.to_string(),
        dims,
        shape,
        chunks,
        dtype: map_dtype(native),
        attributes,
    })
}

fn map_dtype(dtype: &ZarrDataType) -> DataType {
    match dtype {
        ZarrDataType::Bool => DataType::Bool,
        ZarrDataType::Int8 => DataType::Int8,
        ZarrDataType::Int16 => DataType::Int16,
        ZarrDataType::Int32 => DataType::Int32,
        ZarrDataType::Int64 => DataType::Int64,
        ZarrDataType::UInt8 => DataType::UInt8,
        ZarrDataType::UInt16 => DataType::UInt16,
        ZarrDataType::UInt32 => DataType::UInt32,
        ZarrDataType::UInt64 => DataType::UInt64,
        ZarrDataType::Float32 => DataType::Float32,
        ZarrDataType::Float64 => DataType::Float64,
        ZarrDataType::Complex64 => DataType::Complex64,
        ZarrDataType::Complex128 => DataType::Complex128,
        _ => DataType::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_kind_v2() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".zgroup"), r#"{"zarr_format": 2}"#).unwrap();
        assert_eq!(node_kind(dir.path()), Some(NodeKind::Group));

        let arr = dir.path().join("tmax");
        std::fs::create_dir(&arr).unwrap();
        std::fs::write(arr.join(".zarray"), "{}").unwrap();
        assert_eq!(node_kind(&arr), Some(NodeKind::Array));
        assert_eq!(child_arrays(dir.path()).unwrap(), vec!["tmax"]);
    }

    #[test]
    fn test_group_attributes_v3() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("zarr.json"),
            r#"{"zarr_format": 3, "node_type": "group", "attributes": {"title": "daymet"}}"#,
        )
        .unwrap();
        assert_eq!(node_kind(dir.path()), Some(NodeKind::Group));
        assert_eq!(group_attributes(dir.path())["title"], "daymet");
    }

    #[test]
    fn test_rejects_remote_and_missing() {
        let err = ZarrLoader
            .open("https://example.com/a.zarr", &OpenOptions::default())
            .unwrap_err();
        assert!(matches!(err, LoaderError::UnsupportedLocation(_)));

        let dir = tempfile::tempdir().unwrap();
        let err = ZarrLoader
            .open(dir.path().to_str().unwrap(), &OpenOptions::default())
            .unwrap_err();
        assert!(matches!(err, LoaderError::Zarr(_)));
    }
}
