//! Parsing raw documents into `stac` objects.
//!
//! Type dispatch is done by [`stac::Value`]. Documents written before STAC
//! 1.0 may lack the `type` field and some fields the 1.0 models require;
//! those are filled in before deserialization.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::Result;

pub use stac::Value as StacObject;

use stac::Item;

/// Version recorded on documents that do not declare one.
pub const DEFAULT_STAC_VERSION: &str = "1.0.0";

/// Parse a raw JSON document into the matching STAC object.
pub fn from_json(mut value: Value) -> Result<StacObject> {
    if let Value::Object(map) = &mut value {
        fill_legacy_fields(map);
    }
    Ok(serde_json::from_value(value)?)
}

/// Classify a document without a `type` field by its structure.
fn infer_type(map: &Map<String, Value>) -> &'static str {
    if map.contains_key("features") {
        "FeatureCollection"
    } else if map.contains_key("assets") && map.contains_key("properties") {
        "Feature"
    } else if map.contains_key("extent") {
        "Collection"
    } else {
        "Catalog"
    }
}

fn fill_legacy_fields(map: &mut Map<String, Value>) {
    let kind = match map.get("type").and_then(Value::as_str) {
        Some(kind) => kind.to_string(),
        None => {
            let kind = infer_type(map);
            map.insert("type".to_string(), Value::from(kind));
            kind.to_string()
        }
    };

    map.entry("links").or_insert_with(|| Value::Array(Vec::new()));
    match kind.as_str() {
        "FeatureCollection" => {
            if let Some(Value::Array(features)) = map.get_mut("features") {
                for feature in features.iter_mut() {
                    if let Value::Object(feature) = feature {
                        fill_legacy_fields(feature);
                    }
                }
            }
        }
        "Feature" => {
            map.entry("stac_version")
                .or_insert_with(|| Value::from(DEFAULT_STAC_VERSION));
            map.entry("geometry").or_insert(Value::Null);
            map.entry("assets")
                .or_insert_with(|| Value::Object(Map::new()));
            let properties = map
                .entry("properties")
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(properties) = properties {
                properties.entry("datetime").or_insert(Value::Null);
            }
        }
        _ => {
            map.entry("stac_version")
                .or_insert_with(|| Value::from(DEFAULT_STAC_VERSION));
            map.entry("description")
                .or_insert_with(|| Value::String(String::new()));
        }
    }
}

/// Accessors shared by every parsed object.
pub trait ObjectExt {
    /// The object id; ItemCollections have none.
    fn object_id(&self) -> Option<&str>;

    /// `Catalog`, `Collection`, `Item` or `ItemCollection`.
    fn kind_name(&self) -> &'static str;
}

impl ObjectExt for StacObject {
    fn object_id(&self) -> Option<&str> {
        match self {
            StacObject::Catalog(c) => Some(&c.id),
            StacObject::Collection(c) => Some(&c.id),
            StacObject::Item(i) => Some(&i.id),
            StacObject::ItemCollection(_) => None,
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            StacObject::Catalog(_) => "Catalog",
            StacObject::Collection(_) => "Collection",
            StacObject::Item(_) => "Item",
            StacObject::ItemCollection(_) => "ItemCollection",
        }
    }
}

/// Untyped views of Item properties.
pub trait ItemExt {
    /// The properties object as JSON, common metadata included.
    fn properties_map(&self) -> Map<String, Value>;

    /// Nominal time: `datetime`, else `start_datetime`.
    fn nominal_datetime(&self) -> Option<DateTime<Utc>>;

    /// Whether a `stac_extensions` entry names `name` (e.g. `eo`).
    fn declares_extension(&self, name: &str) -> bool;
}

impl ItemExt for Item {
    fn properties_map(&self) -> Map<String, Value> {
        match serde_json::to_value(&self.properties) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    fn nominal_datetime(&self) -> Option<DateTime<Utc>> {
        let properties = self.properties_map();
        ["datetime", "start_datetime"]
            .iter()
            .filter_map(|key| properties.get(*key).and_then(Value::as_str))
            .find_map(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn declares_extension(&self, name: &str) -> bool {
        let marker = format!("/{name}/");
        self.extensions
            .iter()
            .any(|ext| ext == name || ext.contains(&marker))
    }
}
