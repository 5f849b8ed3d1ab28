//! Asset field access.

use serde_json::{Map, Value};
use stac::Asset;

/// Field access on [`stac::Asset`] used when dispatching assets to loaders.
pub trait AssetExt {
    /// Media (MIME) type, e.g. `image/tiff; application=geotiff`.
    fn media_type(&self) -> Option<&str>;

    /// An extension field such as `eo:bands` or `xarray:open_kwargs`.
    fn extra(&self, key: &str) -> Option<&Value>;

    /// The asset serialized as a JSON object.
    fn to_map(&self) -> Map<String, Value>;
}

impl AssetExt for Asset {
    fn media_type(&self) -> Option<&str> {
        self.r#type.as_deref()
    }

    fn extra(&self, key: &str) -> Option<&Value> {
        self.additional_fields.get(key)
    }

    fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_fields() {
        let asset: Asset = serde_json::from_str(
            r#"{
                "href": "./B04.tif",
                "type": "image/tiff; application=geotiff; profile=cloud-optimized",
                "title": "Red",
                "roles": ["data"],
                "eo:bands": [{"name": "B04", "common_name": "red"}],
                "xarray:open_kwargs": {"consolidated": true}
            }"#,
        )
        .unwrap();

        assert_eq!(
            asset.media_type(),
            Some("image/tiff; application=geotiff; profile=cloud-optimized")
        );
        assert!(asset.extra("eo:bands").is_some());
        assert_eq!(asset.extra("xarray:open_kwargs").unwrap()["consolidated"], true);
        assert!(asset.extra("driver").is_none());
    }

    #[test]
    fn test_to_map() {
        let mut asset = Asset::new("a.tif");
        asset.r#type = Some("image/tiff".to_string());
        let map = asset.to_map();
        assert_eq!(map.get("href").and_then(Value::as_str), Some("a.tif"));
        assert_eq!(map.get("type").and_then(Value::as_str), Some("image/tiff"));
        assert!(!map.contains_key("title"));
    }
}
