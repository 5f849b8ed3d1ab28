//! STAC fixtures.
//!
//! JSON builders for Catalogs, Collections and Items, the "disasters" tree
//! used across the test suite, and helpers that lay it out on disk or hand
//! it back as `(href, document)` pairs for in-memory readers.
//!
//! The disasters tree:
//!
//! ```text
//! catalog.json                      Catalog "hurricane-harvey"
//! └── disasters/collection.json     Collection "disasters"
//!     └── houston/houston.json      Item "houston"
//!         ├── thumbnail             image/png
//!         └── mosaic                image/tiff; application=geotiff
//! ```

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use crate::generators::{write_test_geotiff, write_test_png};

pub const ROOT_ID: &str = "hurricane-harvey";
pub const COLLECTION_ID: &str = "disasters";
pub const ITEM_ID: &str = "houston";
pub const GEOTIFF_MEDIA_TYPE: &str = "image/tiff; application=geotiff";

/// Size of the generated mosaic GeoTIFF.
pub const MOSAIC_SIZE: (u32, u32) = (32, 20);

/// A Catalog with one `child` link per entry in `children`.
pub fn catalog_json(id: &str, title: &str, children: &[&str]) -> Value {
    json!({
        "type": "Catalog",
        "stac_version": "1.0.0",
        "id": id,
        "title": title,
        "description": format!("{title} catalog"),
        "links": children
            .iter()
            .map(|href| json!({"rel": "child", "href": href, "type": "application/json"}))
            .collect::<Vec<_>>(),
    })
}

/// A Collection with `child` and `item` links.
pub fn collection_json(id: &str, title: &str, children: &[&str], items: &[&str]) -> Value {
    let mut links: Vec<Value> = vec![json!({"rel": "root", "href": "../catalog.json"})];
    links.extend(children.iter().map(|href| json!({"rel": "child", "href": href})));
    links.extend(items.iter().map(|href| json!({"rel": "item", "href": href})));

    json!({
        "type": "Collection",
        "stac_version": "1.0.0",
        "id": id,
        "title": title,
        "description": "Imagery collected after natural disasters",
        "license": "CC-BY-4.0",
        "extent": {
            "spatial": {"bbox": [[-95.5, 29.5, -95.0, 30.0]]},
            "temporal": {"interval": [["2017-08-25T00:00:00Z", "2017-09-05T00:00:00Z"]]}
        },
        "links": links,
    })
}

/// An Item with the given assets object.
pub fn item_json(id: &str, title: &str, assets: Value) -> Value {
    json!({
        "type": "Feature",
        "stac_version": "1.0.0",
        "id": id,
        "geometry": {
            "type": "Polygon",
            "coordinates": [[[-95.5, 29.5], [-95.0, 29.5], [-95.0, 30.0], [-95.5, 30.0], [-95.5, 29.5]]]
        },
        "bbox": [-95.5, 29.5, -95.0, 30.0],
        "properties": {
            "title": title,
            "datetime": "2017-08-31T17:24:57Z",
            "gsd": 0.5
        },
        "links": [{"rel": "collection", "href": "../collection.json"}],
        "assets": assets,
    })
}

/// The "houston" item with a PNG thumbnail and a GeoTIFF mosaic.
pub fn houston_item_json() -> Value {
    item_json(
        ITEM_ID,
        "Houston flooding",
        json!({
            "thumbnail": {
                "href": "./thumbnail.png",
                "type": "image/png",
                "title": "Thumbnail",
                "roles": ["thumbnail"]
            },
            "mosaic": {
                "href": "./mosaic.tif",
                "type": GEOTIFF_MEDIA_TYPE,
                "title": "Post-event mosaic",
                "roles": ["data"]
            }
        }),
    )
}

/// An `eo` item with red/nir/swir bands, all GeoTIFF, plus a thumbnail.
pub fn eo_item_json(id: &str) -> Value {
    let mut item = item_json(
        id,
        "Landsat scene",
        json!({
            "B4": {"href": "./B4.tif", "type": GEOTIFF_MEDIA_TYPE, "title": "Band 4 (red)",
                   "eo:bands": [{"name": "B4", "common_name": "red"}]},
            "B5": {"href": "./B5.tif", "type": GEOTIFF_MEDIA_TYPE, "title": "Band 5 (nir)",
                   "eo:bands": [{"name": "B5", "common_name": "nir"}]},
            "B6": {"href": "./B6.tif", "type": GEOTIFF_MEDIA_TYPE, "title": "Band 6 (swir16)",
                   "eo:bands": [{"name": "B6", "common_name": "swir16"}]},
            "thumbnail": {"href": "./thumb.png", "type": "image/png", "title": "Thumbnail"}
        }),
    );
    item["stac_extensions"] =
        json!(["https://stac-extensions.github.io/eo/v1.0.0/schema.json"]);
    item["properties"]["eo:bands"] = json!([
        {"name": "B4", "common_name": "red"},
        {"name": "B5", "common_name": "nir"},
        {"name": "B6", "common_name": "swir16"}
    ]);
    item
}

/// The disasters tree as `(href, document)` pairs rooted at `base`
/// (e.g. `mem://stac`). The root is `{base}/catalog.json`.
pub fn disasters_documents(base: &str) -> Vec<(String, Value)> {
    let mut collection = collection_json(
        COLLECTION_ID,
        "Disaster events",
        &[],
        &["./houston/houston.json"],
    );
    collection["keywords"] = json!(["flood", "hurricane"]);

    vec![
        (
            format!("{base}/catalog.json"),
            catalog_json(ROOT_ID, "Hurricane Harvey", &["./disasters/collection.json"]),
        ),
        (format!("{base}/disasters/collection.json"), collection),
        (
            format!("{base}/disasters/houston/houston.json"),
            houston_item_json(),
        ),
    ]
}

/// Paths of an on-disk disasters tree.
#[derive(Debug, Clone)]
pub struct StacTree {
    pub root: PathBuf,
    pub collection: PathBuf,
    pub item: PathBuf,
    pub thumbnail: PathBuf,
    pub mosaic: PathBuf,
}

/// Write the disasters tree, with a real PNG thumbnail and GeoTIFF mosaic,
/// under `dir`.
pub fn write_stac_tree(dir: &Path) -> Result<StacTree, Box<dyn std::error::Error>> {
    let item_dir = dir.join("disasters").join("houston");
    std::fs::create_dir_all(&item_dir)?;

    let base = dir.to_string_lossy().into_owned();
    for (href, doc) in disasters_documents(&base) {
        std::fs::write(&href, serde_json::to_vec_pretty(&doc)?)?;
    }

    let thumbnail = item_dir.join("thumbnail.png");
    write_test_png(&thumbnail, 16, 16)?;
    let mosaic = item_dir.join("mosaic.tif");
    write_test_geotiff(&mosaic, MOSAIC_SIZE.0, MOSAIC_SIZE.1)?;

    Ok(StacTree {
        root: dir.join("catalog.json"),
        collection: dir.join("disasters").join("collection.json"),
        item: item_dir.join("houston.json"),
        thumbnail,
        mosaic,
    })
}

/// Write an `eo` item and its three band GeoTIFFs under `dir`; returns the
/// item path. Band `B6` gets a different size when `mismatched` is set.
pub fn write_eo_item(dir: &Path, id: &str, mismatched: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(dir)?;
    write_test_geotiff(&dir.join("B4.tif"), 12, 8)?;
    write_test_geotiff(&dir.join("B5.tif"), 12, 8)?;
    if mismatched {
        write_test_geotiff(&dir.join("B6.tif"), 6, 4)?;
    } else {
        write_test_geotiff(&dir.join("B6.tif"), 12, 8)?;
    }
    write_test_png(&dir.join("thumb.png"), 4, 4)?;

    let path = dir.join(format!("{id}.json"));
    std::fs::write(&path, serde_json::to_vec_pretty(&eo_item_json(id))?)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disasters_documents() {
        let docs = disasters_documents("mem://stac");
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].0, "mem://stac/catalog.json");
        assert_eq!(docs[0].1["links"][0]["href"], "./disasters/collection.json");
        assert_eq!(docs[2].1["assets"]["mosaic"]["type"], GEOTIFF_MEDIA_TYPE);
    }

    #[test]
    fn test_write_stac_tree() {
        let dir = tempfile::tempdir().unwrap();
        let tree = write_stac_tree(dir.path()).unwrap();
        assert!(tree.root.is_file());
        assert!(tree.item.is_file());
        assert!(tree.mosaic.is_file());
        assert!(tree.thumbnail.is_file());
    }
}
