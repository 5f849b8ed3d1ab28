//! Parsing tests for realistic STAC documents.

use serde_json::json;
use stac_model::{
    from_json, hierarchy_links, self_href, AssetExt, ItemExt, MemoryReader, ObjectExt,
    StacError, StacObject, StacReader,
};

// ============================================================================
// Catalog / Collection
// ============================================================================

#[test]
fn test_parse_catalog_keeps_links_and_extras() {
    let obj = from_json(json!({
        "type": "Catalog",
        "stac_version": "1.0.0",
        "id": "hurricane-harvey",
        "title": "Hurricane Harvey",
        "description": "Imagery of the Houston area",
        "links": [
            {"rel": "self", "href": "https://example.com/stac/catalog.json"},
            {"rel": "child", "href": "./disasters/collection.json", "type": "application/json"}
        ],
        "custom:field": 42
    }))
    .unwrap();

    assert_eq!(obj.kind_name(), "Catalog");
    let StacObject::Catalog(catalog) = obj else {
        panic!("expected a catalog");
    };
    assert_eq!(catalog.title.as_deref(), Some("Hurricane Harvey"));
    assert_eq!(
        self_href(&catalog.links).as_deref(),
        Some("https://example.com/stac/catalog.json")
    );
    assert_eq!(hierarchy_links(&catalog.links).len(), 1);
    assert_eq!(catalog.additional_fields["custom:field"], 42);
}

#[test]
fn test_parse_collection_with_assets() {
    let obj = from_json(json!({
        "type": "Collection",
        "stac_version": "1.0.0",
        "id": "daymet",
        "description": "Daily weather",
        "license": "proprietary",
        "extent": {"spatial": {"bbox": [[-180, -90, 180, 90]]}, "temporal": {"interval": [[null, null]]}},
        "assets": {
            "zarr-https": {
                "href": "https://example.com/daymet.zarr",
                "type": "application/vnd+zarr",
                "xarray:open_kwargs": {"consolidated": true}
            }
        },
        "links": []
    }))
    .unwrap();

    let StacObject::Collection(collection) = obj else {
        panic!("expected a collection");
    };
    assert_eq!(collection.license, "proprietary");
    let asset = &collection.assets["zarr-https"];
    assert_eq!(asset.media_type(), Some("application/vnd+zarr"));
    assert_eq!(asset.extra("xarray:open_kwargs").unwrap()["consolidated"], true);
}

// ============================================================================
// Item
// ============================================================================

#[test]
fn test_parse_item_preserves_asset_order() {
    let obj = from_json(
        serde_json::from_str(
            r#"{
            "type": "Feature",
            "stac_version": "1.0.0",
            "id": "houston",
            "geometry": {"type": "Point", "coordinates": [-95.36, 29.76]},
            "bbox": [-95.5, 29.5, -95.0, 30.0],
            "properties": {"datetime": "2017-08-31T00:00:00Z"},
            "assets": {
                "thumbnail": {"href": "thumb.png", "type": "image/png"},
                "mosaic": {"href": "mosaic.tif", "type": "image/tiff; application=geotiff"},
                "metadata": {"href": "meta.xml", "type": "text/xml"}
            },
            "links": []
        }"#,
        )
        .unwrap(),
    )
    .unwrap();

    let StacObject::Item(item) = obj else {
        panic!("expected an item");
    };
    let keys: Vec<_> = item.assets.keys().cloned().collect();
    assert_eq!(keys, vec!["thumbnail", "mosaic", "metadata"]);
    assert!(item.bbox.is_some());
    assert!(item.nominal_datetime().is_some());
}

#[test]
fn test_item_serializes_back() {
    let original = json!({
        "type": "Feature",
        "stac_version": "1.0.0",
        "id": "a",
        "geometry": null,
        "properties": {"datetime": "2020-01-01T00:00:00Z", "eo:cloud_cover": 3.5},
        "assets": {"data": {"href": "a.tif"}},
        "links": [],
        "collection": "c"
    });
    let StacObject::Item(item) = from_json(original).unwrap() else {
        panic!("expected an item");
    };
    let back = serde_json::to_value(&item).unwrap();
    assert_eq!(back["properties"]["eo:cloud_cover"], 3.5);
    assert_eq!(back["collection"], "c");
    assert_eq!(back["assets"]["data"]["href"], "a.tif");
}

// ============================================================================
// ItemCollection
// ============================================================================

#[test]
fn test_parse_search_response() {
    let obj = from_json(json!({
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "id": "a", "properties": {}, "assets": {}},
            {"type": "Feature", "id": "b", "properties": {}, "assets": {}}
        ],
        "links": [{"rel": "next", "href": "https://example.com/search?page=2"}],
        "numberMatched": 10
    }))
    .unwrap();

    assert_eq!(obj.object_id(), None);
    let StacObject::ItemCollection(items) = obj else {
        panic!("expected an item collection");
    };
    assert_eq!(items.items.len(), 2);
    assert_eq!(items.items[1].id, "b");
    assert_eq!(items.additional_fields["numberMatched"], 10);
}

#[test]
fn test_invalid_item_reports_json_error() {
    // Items must have an id.
    let err = from_json(json!({"type": "Feature", "properties": {}})).unwrap_err();
    assert!(matches!(err, StacError::Json(_)));
}

#[test]
fn test_read_object_through_reader() {
    let reader = MemoryReader::new().with(
        "mem://stac/houston.json",
        json!({"type": "Feature", "id": "houston", "properties": {}, "assets": {}}),
    );
    let obj = reader.read_object("mem://stac/houston.json").unwrap();
    assert_eq!(obj.kind_name(), "Item");
    assert_eq!(obj.object_id(), Some("houston"));
}
