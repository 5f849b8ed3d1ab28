//! Asset media-type dispatch.
//!
//! A [`DriverTable`] is an ordered list of rules mapping a media type or a
//! file extension to a loader driver plus default open-time keywords.
//! Caller-supplied rules sit in front of the built-in ones, so the first
//! matching rule wins.
//!
//! Resolution order for one asset:
//! 1. an explicit `driver` extension field on the asset
//! 2. exact media-type match
//! 3. file-extension match on the href (query string ignored)
//!
//! Keywords are merged in three layers, later layers winning on collisions:
//! the rule defaults, `xarray:open_kwargs`, then `open_kwargs`. Transport
//! options from `xarray:storage_options` and `storage_options` are kept in a
//! separate map.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use stac_model::href::strip_query;
use stac_model::{Asset, AssetExt};
use tracing::{debug, warn};

use crate::error::{CatalogError, Result};

// ============================================================================
// Built-in table
// ============================================================================

const GEOTIFF_TYPES: &[&str] = &[
    "image/tiff; application=geotiff",
    "image/tiff; application=geotiff; profile=cloud-optimized",
    "image/vnd.stac.geotiff",
    "image/vnd.stac.geotiff; cloud-optimized=true",
    "image/x.geotiff",
    "image/tiff",
    "application/rasterio",
];

const BUILTIN_MEDIA_TYPES: &[(&[&str], &str)] = &[
    (GEOTIFF_TYPES, "geotiff"),
    (&["image/jp2"], "jpeg2000"),
    (
        &[
            "application/netcdf",
            "application/x-netcdf",
            "application/x-hdf",
            "application/x-hdf5",
        ],
        "netcdf",
    ),
    (
        &["application/x-grib", "application/x-grib2", "application/wmo-grib2"],
        "grib",
    ),
    (&["application/vnd+zarr", "application/vnd.zarr"], "zarr"),
    (&["application/parquet", "application/x-parquet"], "parquet"),
    (&["image/png", "image/jpg", "image/jpeg"], "image"),
    (
        &["application/geo+json", "application/geopackage+sqlite3"],
        "vector",
    ),
    (
        &[
            "text/xml",
            "text/plain",
            "text/html",
            "application/json",
            "application/xml",
        ],
        "text",
    ),
];

const BUILTIN_EXTENSIONS: &[(&[&str], &str)] = &[
    (&[".tif", ".tiff"], "geotiff"),
    (&[".nc", ".nc4", ".h5", ".hdf"], "netcdf"),
    (&[".grib", ".grib2", ".grb", ".grb2"], "grib"),
    (&[".zarr"], "zarr"),
    (&[".png", ".jpg", ".jpeg"], "image"),
];

/// Drivers that open with engine-preferred chunking unless told otherwise.
const CHUNKED_DRIVERS: &[&str] = &["geotiff", "netcdf", "image"];

fn builtin_defaults(driver: &str) -> Map<String, Value> {
    let mut defaults = Map::new();
    if CHUNKED_DRIVERS.contains(&driver) {
        defaults.insert("chunks".to_string(), json!({}));
    }
    defaults
}

// ============================================================================
// Rules
// ============================================================================

/// What a rule matches on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Exact media-type string.
    MediaType(String),
    /// Lowercase href suffix including the dot, e.g. `.tif`.
    Extension(String),
}

/// One `(matcher, driver, defaults)` entry of a [`DriverTable`].
#[derive(Debug, Clone, PartialEq)]
pub struct DriverRule {
    pub matcher: Matcher,
    pub driver: String,
    pub defaults: Map<String, Value>,
}

impl DriverRule {
    pub fn media_type(media_type: impl Into<String>, driver: impl Into<String>) -> Self {
        Self {
            matcher: Matcher::MediaType(media_type.into()),
            driver: driver.into(),
            defaults: Map::new(),
        }
    }

    pub fn extension(extension: impl AsRef<str>, driver: impl Into<String>) -> Self {
        Self {
            matcher: Matcher::Extension(normalize_extension(extension.as_ref())),
            driver: driver.into(),
            defaults: Map::new(),
        }
    }

    /// Replace the default keywords.
    pub fn with_defaults(mut self, defaults: Map<String, Value>) -> Self {
        self.defaults = defaults;
        self
    }

    fn matches_media_type(&self, media_type: &str) -> bool {
        matches!(&self.matcher, Matcher::MediaType(m) if m == media_type)
    }

    fn matches_href(&self, href: &str) -> bool {
        match &self.matcher {
            Matcher::Extension(ext) => href_suffix(href).ends_with(ext.as_str()),
            Matcher::MediaType(_) => false,
        }
    }
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}

/// The lowercased path part of an href, without query or trailing slash.
fn href_suffix(href: &str) -> String {
    strip_query(href).trim_end_matches('/').to_lowercase()
}

/// How a driver was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    Explicit,
    MediaType,
    Extension,
}

/// A resolved driver with merged keywords.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDriver {
    pub driver: String,
    pub kwargs: Map<String, Value>,
    pub storage_options: Map<String, Value>,
    pub matched_by: MatchSource,
}

// ============================================================================
// YAML rule files
// ============================================================================

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    rules: Vec<RuleSpec>,
}

#[derive(Debug, Deserialize)]
struct RuleSpec {
    #[serde(default)]
    media_type: Option<String>,
    #[serde(default)]
    extension: Option<String>,
    driver: String,
    #[serde(default)]
    defaults: Map<String, Value>,
}

impl RuleSpec {
    fn into_rule(self, index: usize) -> Result<DriverRule> {
        if self.driver.trim().is_empty() {
            return Err(CatalogError::config(format!("rule {index}: empty driver")));
        }
        let rule = match (self.media_type, self.extension) {
            (Some(media_type), None) => DriverRule::media_type(media_type, self.driver),
            (None, Some(extension)) => DriverRule::extension(extension, self.driver),
            _ => {
                return Err(CatalogError::config(format!(
                    "rule {index}: exactly one of media_type or extension is required"
                )))
            }
        };
        Ok(rule.with_defaults(self.defaults))
    }
}

// ============================================================================
// Table
// ============================================================================

/// Ordered media-type and extension rules.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverTable {
    rules: Vec<DriverRule>,
}

impl Default for DriverTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl DriverTable {
    /// A table with no rules at all.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// The built-in media-type and extension rules.
    pub fn builtin() -> Self {
        let mut rules = Vec::new();
        for (media_types, driver) in BUILTIN_MEDIA_TYPES {
            for media_type in *media_types {
                rules.push(
                    DriverRule::media_type(*media_type, *driver)
                        .with_defaults(builtin_defaults(driver)),
                );
            }
        }
        for (extensions, driver) in BUILTIN_EXTENSIONS {
            for ext in *extensions {
                rules.push(
                    DriverRule::extension(ext, *driver).with_defaults(builtin_defaults(driver)),
                );
            }
        }
        Self { rules }
    }

    /// The built-in table with `rules` consulted first.
    pub fn with_rules(rules: Vec<DriverRule>) -> Self {
        let mut table = Self::builtin();
        table.prepend(rules);
        table
    }

    /// Insert `rules` ahead of the existing ones, keeping their order.
    pub fn prepend(&mut self, rules: Vec<DriverRule>) {
        self.rules.splice(0..0, rules);
    }

    /// Parse extra rules from a YAML document with a top-level `rules` list.
    pub fn rules_from_yaml(yaml: &str) -> Result<Vec<DriverRule>> {
        let file: RuleFile = serde_yaml::from_str(yaml)?;
        file.rules
            .into_iter()
            .enumerate()
            .map(|(i, spec)| spec.into_rule(i))
            .collect()
    }

    /// Read extra rules from a YAML file.
    pub fn rules_from_yaml_file(path: &Path) -> Result<Vec<DriverRule>> {
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            CatalogError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::rules_from_yaml(&yaml)
    }

    pub fn rules(&self) -> &[DriverRule] {
        &self.rules
    }

    /// First rule matching `media_type` exactly.
    pub fn lookup_media_type(&self, media_type: &str) -> Option<&DriverRule> {
        self.rules.iter().find(|r| r.matches_media_type(media_type))
    }

    /// First extension rule matching the end of `href`.
    pub fn lookup_extension(&self, href: &str) -> Option<&DriverRule> {
        self.rules.iter().find(|r| r.matches_href(href))
    }

    /// Defaults of the first rule naming `driver`.
    pub fn defaults_for(&self, driver: &str) -> Map<String, Value> {
        self.rules
            .iter()
            .find(|r| r.driver == driver)
            .map(|r| r.defaults.clone())
            .unwrap_or_default()
    }

    /// Resolve the driver for the asset stored under `key`, whose resolved
    /// location is `href`.
    pub fn resolve(&self, key: &str, asset: &Asset, href: &str) -> Result<ResolvedDriver> {
        let (driver, defaults, matched_by) = if let Some(driver) =
            asset.extra("driver").and_then(Value::as_str)
        {
            (driver.to_string(), self.defaults_for(driver), MatchSource::Explicit)
        } else if let Some(rule) = asset
            .media_type()
            .and_then(|mt| self.lookup_media_type(mt))
        {
            (rule.driver.clone(), rule.defaults.clone(), MatchSource::MediaType)
        } else if let Some(rule) = self.lookup_extension(href) {
            (rule.driver.clone(), rule.defaults.clone(), MatchSource::Extension)
        } else {
            return Err(CatalogError::UnsupportedAssetType {
                key: key.to_string(),
                media_type: asset.media_type().map(str::to_string),
                href: href.to_string(),
                reason: "no driver matches the media type or file extension".to_string(),
            });
        };

        let mut kwargs = defaults;
        merge_object(&mut kwargs, key, asset, "xarray:open_kwargs");
        merge_object(&mut kwargs, key, asset, "open_kwargs");

        let mut storage_options = Map::new();
        merge_object(&mut storage_options, key, asset, "xarray:storage_options");
        merge_object(&mut storage_options, key, asset, "storage_options");

        debug!(key, driver = %driver, matched_by = ?matched_by, "Resolved asset driver");
        Ok(ResolvedDriver {
            driver,
            kwargs,
            storage_options,
            matched_by,
        })
    }
}

/// Merge the object stored under `field` on `asset` into `target`.
fn merge_object(target: &mut Map<String, Value>, key: &str, asset: &Asset, field: &str) {
    match asset.extra(field) {
        Some(Value::Object(map)) => {
            for (k, v) in map {
                target.insert(k.clone(), v.clone());
            }
        }
        Some(Value::Null) | None => {}
        Some(other) => {
            warn!(key, field, value = %other, "Ignoring non-object asset field");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(value: Value) -> Asset {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_geotiff_media_type() {
        let table = DriverTable::builtin();
        let a = asset(json!({"href": "x", "type": "image/tiff; application=geotiff"}));
        let resolved = table.resolve("mosaic", &a, "x").unwrap();
        assert_eq!(resolved.driver, "geotiff");
        assert_eq!(resolved.matched_by, MatchSource::MediaType);
        assert_eq!(resolved.kwargs["chunks"], json!({}));
    }

    #[test]
    fn test_extension_fallback_ignores_query() {
        let table = DriverTable::builtin();
        let a = asset(json!({"href": "x", "type": "application/octet-stream"}));
        let resolved = table
            .resolve("data", &a, "https://example.com/data.GRIB2?sig=abc")
            .unwrap();
        assert_eq!(resolved.driver, "grib");
        assert_eq!(resolved.matched_by, MatchSource::Extension);

        let zarr = table.resolve("store", &a, "/data/store.zarr/").unwrap();
        assert_eq!(zarr.driver, "zarr");
    }

    #[test]
    fn test_unknown_type_and_extension() {
        let table = DriverTable::builtin();
        let a = asset(json!({"href": "x.bin", "type": "application/x-unknown"}));
        let err = table.resolve("blob", &a, "x.bin").unwrap_err();
        match err {
            CatalogError::UnsupportedAssetType { key, media_type, href, .. } => {
                assert_eq!(key, "blob");
                assert_eq!(media_type.as_deref(), Some("application/x-unknown"));
                assert_eq!(href, "x.bin");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_kwarg_layers() {
        let table = DriverTable::builtin();
        let a = asset(json!({
            "href": "x.nc",
            "type": "application/netcdf",
            "xarray:open_kwargs": {"engine": "h5netcdf", "decode_times": false},
            "open_kwargs": {"consolidated": true, "decode_times": true},
            "xarray:storage_options": {"anon": true}
        }));
        let resolved = table.resolve("data", &a, "x.nc").unwrap();
        assert_eq!(resolved.kwargs["chunks"], json!({}));
        assert_eq!(resolved.kwargs["engine"], "h5netcdf");
        assert_eq!(resolved.kwargs["consolidated"], true);
        assert_eq!(resolved.kwargs["decode_times"], true);
        assert_eq!(resolved.storage_options["anon"], true);
    }

    #[test]
    fn test_explicit_driver_wins() {
        let table = DriverTable::builtin();
        let a = asset(json!({"href": "x.tif", "type": "image/png", "driver": "geotiff"}));
        let resolved = table.resolve("x", &a, "x.tif").unwrap();
        assert_eq!(resolved.driver, "geotiff");
        assert_eq!(resolved.matched_by, MatchSource::Explicit);
        assert_eq!(resolved.kwargs["chunks"], json!({}));
    }

    #[test]
    fn test_caller_rules_take_precedence() {
        let table = DriverTable::with_rules(vec![DriverRule::media_type("image/png", "thumbnail")]);
        let a = asset(json!({"href": "t.png", "type": "image/png"}));
        assert_eq!(table.resolve("t", &a, "t.png").unwrap().driver, "thumbnail");
        assert_eq!(table.rules().len(), DriverTable::builtin().rules().len() + 1);
    }

    #[test]
    fn test_rules_from_yaml() {
        let yaml = r#"
rules:
  - media_type: application/x-custom-tiff
    driver: geotiff
    defaults: { chunks: {} }
  - extension: cog
    driver: geotiff
"#;
        let rules = DriverTable::rules_from_yaml(yaml).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(
            rules[0].matcher,
            Matcher::MediaType("application/x-custom-tiff".to_string())
        );
        assert_eq!(rules[1].matcher, Matcher::Extension(".cog".to_string()));
        assert_eq!(rules[0].defaults["chunks"], json!({}));
    }

    #[test]
    fn test_rules_from_yaml_requires_one_matcher() {
        let both = "rules:\n  - media_type: a/b\n    extension: .x\n    driver: d\n";
        assert!(matches!(
            DriverTable::rules_from_yaml(both),
            Err(CatalogError::Config(_))
        ));

        let neither = "rules:\n  - driver: d\n";
        assert!(matches!(
            DriverTable::rules_from_yaml(neither),
            Err(CatalogError::Config(_))
        ));

        assert!(matches!(
            DriverTable::rules_from_yaml("rules: [1, 2"),
            Err(CatalogError::Yaml(_))
        ));
    }
}
