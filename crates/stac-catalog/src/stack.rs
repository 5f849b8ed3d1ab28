//! Band stacking for items using the `eo` extension.
//!
//! Bands are selected by name (or id) when the name is also an asset key,
//! otherwise by `common_name`. Every selected asset must share one media
//! type so a single loader can open them all.

use std::collections::BTreeSet;

use array_loader::{ArrayHandle, LoaderError};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use stac_model::{AssetExt, Item, ItemExt};
use tracing::{debug, info};

use crate::error::{CatalogError, Result};
use crate::node::{AssetLeaf, ItemNode, Node};

pub(crate) const DEFAULT_CONCAT_DIM: &str = "band";

const EO_EXTENSION: &str = "eo";
const EO_BANDS: &str = "eo:bands";

#[derive(Debug, Clone, PartialEq)]
struct BandInfo {
    name: String,
    common_name: Option<String>,
}

impl BandInfo {
    fn from_value(value: &Value) -> Option<Self> {
        let name = value
            .get("id")
            .or_else(|| value.get("name"))
            .and_then(Value::as_str)?;
        Some(Self {
            name: name.to_string(),
            common_name: value
                .get("common_name")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}

/// `eo:bands` from the item properties, then from each asset.
fn band_info(item: &Item) -> Vec<BandInfo> {
    let mut bands: Vec<BandInfo> = Vec::new();
    let properties = item.properties_map();
    let sources = std::iter::once(properties.get(EO_BANDS))
        .chain(item.assets.values().map(|a| a.extra(EO_BANDS)));
    for list in sources.flatten().filter_map(Value::as_array) {
        for info in list.iter().filter_map(BandInfo::from_value) {
            if !bands.contains(&info) {
                bands.push(info);
            }
        }
    }
    bands
}

/// Sorted unique band names and common names.
fn valid_names(bands: &[BandInfo]) -> Vec<String> {
    bands
        .iter()
        .flat_map(|b| std::iter::once(b.name.clone()).chain(b.common_name.clone()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Asset key holding `band`: the key itself, or the asset listing it.
fn asset_key_for(item: &Item, band: &str) -> Option<String> {
    if item.assets.contains_key(band) {
        return Some(band.to_string());
    }
    item.assets.iter().find_map(|(key, asset)| {
        let listed = asset
            .extra(EO_BANDS)
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(BandInfo::from_value)
                    .any(|b| b.name == band)
            })
            .unwrap_or(false);
        listed.then(|| key.clone())
    })
}

pub(crate) fn select_bands(
    node: &ItemNode,
    tokens: &[&str],
    concat_dim: &str,
) -> Result<StackedBands> {
    let item = node.item();
    if !item.declares_extension(EO_EXTENSION) {
        return Err(CatalogError::MissingExtension {
            item: item.id.clone(),
            extension: EO_EXTENSION.to_string(),
        });
    }

    let info = band_info(item);
    let not_found = |band: &str| CatalogError::BandNotFound {
        band: band.to_string(),
        valid: valid_names(&info),
    };

    let mut bands = Vec::with_capacity(tokens.len());
    for token in tokens {
        let matched = if item.assets.contains_key(*token) {
            info.iter().find(|b| b.name == *token)
        } else {
            info.iter().find(|b| b.common_name.as_deref() == Some(*token))
        };
        let name = matched
            .map(|b| b.name.clone())
            .ok_or_else(|| not_found(*token))?;

        let key = asset_key_for(item, &name).ok_or_else(|| not_found(name.as_str()))?;
        bands.push(node.leaf(&key)?);
        debug!(token, band = %name, asset = %key, "Selected band");
    }

    let media_types: BTreeSet<String> = bands
        .iter()
        .map(|leaf| leaf.media_type().unwrap_or_default().to_string())
        .collect();
    if media_types.len() > 1 {
        return Err(CatalogError::MixedMediaTypes {
            found: media_types.into_iter().collect(),
        });
    }

    Ok(StackedBands {
        name: tokens.join("_"),
        description: bands
            .iter()
            .map(|leaf| leaf.key().to_string())
            .collect::<Vec<_>>()
            .join(", "),
        concat_dim: concat_dim.to_string(),
        bands,
    })
}

/// Selected bands of one item, ready to be opened as one stacked array.
#[derive(Debug)]
pub struct StackedBands {
    /// Requested band tokens joined with `_`.
    pub name: String,
    /// Resolved asset keys joined with `, `.
    pub description: String,
    /// Dimension the bands are concatenated along.
    pub concat_dim: String,
    bands: Vec<AssetLeaf>,
}

impl StackedBands {
    /// Asset keys in stacking order.
    pub fn keys(&self) -> Vec<&str> {
        self.bands.iter().map(|leaf| leaf.key()).collect()
    }

    /// Resolved hrefs in stacking order.
    pub fn hrefs(&self) -> Vec<&str> {
        self.bands.iter().map(|leaf| leaf.href()).collect()
    }

    /// Shared media type of the bands.
    pub fn media_type(&self) -> Option<&str> {
        self.bands.first().and_then(|leaf| leaf.media_type())
    }

    /// Asset metadata per band key.
    pub fn metadata(&self) -> IndexMap<String, Map<String, Value>> {
        self.bands
            .iter()
            .map(|leaf| (leaf.key().to_string(), leaf.metadata()))
            .collect()
    }

    /// Open every band and concatenate along [`concat_dim`](Self::concat_dim).
    ///
    /// Each band is opened with its own resolved driver, keywords and
    /// storage options. Bands must agree on every dimension except
    /// `concat_dim`.
    pub fn to_array_handle(&self) -> Result<ArrayHandle> {
        if self.bands.is_empty() {
            return Err(LoaderError::StackMismatch("no bands selected".to_string()).into());
        }

        info!(name = %self.name, bands = self.bands.len(), "Opening stacked bands");
        let handles = self
            .bands
            .iter()
            .map(AssetLeaf::to_array_handle)
            .collect::<Result<Vec<_>>>()?;

        let mut stacked = ArrayHandle::stack(handles, &self.concat_dim)?;
        stacked
            .attributes
            .insert("name".to_string(), Value::String(self.name.clone()));
        stacked
            .attributes
            .insert("bands".to_string(), Value::from(self.keys()));
        Ok(stacked)
    }
}
